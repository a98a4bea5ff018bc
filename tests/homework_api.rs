mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::json;

use common::{bearer, ids, send, School};
use schoolhub_backend::create_app;

#[actix_rt::test]
async fn class_completion_scenario() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (status, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.class_homework("Fractions", 3))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["audience"], "class_wide");
    assert_eq!(created["classId"], school.class_7b);
    assert_eq!(created["class"]["name"], "7B");
    assert_eq!(created["subject"]["name"], "Mathematics");
    assert_eq!(created["teacher"]["fullName"], "Ms. Novak");
    assert_eq!(created["completions"], json!([]));
    let homework_id = created["id"].as_i64().unwrap();

    let (status, completed) = send(
        &app,
        TestRequest::patch()
            .uri(&format!("/homeworks/{}/complete", homework_id))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["completions"][0]["studentId"], school.amy);

    let stats_request = || {
        TestRequest::get()
            .uri(&format!("/homeworks/{}/completion-stats", homework_id))
            .insert_header(bearer("teacher", &["teacher"]))
            .to_request()
    };

    let (status, stats) = send(&app, stats_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["completed"], 1);
    let students = stats["students"].as_array().unwrap();
    assert_eq!(students.len(), 3);
    for entry in students {
        let is_amy = entry["student"]["id"] == school.amy;
        assert_eq!(entry["completed"], is_amy);
        assert_eq!(entry["completedAt"].is_null(), !is_amy);
    }

    let (status, body) = send(
        &app,
        TestRequest::patch()
            .uri(&format!("/homeworks/{}/complete", homework_id))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Homework already completed");
    assert_eq!(school.store.completion_rows(homework_id as i32), 1);

    let (_, stats_after) = send(&app, stats_request()).await;
    assert_eq!(stats_after, stats);
}

#[actix_rt::test]
async fn stats_follow_the_current_roster() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.class_homework("Geometry", 2))
            .to_request(),
    )
    .await;
    let homework_id = created["id"].as_i64().unwrap();

    school.store.assign_class(school.dan, Some(school.class_7b));
    school.store.assign_class(school.cleo, None);

    let (status, stats) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks/{}/completion-stats", homework_id))
            .insert_header(bearer("admin", &["admin"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let roster: Vec<i64> = stats["students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["student"]["id"].as_i64().unwrap())
        .collect();
    assert_eq!(
        roster,
        vec![school.amy as i64, school.ben as i64, school.dan as i64]
    );
}

#[actix_rt::test]
async fn stats_reject_individual_homework() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.individual_homework("Essay", school.amy, 1))
            .to_request(),
    )
    .await;

    let (status, body) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks/{}/completion-stats", created["id"]))
            .insert_header(bearer("teacher", &["teacher"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Homework is not a class assignment");
}

#[actix_rt::test]
async fn individual_completion_and_reopen() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.individual_homework("Essay", school.amy, 1))
            .to_request(),
    )
    .await;
    assert_eq!(created["audience"], "individual");
    assert_eq!(created["student"]["fullName"], "Amy Adams");
    assert!(created.get("completions").is_none());
    let uri = format!("/homeworks/{}", created["id"]);

    let (status, body) = send(
        &app,
        TestRequest::patch()
            .uri(&format!("{}/complete", uri))
            .insert_header(bearer("ben", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "No access to this assignment");

    let (status, completed) = send(
        &app,
        TestRequest::patch()
            .uri(&format!("{}/complete", uri))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["completed"], true);
    assert!(completed["completedAt"].is_string());

    let (status, reopened) = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(json!({ "completed": false }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["completed"], false);
    assert!(reopened["completedAt"].is_null());
    assert_eq!(reopened["title"], "Essay");
}

#[actix_rt::test]
async fn completion_requires_a_student_in_the_class() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.class_homework("Fractions", 3))
            .to_request(),
    )
    .await;
    let uri = format!("/homeworks/{}/complete", created["id"]);

    let (status, _) = send(
        &app,
        TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer("dan", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer("teacher", &["teacher"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only students can complete homework");

    let (status, _) = send(
        &app,
        TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer("parent", &["parent"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn students_only_see_their_own_work() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let create = |body: serde_json::Value| {
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("admin", &["admin"]))
            .set_json(body)
            .to_request()
    };

    let (_, for_amy) = send(&app, create(school.individual_homework("Amy", school.amy, 2))).await;
    let (_, for_ben) = send(&app, create(school.individual_homework("Ben", school.ben, 1))).await;
    let (_, for_7b) = send(&app, create(school.class_homework("7B", 3))).await;
    let mut for_8a_body = school.class_homework("8A", 1);
    for_8a_body["classId"] = json!(school.class_8a);
    let (_, for_8a) = send(&app, create(for_8a_body)).await;

    let (status, list) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks?studentId={}&classId={}", school.ben, school.class_8a))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&list),
        vec![for_amy["id"].as_i64().unwrap(), for_7b["id"].as_i64().unwrap()]
    );

    let (status, _) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks/{}", for_ben["id"]))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, dan_list) = send(
        &app,
        TestRequest::get()
            .uri("/homeworks")
            .insert_header(bearer("dan", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(ids(&dan_list), vec![for_8a["id"].as_i64().unwrap()]);

    let (_, parent_list) = send(
        &app,
        TestRequest::get()
            .uri("/homeworks")
            .insert_header(bearer("parent", &["parent"]))
            .to_request(),
    )
    .await;
    assert_eq!(ids(&parent_list), ids(&list));
}

#[actix_rt::test]
async fn lists_are_scoped_and_ordered_by_due_date() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (_, late) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.class_homework("Late", 5))
            .to_request(),
    )
    .await;
    let (_, early) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.individual_homework("Early", school.ben, 1))
            .to_request(),
    )
    .await;
    let mut foreign = school.class_homework("Foreign", 2);
    foreign["teacherId"] = json!(school.other_teacher);
    let (status, other) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("other_teacher", &["teacher"]))
            .set_json(foreign)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let late_id = late["id"].as_i64().unwrap();
    let early_id = early["id"].as_i64().unwrap();
    let other_id = other["id"].as_i64().unwrap();

    let (_, teacher_list) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks?teacherId={}", school.other_teacher))
            .insert_header(bearer("teacher", &["teacher"]))
            .to_request(),
    )
    .await;
    assert_eq!(ids(&teacher_list), vec![early_id, late_id]);

    let (_, narrowed) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks?studentId={}", school.ben))
            .insert_header(bearer("teacher", &["teacher"]))
            .to_request(),
    )
    .await;
    assert_eq!(ids(&narrowed), vec![early_id]);

    let (_, admin_list) = send(
        &app,
        TestRequest::get()
            .uri("/homeworks")
            .insert_header(bearer("admin", &["admin"]))
            .to_request(),
    )
    .await;
    assert_eq!(ids(&admin_list), vec![early_id, other_id, late_id]);

    let (_, admin_filtered) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks?teacherId={}", school.other_teacher))
            .insert_header(bearer("admin", &["admin"]))
            .to_request(),
    )
    .await;
    assert_eq!(ids(&admin_filtered), vec![other_id]);
}

#[actix_rt::test]
async fn attachments_round_trip_in_order() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let mut body = school.individual_homework("Reading", school.amy, 2);
    body["attachments"] = json!(["http://a", "http://b"]);
    let (status, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(body)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, fetched) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/homeworks/{}", created["id"]))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["attachments"], json!(["http://a", "http://b"]));

    let mut bad = school.individual_homework("Reading", school.amy, 2);
    bad["attachments"] = json!(["not a url"]);
    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(bad)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn create_validates_audience_and_references() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let mut both = school.class_homework("Both", 1);
    both["studentId"] = json!(school.amy);
    let mut neither = school.class_homework("Neither", 1);
    neither.as_object_mut().unwrap().remove("classId");

    for body in [both, neither] {
        let (status, error) = send(
            &app,
            TestRequest::post()
                .uri("/homeworks")
                .insert_header(bearer("teacher", &["teacher"]))
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            error["error"],
            "Exactly one of studentId or classId must be set"
        );
    }

    let mut missing_subject = school.class_homework("Ghost", 1);
    missing_subject["subjectId"] = json!(9999);
    let (status, error) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(missing_subject)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "Subject not found");

    let (status, error) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("admin", &["admin"]))
            .set_json(school.individual_homework("Ghost", 9999, 1))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "Student not found");

    let (status, error) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(json!({ "title": "No subject" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].is_string());

    let blank = school.class_homework("   ", 1);
    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(blank)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn only_teachers_and_admins_manage_homework() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("amy", &["student"]))
            .set_json(school.individual_homework("Self-assigned", school.amy, 1))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut impersonated = school.class_homework("Impersonated", 1);
    impersonated["teacherId"] = json!(school.other_teacher);
    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(impersonated)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.class_homework("Owned", 1))
            .to_request(),
    )
    .await;
    let uri = format!("/homeworks/{}", created["id"]);

    let (status, _) = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .insert_header(bearer("other_teacher", &["teacher"]))
            .set_json(json!({ "title": "Hijacked" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        TestRequest::get()
            .uri(&format!("{}/completion-stats", uri))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn update_and_delete() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/homeworks")
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(school.class_homework("Draft", 1))
            .to_request(),
    )
    .await;
    let uri = format!("/homeworks/{}", created["id"]);

    let (status, updated) = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .insert_header(bearer("teacher", &["teacher"]))
            .set_json(json!({ "title": "Final", "dueDate": "2030-01-15T09:00:00Z" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Final");
    assert_eq!(updated["description"], created["description"]);
    assert_eq!(updated["dueDate"], "2030-01-15T09:00:00Z");

    let (status, _) = send(
        &app,
        TestRequest::patch()
            .uri(&format!("{}/complete", uri))
            .insert_header(bearer("amy", &["student"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer("admin", &["admin"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(school.store.completion_rows(created["id"].as_i64().unwrap() as i32), 0);

    for request in [
        TestRequest::get().uri(&uri),
        TestRequest::delete().uri(&uri),
        TestRequest::put().uri(&uri).set_json(json!({ "title": "Again" })),
    ] {
        let (status, body) = send(
            &app,
            request
                .insert_header(bearer("admin", &["admin"]))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Homework not found");
    }
}

#[actix_rt::test]
async fn requests_need_a_valid_token() {
    let school = School::seed();
    let app = test::init_service(create_app(school.state())).await;

    let (status, body) = send(&app, TestRequest::get().uri("/homeworks").to_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");

    let (status, _) = send(
        &app,
        TestRequest::get()
            .uri("/homeworks")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        TestRequest::get()
            .uri("/homeworks")
            .insert_header(bearer("nobody", &["admin"]))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not found");
}
