#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use schoolhub_backend::store::MemoryStore;
use schoolhub_backend::users::Claims;
use schoolhub_backend::AppState;

pub const SECRET: &str = "test-secret";

/// A small school: class 7B with three students, class 8A with one,
/// two teachers, a parent of `amy` and an administrator.
pub struct School {
    pub store: Arc<MemoryStore>,
    pub class_7b: i32,
    pub class_8a: i32,
    pub math: i32,
    pub teacher: i32,
    pub other_teacher: i32,
    pub amy: i32,
    pub ben: i32,
    pub cleo: i32,
    pub dan: i32,
    pub parent: i32,
    pub admin: i32,
}

impl School {
    pub fn seed() -> Self {
        let store = Arc::new(MemoryStore::new());
        let class_7b = store.add_class("7B");
        let class_8a = store.add_class("8A");
        let math = store.add_subject("Mathematics");
        let teacher = store.add_teacher("teacher", "Ms. Novak");
        let other_teacher = store.add_teacher("other_teacher", "Mr. Reyes");
        let amy = store.add_student("amy", "Amy Adams", Some(class_7b));
        let ben = store.add_student("ben", "Ben Brooks", Some(class_7b));
        let cleo = store.add_student("cleo", "Cleo Chan", Some(class_7b));
        let dan = store.add_student("dan", "Dan Diaz", Some(class_8a));
        let parent = store.add_parent("parent", &[amy]);
        let admin = store.add_user("admin");

        Self {
            store,
            class_7b,
            class_8a,
            math,
            teacher,
            other_teacher,
            amy,
            ben,
            cleo,
            dan,
            parent,
            admin,
        }
    }

    pub fn state(&self) -> actix_web::web::Data<AppState> {
        actix_web::web::Data::new(AppState::new(self.store.clone(), SECRET.to_string()))
    }

    pub fn class_homework(&self, title: &str, days: i64) -> Value {
        json!({
            "subjectId": self.math,
            "teacherId": self.teacher,
            "title": title,
            "description": "Chapter exercises",
            "dueDate": (Utc::now() + Duration::days(days)).to_rfc3339(),
            "classId": self.class_7b,
        })
    }

    pub fn individual_homework(&self, title: &str, student_id: i32, days: i64) -> Value {
        json!({
            "subjectId": self.math,
            "teacherId": self.teacher,
            "title": title,
            "description": "Extra practice",
            "dueDate": (Utc::now() + Duration::days(days)).to_rfc3339(),
            "studentId": student_id,
        })
    }
}

pub fn token(username: &str, roles: &[&str]) -> String {
    let claims = Claims {
        sub: username.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        roles: roles.iter().map(|r| r.to_string()).collect(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_ref()),
    )
    .expect("encode token")
}

pub fn bearer(username: &str, roles: &[&str]) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(username, roles)))
}

/// Sends a request and returns the status with the decoded JSON body
/// (`Value::Null` for an empty body).
pub async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("response body is JSON")
    };
    (status, value)
}

pub fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .expect("array response")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect()
}
