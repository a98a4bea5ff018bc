pub mod completion;
pub mod service;

use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::ApiError;
use crate::models::homework::{CreateHomeworkRequest, HomeworkFilter, UpdateHomeworkRequest};
use crate::users::authenticate;
use crate::AppState;

pub use service::HomeworkService;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_homeworks)
        .service(get_homework)
        .service(create_homework)
        .service(update_homework)
        .service(complete_homework)
        .service(get_completion_stats)
        .service(delete_homework);
}

#[get("/homeworks")]
async fn list_homeworks(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<HomeworkFilter>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    let homeworks = HomeworkService::new(&app_state)
        .list(&caller, query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(homeworks))
}

#[get("/homeworks/{homework_id}")]
async fn get_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    let homework = HomeworkService::new(&app_state)
        .get(&caller, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(homework))
}

#[post("/homeworks")]
async fn create_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<CreateHomeworkRequest>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    let homework = HomeworkService::new(&app_state)
        .create(&caller, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(homework))
}

#[put("/homeworks/{homework_id}")]
async fn update_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    path: web::Path<i32>,
    payload: web::Json<UpdateHomeworkRequest>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    let homework = HomeworkService::new(&app_state)
        .update(&caller, path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(homework))
}

#[patch("/homeworks/{homework_id}/complete")]
async fn complete_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    let homework = HomeworkService::new(&app_state)
        .mark_completed(&caller, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(homework))
}

#[get("/homeworks/{homework_id}/completion-stats")]
async fn get_completion_stats(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    let stats = HomeworkService::new(&app_state)
        .completion_stats(&caller, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[delete("/homeworks/{homework_id}")]
async fn delete_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    HomeworkService::new(&app_state)
        .delete(&caller, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": true })))
}
