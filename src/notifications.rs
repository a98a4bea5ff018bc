use actix_web::{web, HttpRequest, HttpResponse};
use log::warn;

use crate::error::ApiError;
use crate::models::homework::HomeworkDetails;
use crate::models::notification::{MarkAsReadRequest, NewNotification, NotificationQuery};
use crate::notification_builders::{
    build_homework_assigned_notification, build_homework_completed_notification,
};
use crate::store::NotificationStore;
use crate::users::authenticate;
use crate::AppState;

/// Fire-and-forget notification writer. Failures are logged and dropped so
/// they never fail the request that triggered them.
pub struct Notifier<'a> {
    store: &'a dyn NotificationStore,
}

impl<'a> Notifier<'a> {
    pub fn new(store: &'a dyn NotificationStore) -> Self {
        Self { store }
    }

    async fn send(&self, notification: NewNotification) {
        let user_id = notification.user_id;
        if let Err(e) = self.store.insert_notification(notification).await {
            warn!("Failed to insert notification for user {}: {}", user_id, e);
        }
    }

    pub async fn homework_assigned(&self, details: &HomeworkDetails, recipients: &[i32]) {
        let due_date = details.homework.due_date.format("%Y-%m-%d").to_string();
        let body = build_homework_assigned_notification(
            details.homework.id,
            &details.homework.title,
            &details.teacher.full_name,
            &details.subject.name,
            &due_date,
        );

        for user_id in recipients {
            self.send(NewNotification::from_body(*user_id, &body, "normal"))
                .await;
        }
    }

    pub async fn homework_completed(&self, details: &HomeworkDetails, student_name: &str) {
        let body = build_homework_completed_notification(
            details.homework.id,
            &details.homework.title,
            student_name,
        );
        self.send(NewNotification::from_body(
            details.homework.teacher_id,
            &body,
            "low",
        ))
        .await;
    }
}

/// Get notifications for the authenticated user
pub async fn get_notifications(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;

    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let notifications = app_state
        .notifications
        .notifications(
            caller.user_id,
            query.unread_only.unwrap_or(false),
            limit,
            offset,
        )
        .await?;

    Ok(HttpResponse::Ok().json(notifications))
}

/// Mark notifications as read
pub async fn mark_as_read(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<MarkAsReadRequest>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;

    let marked = app_state
        .notifications
        .mark_read(caller.user_id, &payload.notification_ids)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "markedAsRead": marked
    })))
}

/// Get unread notification count
pub async fn get_unread_count(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;
    let count = app_state.notifications.unread_count(caller.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "unreadCount": count
    })))
}

/// Delete a notification
pub async fn delete_notification(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    notification_id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let caller = authenticate(&req, &app_state).await?;

    let deleted = app_state
        .notifications
        .delete_notification(caller.user_id, notification_id.into_inner())
        .await?;

    if deleted {
        Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
    } else {
        Err(ApiError::NotFound("Notification"))
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(get_notifications))
            .route("/unread-count", web::get().to(get_unread_count))
            .route("/mark-read", web::post().to(mark_as_read))
            .route("/{id}", web::delete().to(delete_notification)),
    );
}
