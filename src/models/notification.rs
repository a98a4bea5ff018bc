use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub body: JsonValue,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub priority: String,
}

/// Structured notification body format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationBody {
    #[serde(rename = "type")]
    pub body_type: String, // e.g. "homework_assigned"
    pub title: String,
    pub route: Option<String>, // Frontend route to navigate to
    pub content: NotificationContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationContent {
    pub blocks: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionButton>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<String>, // "body", "caption", "title", "subtitle"
    },
    #[serde(rename = "divider")]
    Divider,
    #[serde(rename = "spacer")]
    Spacer {
        #[serde(skip_serializing_if = "Option::is_none")]
        height: Option<i32>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActionButton {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A notification row about to be written.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i32,
    pub notification_type: String,
    pub title: String,
    pub body: JsonValue,
    pub priority: String,
}

impl NewNotification {
    pub fn from_body(user_id: i32, body: &NotificationBody, priority: &str) -> Self {
        Self {
            user_id,
            notification_type: body.body_type.clone(),
            title: body.title.clone(),
            body: serde_json::to_value(body).unwrap_or_default(),
            priority: priority.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub unread_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub notification_ids: Vec<i32>,
}
