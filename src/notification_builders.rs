use serde_json::json;

use crate::models::notification::{ActionButton, ContentBlock, NotificationBody, NotificationContent};

/// Helper functions to build common notification types

/// Create a homework assignment notification for students and parents
pub fn build_homework_assigned_notification(
    homework_id: i32,
    title: &str,
    teacher_name: &str,
    subject_name: &str,
    due_date: &str,
) -> NotificationBody {
    NotificationBody {
        body_type: "homework_assigned".to_string(),
        title: "New Homework".to_string(),
        route: Some(format!("/homeworks/{}", homework_id)),
        content: NotificationContent {
            blocks: vec![
                ContentBlock::Text {
                    text: format!("{} assigned new {} homework:", teacher_name, subject_name),
                    style: Some("body".to_string()),
                },
                ContentBlock::Text {
                    text: title.to_string(),
                    style: Some("title".to_string()),
                },
                ContentBlock::Spacer { height: Some(8) },
                ContentBlock::Text {
                    text: format!("Due: {}", due_date),
                    style: Some("caption".to_string()),
                },
            ],
            actions: Some(vec![ActionButton {
                label: "View Homework".to_string(),
                route: Some(format!("/homeworks/{}", homework_id)),
                primary: true,
                icon: Some("assignment".to_string()),
            }]),
        },
        metadata: Some(json!({
            "homework_id": homework_id,
        })),
    }
}

/// Create a completion notification for the assigning teacher
pub fn build_homework_completed_notification(
    homework_id: i32,
    title: &str,
    student_name: &str,
) -> NotificationBody {
    NotificationBody {
        body_type: "homework_completed".to_string(),
        title: "Homework Completed".to_string(),
        route: Some(format!("/homeworks/{}", homework_id)),
        content: NotificationContent {
            blocks: vec![
                ContentBlock::Text {
                    text: format!("**{}** completed homework:", student_name),
                    style: Some("body".to_string()),
                },
                ContentBlock::Text {
                    text: title.to_string(),
                    style: Some("title".to_string()),
                },
                ContentBlock::Divider,
            ],
            actions: Some(vec![ActionButton {
                label: "Completion Stats".to_string(),
                route: Some(format!("/homeworks/{}/completion-stats", homework_id)),
                primary: false,
                icon: Some("insights".to_string()),
            }]),
        },
        metadata: Some(json!({
            "homework_id": homework_id,
            "student_name": student_name,
        })),
    }
}
