use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a homework is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "audience", rename_all = "snake_case")]
pub enum Audience {
    #[serde(rename_all = "camelCase")]
    Individual { student_id: i32 },
    #[serde(rename_all = "camelCase")]
    ClassWide { class_id: i32 },
}

impl Audience {
    /// Rebuilds the audience from the nullable `student_id` / `class_id` columns.
    /// Exactly one of them must be set.
    pub fn from_columns(student_id: Option<i32>, class_id: Option<i32>) -> Option<Self> {
        match (student_id, class_id) {
            (Some(student_id), None) => Some(Audience::Individual { student_id }),
            (None, Some(class_id)) => Some(Audience::ClassWide { class_id }),
            _ => None,
        }
    }

    pub fn student_id(&self) -> Option<i32> {
        match self {
            Audience::Individual { student_id } => Some(*student_id),
            Audience::ClassWide { .. } => None,
        }
    }

    pub fn class_id(&self) -> Option<i32> {
        match self {
            Audience::ClassWide { class_id } => Some(*class_id),
            Audience::Individual { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Homework {
    pub id: i32,
    pub subject_id: i32,
    pub teacher_id: i32,
    #[serde(flatten)]
    pub audience: Audience,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub attachments: Vec<String>,
    /// Only meaningful for `Audience::Individual`.
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkCompletion {
    pub homework_id: i32,
    pub student_id: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectRef {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRef {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub id: i32,
    pub full_name: String,
}

/// A homework with its referenced rows expanded.
#[derive(Debug, Clone, Serialize)]
pub struct HomeworkDetails {
    #[serde(flatten)]
    pub homework: Homework,
    pub subject: SubjectRef,
    pub teacher: PersonRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<PersonRef>,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions: Option<Vec<HomeworkCompletion>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCompletion {
    pub student: PersonRef,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub homework_id: i32,
    pub class_id: i32,
    pub total: usize,
    pub completed: usize,
    pub percentage: f64,
    pub students: Vec<StudentCompletion>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHomeworkRequest {
    pub subject_id: i32,
    pub teacher_id: i32,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub student_id: Option<i32>,
    pub class_id: Option<i32>,
    pub attachments: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHomeworkRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkFilter {
    pub student_id: Option<i32>,
    pub teacher_id: Option<i32>,
    pub subject_id: Option<i32>,
    pub class_id: Option<i32>,
}

/// Attachments are stored as one JSON text column and parsed on every read.
pub mod attachments {
    pub fn encode(urls: &[String]) -> String {
        serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string())
    }

    /// Unparseable or missing text reads as no attachments.
    pub fn decode(raw: Option<&str>) -> Vec<String> {
        raw.and_then(|text| serde_json::from_str(text).ok())
            .unwrap_or_default()
    }

    pub fn is_url_like(value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return false;
        }
        value.starts_with("http://")
            || value.starts_with("https://")
            || (value.starts_with('/') && !value.starts_with("//"))
    }
}
