pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::homework::{
    Audience, ClassRef, HomeworkCompletion, HomeworkDetails, PersonRef, SubjectRef,
};
use crate::models::notification::{NewNotification, Notification};
use crate::roles::UserProfile;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewHomework {
    pub subject_id: i32,
    pub teacher_id: i32,
    pub audience: Audience,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HomeworkChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// `Some((completed, completed_at))` rewrites both columns together.
    pub completion: Option<(bool, Option<DateTime<Utc>>)>,
}

/// Students (and their classes) whose homework a caller may see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Learners {
    pub student_ids: Vec<i32>,
    pub class_ids: Vec<i32>,
}

impl Learners {
    /// `student_id` in the set, or class-wide for one of the classes.
    pub fn includes(&self, audience: &Audience) -> bool {
        match audience {
            Audience::Individual { student_id } => self.student_ids.contains(student_id),
            Audience::ClassWide { class_id } => self.class_ids.contains(class_id),
        }
    }
}

/// Column filters for listing homework, already scoped to the caller.
#[derive(Debug, Clone, Default)]
pub struct HomeworkQuery {
    pub teacher_id: Option<i32>,
    pub student_id: Option<i32>,
    pub subject_id: Option<i32>,
    pub class_id: Option<i32>,
    pub learners: Option<Learners>,
}

impl HomeworkQuery {
    pub fn matches(&self, details: &HomeworkDetails) -> bool {
        let homework = &details.homework;
        if self.teacher_id.is_some_and(|id| id != homework.teacher_id) {
            return false;
        }
        if self.subject_id.is_some_and(|id| id != homework.subject_id) {
            return false;
        }
        if self
            .student_id
            .is_some_and(|id| homework.audience.student_id() != Some(id))
        {
            return false;
        }
        if self
            .class_id
            .is_some_and(|id| homework.audience.class_id() != Some(id))
        {
            return false;
        }
        match &self.learners {
            Some(learners) => learners.includes(&homework.audience),
            None => true,
        }
    }
}

/// Data access for homework and the rows it references.
#[async_trait(?Send)]
pub trait HomeworkStore: Send + Sync {
    async fn user_profile(&self, username: &str) -> StoreResult<Option<UserProfile>>;

    async fn subject(&self, id: i32) -> StoreResult<Option<SubjectRef>>;
    async fn teacher(&self, user_id: i32) -> StoreResult<Option<PersonRef>>;
    async fn student(&self, user_id: i32) -> StoreResult<Option<PersonRef>>;
    async fn class(&self, id: i32) -> StoreResult<Option<ClassRef>>;
    /// Students currently in the class, ordered by full name then id.
    async fn class_roster(&self, class_id: i32) -> StoreResult<Vec<PersonRef>>;
    async fn parent_ids(&self, student_id: i32) -> StoreResult<Vec<i32>>;

    async fn insert_homework(&self, homework: NewHomework) -> StoreResult<HomeworkDetails>;
    async fn homework(&self, id: i32) -> StoreResult<Option<HomeworkDetails>>;
    /// Ordered by due date ascending, then id.
    async fn list_homeworks(&self, query: &HomeworkQuery) -> StoreResult<Vec<HomeworkDetails>>;
    async fn update_homework(
        &self,
        id: i32,
        changes: HomeworkChanges,
    ) -> StoreResult<Option<HomeworkDetails>>;
    /// Removes the homework and its completions. `false` when absent.
    async fn delete_homework(&self, id: i32) -> StoreResult<bool>;

    /// Fails with `StoreError::Duplicate` when the pair already exists.
    async fn insert_completion(
        &self,
        homework_id: i32,
        student_id: i32,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<HomeworkCompletion>;
    async fn completions(&self, homework_id: i32) -> StoreResult<Vec<HomeworkCompletion>>;
}

#[async_trait(?Send)]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: NewNotification)
        -> StoreResult<Notification>;
    /// Newest first.
    async fn notifications(
        &self,
        user_id: i32,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>>;
    async fn unread_count(&self, user_id: i32) -> StoreResult<i64>;
    async fn mark_read(&self, user_id: i32, ids: &[i32]) -> StoreResult<u64>;
    async fn delete_notification(&self, user_id: i32, id: i32) -> StoreResult<bool>;
}
