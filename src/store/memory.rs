use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    HomeworkChanges, HomeworkQuery, HomeworkStore, NewHomework, NotificationStore, StoreResult,
};
use crate::error::StoreError;
use crate::models::homework::{
    attachments, Audience, ClassRef, Homework, HomeworkCompletion, HomeworkDetails, PersonRef,
    SubjectRef,
};
use crate::models::notification::{NewNotification, Notification};
use crate::roles::{StudentProfile, UserProfile};

struct StoredHomework {
    id: i32,
    subject_id: i32,
    teacher_id: i32,
    audience: Audience,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    /// Kept serialized, like the database column.
    attachments: String,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct StoredStudent {
    full_name: String,
    class_id: Option<i32>,
}

#[derive(Default)]
struct State {
    next_id: i32,
    usernames: HashMap<String, i32>,
    subjects: BTreeMap<i32, String>,
    classes: BTreeMap<i32, String>,
    teachers: BTreeMap<i32, String>,
    students: BTreeMap<i32, StoredStudent>,
    /// parent user id -> child student ids
    parents: BTreeMap<i32, Vec<i32>>,
    homeworks: BTreeMap<i32, StoredHomework>,
    completions: Vec<HomeworkCompletion>,
    notifications: Vec<Notification>,
}

impl State {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn add_user(&mut self, username: &str) -> i32 {
        let id = self.allocate_id();
        self.usernames.insert(username.to_string(), id);
        id
    }

    fn details(&self, stored: &StoredHomework) -> StoreResult<HomeworkDetails> {
        let corrupt = |reason: String| StoreError::Corrupt {
            table: "homeworks",
            reason,
        };

        let subject = self
            .subjects
            .get(&stored.subject_id)
            .map(|name| SubjectRef {
                id: stored.subject_id,
                name: name.clone(),
            })
            .ok_or_else(|| corrupt(format!("missing subject {}", stored.subject_id)))?;
        let teacher = self
            .teachers
            .get(&stored.teacher_id)
            .map(|full_name| PersonRef {
                id: stored.teacher_id,
                full_name: full_name.clone(),
            })
            .ok_or_else(|| corrupt(format!("missing teacher {}", stored.teacher_id)))?;
        let student = stored.audience.student_id().and_then(|id| {
            self.students.get(&id).map(|s| PersonRef {
                id,
                full_name: s.full_name.clone(),
            })
        });
        let class = stored.audience.class_id().and_then(|id| {
            self.classes.get(&id).map(|name| ClassRef {
                id,
                name: name.clone(),
            })
        });

        Ok(HomeworkDetails {
            homework: Homework {
                id: stored.id,
                subject_id: stored.subject_id,
                teacher_id: stored.teacher_id,
                audience: stored.audience,
                title: stored.title.clone(),
                description: stored.description.clone(),
                due_date: stored.due_date,
                attachments: attachments::decode(Some(&stored.attachments)),
                completed: stored.completed,
                completed_at: stored.completed_at,
                created_at: stored.created_at,
                updated_at: stored.updated_at,
            },
            subject,
            teacher,
            student,
            class,
            completions: None,
        })
    }
}

/// In-process store with the same constraints as the Postgres schema.
/// Seed it through the `add_*` helpers.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_class(&self, name: &str) -> i32 {
        let mut state = self.state();
        let id = state.allocate_id();
        state.classes.insert(id, name.to_string());
        id
    }

    pub fn add_subject(&self, name: &str) -> i32 {
        let mut state = self.state();
        let id = state.allocate_id();
        state.subjects.insert(id, name.to_string());
        id
    }

    /// A user account with no linked profile, e.g. an administrator.
    pub fn add_user(&self, username: &str) -> i32 {
        self.state().add_user(username)
    }

    pub fn add_teacher(&self, username: &str, full_name: &str) -> i32 {
        let mut state = self.state();
        let id = state.add_user(username);
        state.teachers.insert(id, full_name.to_string());
        id
    }

    pub fn add_student(&self, username: &str, full_name: &str, class_id: Option<i32>) -> i32 {
        let mut state = self.state();
        let id = state.add_user(username);
        state.students.insert(
            id,
            StoredStudent {
                full_name: full_name.to_string(),
                class_id,
            },
        );
        id
    }

    pub fn add_parent(&self, username: &str, children: &[i32]) -> i32 {
        let mut state = self.state();
        let id = state.add_user(username);
        state.parents.insert(id, children.to_vec());
        id
    }

    /// Moves a student to another class (or out of any class).
    pub fn assign_class(&self, student_id: i32, class_id: Option<i32>) {
        if let Some(student) = self.state().students.get_mut(&student_id) {
            student.class_id = class_id;
        }
    }

    pub fn completion_rows(&self, homework_id: i32) -> usize {
        self.state()
            .completions
            .iter()
            .filter(|c| c.homework_id == homework_id)
            .count()
    }
}

#[async_trait(?Send)]
impl HomeworkStore for MemoryStore {
    async fn user_profile(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        let state = self.state();
        let Some(&user_id) = state.usernames.get(username) else {
            return Ok(None);
        };

        let student = state.students.get(&user_id).map(|s| StudentProfile {
            user_id,
            class_id: s.class_id,
        });
        let children = state
            .parents
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| {
                        state.students.get(id).map(|s| StudentProfile {
                            user_id: *id,
                            class_id: s.class_id,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(UserProfile {
            user_id,
            student,
            children,
        }))
    }

    async fn subject(&self, id: i32) -> StoreResult<Option<SubjectRef>> {
        Ok(self.state().subjects.get(&id).map(|name| SubjectRef {
            id,
            name: name.clone(),
        }))
    }

    async fn teacher(&self, user_id: i32) -> StoreResult<Option<PersonRef>> {
        Ok(self.state().teachers.get(&user_id).map(|full_name| PersonRef {
            id: user_id,
            full_name: full_name.clone(),
        }))
    }

    async fn student(&self, user_id: i32) -> StoreResult<Option<PersonRef>> {
        Ok(self.state().students.get(&user_id).map(|s| PersonRef {
            id: user_id,
            full_name: s.full_name.clone(),
        }))
    }

    async fn class(&self, id: i32) -> StoreResult<Option<ClassRef>> {
        Ok(self.state().classes.get(&id).map(|name| ClassRef {
            id,
            name: name.clone(),
        }))
    }

    async fn class_roster(&self, class_id: i32) -> StoreResult<Vec<PersonRef>> {
        let mut roster: Vec<PersonRef> = self
            .state()
            .students
            .iter()
            .filter(|(_, s)| s.class_id == Some(class_id))
            .map(|(id, s)| PersonRef {
                id: *id,
                full_name: s.full_name.clone(),
            })
            .collect();
        roster.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        Ok(roster)
    }

    async fn parent_ids(&self, student_id: i32) -> StoreResult<Vec<i32>> {
        Ok(self
            .state()
            .parents
            .iter()
            .filter(|(_, children)| children.contains(&student_id))
            .map(|(parent_id, _)| *parent_id)
            .collect())
    }

    async fn insert_homework(&self, homework: NewHomework) -> StoreResult<HomeworkDetails> {
        let mut state = self.state();
        let id = state.allocate_id();
        let now = Utc::now();
        let stored = StoredHomework {
            id,
            subject_id: homework.subject_id,
            teacher_id: homework.teacher_id,
            audience: homework.audience,
            title: homework.title,
            description: homework.description,
            due_date: homework.due_date,
            attachments: attachments::encode(&homework.attachments),
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let details = state.details(&stored)?;
        state.homeworks.insert(id, stored);
        Ok(details)
    }

    async fn homework(&self, id: i32) -> StoreResult<Option<HomeworkDetails>> {
        let state = self.state();
        state
            .homeworks
            .get(&id)
            .map(|stored| state.details(stored))
            .transpose()
    }

    async fn list_homeworks(&self, query: &HomeworkQuery) -> StoreResult<Vec<HomeworkDetails>> {
        let state = self.state();
        let mut rows = Vec::new();
        for stored in state.homeworks.values() {
            let details = state.details(stored)?;
            if query.matches(&details) {
                rows.push(details);
            }
        }
        rows.sort_by(|a, b| {
            a.homework
                .due_date
                .cmp(&b.homework.due_date)
                .then(a.homework.id.cmp(&b.homework.id))
        });
        Ok(rows)
    }

    async fn update_homework(
        &self,
        id: i32,
        changes: HomeworkChanges,
    ) -> StoreResult<Option<HomeworkDetails>> {
        let mut state = self.state();
        let Some(stored) = state.homeworks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            stored.title = title;
        }
        if let Some(description) = changes.description {
            stored.description = description;
        }
        if let Some(due_date) = changes.due_date {
            stored.due_date = due_date;
        }
        if let Some((completed, completed_at)) = changes.completion {
            stored.completed = completed;
            stored.completed_at = completed_at;
        }
        stored.updated_at = Utc::now();

        let state = &*state;
        state
            .homeworks
            .get(&id)
            .map(|stored| state.details(stored))
            .transpose()
    }

    async fn delete_homework(&self, id: i32) -> StoreResult<bool> {
        let mut state = self.state();
        if state.homeworks.remove(&id).is_none() {
            return Ok(false);
        }
        state.completions.retain(|c| c.homework_id != id);
        Ok(true)
    }

    async fn insert_completion(
        &self,
        homework_id: i32,
        student_id: i32,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<HomeworkCompletion> {
        let mut state = self.state();
        let exists = state
            .completions
            .iter()
            .any(|c| c.homework_id == homework_id && c.student_id == student_id);
        if exists {
            return Err(StoreError::Duplicate);
        }

        let completion = HomeworkCompletion {
            homework_id,
            student_id,
            completed_at,
        };
        state.completions.push(completion.clone());
        Ok(completion)
    }

    async fn completions(&self, homework_id: i32) -> StoreResult<Vec<HomeworkCompletion>> {
        let mut rows: Vec<HomeworkCompletion> = self
            .state()
            .completions
            .iter()
            .filter(|c| c.homework_id == homework_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then(a.student_id.cmp(&b.student_id))
        });
        Ok(rows)
    }
}

#[async_trait(?Send)]
impl NotificationStore for MemoryStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        let mut state = self.state();
        let id = state.allocate_id();
        let row = Notification {
            id,
            user_id: notification.user_id,
            notification_type: notification.notification_type,
            title: notification.title,
            body: notification.body,
            created_at: Utc::now(),
            read_at: None,
            priority: notification.priority,
        };
        state.notifications.push(row.clone());
        Ok(row)
    }

    async fn notifications(
        &self,
        user_id: i32,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || n.read_at.is_none()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn unread_count(&self, user_id: i32) -> StoreResult<i64> {
        Ok(self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
            .count() as i64)
    }

    async fn mark_read(&self, user_id: i32, ids: &[i32]) -> StoreResult<u64> {
        let now = Utc::now();
        let mut marked = 0;
        for row in self.state().notifications.iter_mut() {
            if row.user_id == user_id && row.read_at.is_none() && ids.contains(&row.id) {
                row.read_at = Some(now);
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn delete_notification(&self, user_id: i32, id: i32) -> StoreResult<bool> {
        let mut state = self.state();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|n| !(n.id == id && n.user_id == user_id));
        Ok(state.notifications.len() < before)
    }
}
