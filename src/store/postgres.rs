use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

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

const HOMEWORK_SELECT: &str = "
    SELECT h.id, h.subject_id, h.teacher_id, h.student_id, h.class_id,
           h.title, h.description, h.due_date, h.attachments,
           h.completed, h.completed_at, h.created_at, h.updated_at,
           s.name AS subject_name,
           t.full_name AS teacher_name,
           st.full_name AS student_name,
           c.name AS class_name
    FROM homeworks h
    JOIN subjects s ON s.id = h.subject_id
    JOIN teachers t ON t.user_id = h.teacher_id
    LEFT JOIN students st ON st.user_id = h.student_id
    LEFT JOIN classes c ON c.id = h.class_id";

#[derive(FromRow)]
struct HomeworkRow {
    id: i32,
    subject_id: i32,
    teacher_id: i32,
    student_id: Option<i32>,
    class_id: Option<i32>,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    attachments: Option<String>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    subject_name: String,
    teacher_name: String,
    student_name: Option<String>,
    class_name: Option<String>,
}

impl TryFrom<HomeworkRow> for HomeworkDetails {
    type Error = StoreError;

    fn try_from(row: HomeworkRow) -> Result<Self, Self::Error> {
        let audience = Audience::from_columns(row.student_id, row.class_id).ok_or_else(|| {
            StoreError::Corrupt {
                table: "homeworks",
                reason: format!("homework {} must target exactly one student or class", row.id),
            }
        })?;

        let student = match (row.student_id, row.student_name) {
            (Some(id), Some(full_name)) => Some(PersonRef { id, full_name }),
            _ => None,
        };
        let class = match (row.class_id, row.class_name) {
            (Some(id), Some(name)) => Some(ClassRef { id, name }),
            _ => None,
        };

        Ok(HomeworkDetails {
            subject: SubjectRef {
                id: row.subject_id,
                name: row.subject_name,
            },
            teacher: PersonRef {
                id: row.teacher_id,
                full_name: row.teacher_name,
            },
            student,
            class,
            completions: None,
            homework: Homework {
                id: row.id,
                subject_id: row.subject_id,
                teacher_id: row.teacher_id,
                audience,
                title: row.title,
                description: row.description,
                due_date: row.due_date,
                attachments: attachments::decode(row.attachments.as_deref()),
                completed: row.completed,
                completed_at: row.completed_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
    }
}

#[derive(FromRow)]
struct CompletionRow {
    homework_id: i32,
    student_id: i32,
    completed_at: DateTime<Utc>,
}

impl From<CompletionRow> for HomeworkCompletion {
    fn from(row: CompletionRow) -> Self {
        HomeworkCompletion {
            homework_id: row.homework_id,
            student_id: row.student_id,
            completed_at: row.completed_at,
        }
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: i32,
    user_id: i32,
    notification_type: String,
    title: String,
    body: JsonValue,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
    priority: String,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            notification_type: row.notification_type,
            title: row.title,
            body: row.body,
            created_at: row.created_at,
            read_at: row.read_at,
            priority: row.priority,
        }
    }
}

/// Postgres-backed store. Constraint enforcement (one audience per
/// homework, one completion per student) lives in the schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait(?Send)]
impl HomeworkStore for PgStore {
    async fn user_profile(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, (i32, Option<i32>, Option<i32>)>(
            "SELECT u.id, s.user_id, s.class_id
             FROM users u
             LEFT JOIN students s ON s.user_id = u.id
             WHERE u.username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, student_user_id, class_id)) = row else {
            return Ok(None);
        };

        let children = sqlx::query_as::<_, (i32, Option<i32>)>(
            "SELECT s.user_id, s.class_id
             FROM parent_student_relations psr
             JOIN students s ON s.user_id = psr.student_user_id
             WHERE psr.parent_user_id = $1
             ORDER BY s.user_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(user_id, class_id)| StudentProfile { user_id, class_id })
        .collect();

        Ok(Some(UserProfile {
            user_id,
            student: student_user_id.map(|user_id| StudentProfile { user_id, class_id }),
            children,
        }))
    }

    async fn subject(&self, id: i32) -> StoreResult<Option<SubjectRef>> {
        let row = sqlx::query_as::<_, (i32, String)>("SELECT id, name FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| SubjectRef { id, name }))
    }

    async fn teacher(&self, user_id: i32) -> StoreResult<Option<PersonRef>> {
        let row = sqlx::query_as::<_, (i32, String)>(
            "SELECT user_id, full_name FROM teachers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, full_name)| PersonRef { id, full_name }))
    }

    async fn student(&self, user_id: i32) -> StoreResult<Option<PersonRef>> {
        let row = sqlx::query_as::<_, (i32, String)>(
            "SELECT user_id, full_name FROM students WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, full_name)| PersonRef { id, full_name }))
    }

    async fn class(&self, id: i32) -> StoreResult<Option<ClassRef>> {
        let row = sqlx::query_as::<_, (i32, String)>("SELECT id, name FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| ClassRef { id, name }))
    }

    async fn class_roster(&self, class_id: i32) -> StoreResult<Vec<PersonRef>> {
        let rows = sqlx::query_as::<_, (i32, String)>(
            "SELECT user_id, full_name FROM students
             WHERE class_id = $1
             ORDER BY full_name, user_id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, full_name)| PersonRef { id, full_name })
            .collect())
    }

    async fn parent_ids(&self, student_id: i32) -> StoreResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT parent_user_id FROM parent_student_relations WHERE student_user_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insert_homework(&self, homework: NewHomework) -> StoreResult<HomeworkDetails> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO homeworks
                (subject_id, teacher_id, student_id, class_id, title, description, due_date, attachments)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(homework.subject_id)
        .bind(homework.teacher_id)
        .bind(homework.audience.student_id())
        .bind(homework.audience.class_id())
        .bind(&homework.title)
        .bind(&homework.description)
        .bind(homework.due_date)
        .bind(attachments::encode(&homework.attachments))
        .fetch_one(&self.pool)
        .await?;

        self.homework(id).await?.ok_or_else(|| StoreError::Corrupt {
            table: "homeworks",
            reason: format!("inserted homework {} could not be read back", id),
        })
    }

    async fn homework(&self, id: i32) -> StoreResult<Option<HomeworkDetails>> {
        let query = format!("{} WHERE h.id = $1", HOMEWORK_SELECT);
        let row = sqlx::query_as::<_, HomeworkRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(HomeworkDetails::try_from).transpose()
    }

    async fn list_homeworks(&self, query: &HomeworkQuery) -> StoreResult<Vec<HomeworkDetails>> {
        let mut builder = QueryBuilder::<Postgres>::new(HOMEWORK_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(teacher_id) = query.teacher_id {
            builder.push(" AND h.teacher_id = ");
            builder.push_bind(teacher_id);
        }
        if let Some(student_id) = query.student_id {
            builder.push(" AND h.student_id = ");
            builder.push_bind(student_id);
        }
        if let Some(subject_id) = query.subject_id {
            builder.push(" AND h.subject_id = ");
            builder.push_bind(subject_id);
        }
        if let Some(class_id) = query.class_id {
            builder.push(" AND h.class_id = ");
            builder.push_bind(class_id);
        }
        if let Some(learners) = &query.learners {
            builder.push(" AND (h.student_id = ANY(");
            builder.push_bind(learners.student_ids.clone());
            builder.push(") OR (h.class_id = ANY(");
            builder.push_bind(learners.class_ids.clone());
            builder.push(") AND h.student_id IS NULL))");
        }

        builder.push(" ORDER BY h.due_date ASC, h.id ASC");

        builder
            .build_query_as::<HomeworkRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(HomeworkDetails::try_from)
            .collect()
    }

    async fn update_homework(
        &self,
        id: i32,
        changes: HomeworkChanges,
    ) -> StoreResult<Option<HomeworkDetails>> {
        let (set_completion, completed, completed_at) = match changes.completion {
            Some((completed, completed_at)) => (true, completed, completed_at),
            None => (false, false, None),
        };

        let result = sqlx::query(
            "UPDATE homeworks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                due_date = COALESCE($4, due_date),
                completed = CASE WHEN $5 THEN $6 ELSE completed END,
                completed_at = CASE WHEN $5 THEN $7 ELSE completed_at END,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.due_date)
        .bind(set_completion)
        .bind(completed)
        .bind(completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.homework(id).await
    }

    async fn delete_homework(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM homeworks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_completion(
        &self,
        homework_id: i32,
        student_id: i32,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<HomeworkCompletion> {
        let row = sqlx::query_as::<_, CompletionRow>(
            "INSERT INTO homework_completions (homework_id, student_id, completed_at)
             VALUES ($1, $2, $3)
             RETURNING homework_id, student_id, completed_at",
        )
        .bind(homework_id)
        .bind(student_id)
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn completions(&self, homework_id: i32) -> StoreResult<Vec<HomeworkCompletion>> {
        let rows = sqlx::query_as::<_, CompletionRow>(
            "SELECT homework_id, student_id, completed_at
             FROM homework_completions
             WHERE homework_id = $1
             ORDER BY completed_at, student_id",
        )
        .bind(homework_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(HomeworkCompletion::from).collect())
    }
}

#[async_trait(?Send)]
impl NotificationStore for PgStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications (user_id, type, title, body, priority)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, user_id, type AS notification_type, title, body, created_at, read_at, priority",
        )
        .bind(notification.user_id)
        .bind(&notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.priority)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn notifications(
        &self,
        user_id: i32,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, user_id, type AS notification_type, title, body, created_at, read_at, priority
             FROM notifications WHERE user_id = ",
        );
        builder.push_bind(user_id);

        if unread_only {
            builder.push(" AND read_at IS NULL");
        }

        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<NotificationRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn unread_count(&self, user_id: i32) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_read(&self, user_id: i32, ids: &[i32]) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications
             SET read_at = NOW()
             WHERE id = ANY($1) AND user_id = $2 AND read_at IS NULL",
        )
        .bind(ids)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, user_id: i32, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
