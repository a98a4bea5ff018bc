use chrono::Utc;
use log::{info, warn};

use crate::error::{ApiError, StoreError};
use crate::models::homework::{
    attachments, Audience, CreateHomeworkRequest, HomeworkDetails, HomeworkFilter,
    UpdateHomeworkRequest,
};
use crate::notifications::Notifier;
use crate::roles::{Caller, Role};
use crate::store::{HomeworkChanges, HomeworkStore, NewHomework};
use crate::visibility::Visibility;
use crate::AppState;

const MANAGE_ROLES: &[Role] = &[Role::Teacher, Role::Admin];

/// Homework create/read/update/delete for one request.
pub struct HomeworkService<'a> {
    pub(super) store: &'a dyn HomeworkStore,
    pub(super) notifier: Notifier<'a>,
}

impl<'a> HomeworkService<'a> {
    pub fn new(app_state: &'a AppState) -> Self {
        Self {
            store: app_state.homeworks.as_ref(),
            notifier: Notifier::new(app_state.notifications.as_ref()),
        }
    }

    pub async fn create(
        &self,
        caller: &Caller,
        request: CreateHomeworkRequest,
    ) -> Result<HomeworkDetails, ApiError> {
        caller.require_any(MANAGE_ROLES, "Teacher access required")?;
        if !caller.is_admin() && request.teacher_id != caller.user_id {
            return Err(ApiError::forbidden(
                "Teachers can only assign homework in their own name",
            ));
        }

        let audience = Audience::from_columns(request.student_id, request.class_id)
            .ok_or_else(|| ApiError::validation("Exactly one of studentId or classId must be set"))?;
        let title = validate_title(&request.title)?;
        let urls = request.attachments.unwrap_or_default();
        validate_attachments(&urls)?;

        if self.store.subject(request.subject_id).await?.is_none() {
            return Err(ApiError::NotFound("Subject"));
        }
        if self.store.teacher(request.teacher_id).await?.is_none() {
            return Err(ApiError::NotFound("Teacher"));
        }
        match audience {
            Audience::Individual { student_id } => {
                if self.store.student(student_id).await?.is_none() {
                    return Err(ApiError::NotFound("Student"));
                }
            }
            Audience::ClassWide { class_id } => {
                if self.store.class(class_id).await?.is_none() {
                    return Err(ApiError::NotFound("Class"));
                }
            }
        }

        let details = self
            .store
            .insert_homework(NewHomework {
                subject_id: request.subject_id,
                teacher_id: request.teacher_id,
                audience,
                title,
                description: request.description,
                due_date: request.due_date,
                attachments: urls,
            })
            .await?;

        info!(
            "Homework {} created by {} for {:?}",
            details.homework.id, caller.username, details.homework.audience
        );

        match self.audience_recipients(&audience).await {
            Ok(recipients) => self.notifier.homework_assigned(&details, &recipients).await,
            Err(e) => warn!(
                "Skipping notifications for homework {}: {}",
                details.homework.id, e
            ),
        }

        self.with_completions(details).await
    }

    pub async fn list(
        &self,
        caller: &Caller,
        filter: HomeworkFilter,
    ) -> Result<Vec<HomeworkDetails>, ApiError> {
        let query = Visibility::for_caller(caller).query(filter);
        Ok(self.store.list_homeworks(&query).await?)
    }

    pub async fn get(&self, caller: &Caller, id: i32) -> Result<HomeworkDetails, ApiError> {
        let details = self.load(id).await?;
        if !Visibility::for_caller(caller).permits(&details.homework) {
            return Err(ApiError::NotFound("Homework"));
        }
        self.with_completions(details).await
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: i32,
        request: UpdateHomeworkRequest,
    ) -> Result<HomeworkDetails, ApiError> {
        caller.require_any(MANAGE_ROLES, "Teacher access required")?;
        let existing = self.load(id).await?;
        caller.require_owner(existing.homework.teacher_id)?;

        let title = request.title.as_deref().map(validate_title).transpose()?;
        let completion = request.completed.map(|completed| {
            let completed_at = if completed { Some(Utc::now()) } else { None };
            (completed, completed_at)
        });

        let updated = self
            .store
            .update_homework(
                id,
                HomeworkChanges {
                    title,
                    description: request.description,
                    due_date: request.due_date,
                    completion,
                },
            )
            .await?
            .ok_or(ApiError::NotFound("Homework"))?;

        self.with_completions(updated).await
    }

    pub async fn delete(&self, caller: &Caller, id: i32) -> Result<(), ApiError> {
        caller.require_any(MANAGE_ROLES, "Teacher access required")?;
        let existing = self.load(id).await?;
        caller.require_owner(existing.homework.teacher_id)?;

        if !self.store.delete_homework(id).await? {
            return Err(ApiError::NotFound("Homework"));
        }
        info!("Homework {} deleted by {}", id, caller.username);
        Ok(())
    }

    pub(super) async fn load(&self, id: i32) -> Result<HomeworkDetails, ApiError> {
        self.store
            .homework(id)
            .await?
            .ok_or(ApiError::NotFound("Homework"))
    }

    /// Class-wide homework carries its completion rows; individual homework
    /// uses the `completed` flag instead.
    pub(super) async fn with_completions(
        &self,
        mut details: HomeworkDetails,
    ) -> Result<HomeworkDetails, ApiError> {
        if details.homework.audience.class_id().is_some() {
            details.completions = Some(self.store.completions(details.homework.id).await?);
        }
        Ok(details)
    }

    async fn audience_recipients(&self, audience: &Audience) -> Result<Vec<i32>, StoreError> {
        let recipients = match audience {
            Audience::Individual { student_id } => {
                let mut ids = vec![*student_id];
                ids.extend(self.store.parent_ids(*student_id).await?);
                ids
            }
            Audience::ClassWide { class_id } => self
                .store
                .class_roster(*class_id)
                .await?
                .into_iter()
                .map(|student| student.id)
                .collect(),
        };
        Ok(recipients)
    }
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Title cannot be empty"));
    }
    Ok(title.to_string())
}

fn validate_attachments(urls: &[String]) -> Result<(), ApiError> {
    match urls.iter().find(|url| !attachments::is_url_like(url)) {
        Some(bad) => Err(ApiError::Validation(format!(
            "Attachment '{}' is not a valid URL",
            bad
        ))),
        None => Ok(()),
    }
}
