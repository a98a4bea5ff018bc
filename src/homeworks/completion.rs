use std::collections::HashMap;

use chrono::Utc;
use log::info;

use super::service::HomeworkService;
use crate::error::{ApiError, StoreError};
use crate::models::homework::{
    Audience, CompletionStats, HomeworkCompletion, HomeworkDetails, PersonRef, StudentCompletion,
};
use crate::roles::{Caller, Role};
use crate::store::HomeworkChanges;

impl<'a> HomeworkService<'a> {
    /// Records that the calling student finished the homework. Class-wide
    /// homework gets one completion row per student; a second attempt is a
    /// conflict, decided by the store's unique constraint.
    pub async fn mark_completed(
        &self,
        caller: &Caller,
        homework_id: i32,
    ) -> Result<HomeworkDetails, ApiError> {
        caller.require_any(
            &[Role::Student, Role::Teacher, Role::Admin],
            "Not authorized to complete homework",
        )?;
        let student = caller
            .student
            .ok_or_else(|| ApiError::forbidden("Only students can complete homework"))?;

        let details = self.load(homework_id).await?;

        let refreshed = match details.homework.audience {
            Audience::ClassWide { class_id } => {
                if student.class_id != Some(class_id) {
                    return Err(ApiError::forbidden("No access to this assignment"));
                }

                match self
                    .store
                    .insert_completion(homework_id, student.user_id, Utc::now())
                    .await
                {
                    Ok(_) => {}
                    Err(StoreError::Duplicate) => {
                        return Err(ApiError::Conflict("Homework already completed".to_string()))
                    }
                    Err(e) => return Err(e.into()),
                }
                self.load(homework_id).await?
            }
            Audience::Individual { student_id } => {
                if student_id != student.user_id {
                    return Err(ApiError::forbidden("No access to this assignment"));
                }

                self.store
                    .update_homework(
                        homework_id,
                        HomeworkChanges {
                            completion: Some((true, Some(Utc::now()))),
                            ..Default::default()
                        },
                    )
                    .await?
                    .ok_or(ApiError::NotFound("Homework"))?
            }
        };

        info!(
            "Homework {} completed by student {}",
            homework_id, student.user_id
        );

        let student_name = self
            .store
            .student(student.user_id)
            .await
            .ok()
            .flatten()
            .map(|s| s.full_name)
            .unwrap_or_else(|| caller.username.clone());
        self.notifier
            .homework_completed(&refreshed, &student_name)
            .await;

        self.with_completions(refreshed).await
    }

    /// Per-student completion state for a class-wide homework, computed from
    /// the current class roster on every call.
    pub async fn completion_stats(
        &self,
        caller: &Caller,
        homework_id: i32,
    ) -> Result<CompletionStats, ApiError> {
        caller.require_any(&[Role::Teacher, Role::Admin], "Teacher access required")?;
        let details = self.load(homework_id).await?;
        caller.require_owner(details.homework.teacher_id)?;

        let class_id = details
            .homework
            .audience
            .class_id()
            .ok_or_else(|| ApiError::validation("Homework is not a class assignment"))?;

        let roster = self.store.class_roster(class_id).await?;
        let completions = self.store.completions(homework_id).await?;

        Ok(build_stats(homework_id, class_id, roster, &completions))
    }
}

fn build_stats(
    homework_id: i32,
    class_id: i32,
    roster: Vec<PersonRef>,
    completions: &[HomeworkCompletion],
) -> CompletionStats {
    let done: HashMap<i32, _> = completions
        .iter()
        .map(|c| (c.student_id, c.completed_at))
        .collect();

    let students: Vec<StudentCompletion> = roster
        .into_iter()
        .map(|student| {
            let completed_at = done.get(&student.id).copied();
            StudentCompletion {
                completed: completed_at.is_some(),
                completed_at,
                student,
            }
        })
        .collect();

    let total = students.len();
    let completed = completions.len();
    let percentage = if total == 0 {
        0.0
    } else {
        completed as f64 * 100.0 / total as f64
    };

    CompletionStats {
        homework_id,
        class_id,
        total,
        completed,
        percentage,
        students,
    }
}
