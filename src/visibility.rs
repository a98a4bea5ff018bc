use log::debug;

use crate::models::homework::{Homework, HomeworkFilter};
use crate::roles::{Caller, Role, StudentProfile};
use crate::store::{HomeworkQuery, Learners};

/// What homework a caller is allowed to see. Chosen once per request from
/// the caller's effective role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Administrators.
    Everything,
    /// Teachers see the homework they assigned.
    TaughtBy(i32),
    /// Students see their own work, parents see their children's.
    Learners(Learners),
}

impl Visibility {
    pub fn for_caller(caller: &Caller) -> Self {
        let visibility = match caller.role() {
            Some(Role::Admin) => Visibility::Everything,
            Some(Role::Teacher) => Visibility::TaughtBy(caller.user_id),
            Some(Role::Student) => {
                Visibility::Learners(learners_of(caller.student.iter().copied()))
            }
            Some(Role::Parent) => Visibility::Learners(learners_of(caller.children.iter().copied())),
            None => Visibility::Learners(Learners::default()),
        };
        debug!(
            "Visibility for {} ({:?}): {:?}",
            caller.username,
            caller.role(),
            visibility
        );
        visibility
    }

    /// Combines the caller's scope with the filters it asked for. Learners
    /// cannot widen or narrow their scope through filters.
    pub fn query(&self, filter: HomeworkFilter) -> HomeworkQuery {
        match self {
            Visibility::Everything => HomeworkQuery {
                teacher_id: filter.teacher_id,
                student_id: filter.student_id,
                subject_id: filter.subject_id,
                class_id: filter.class_id,
                learners: None,
            },
            Visibility::TaughtBy(teacher_id) => HomeworkQuery {
                teacher_id: Some(*teacher_id),
                student_id: filter.student_id,
                subject_id: filter.subject_id,
                class_id: filter.class_id,
                learners: None,
            },
            Visibility::Learners(learners) => HomeworkQuery {
                learners: Some(learners.clone()),
                ..Default::default()
            },
        }
    }

    pub fn permits(&self, homework: &Homework) -> bool {
        match self {
            Visibility::Everything => true,
            Visibility::TaughtBy(teacher_id) => homework.teacher_id == *teacher_id,
            Visibility::Learners(learners) => learners.includes(&homework.audience),
        }
    }
}

fn learners_of(students: impl Iterator<Item = StudentProfile>) -> Learners {
    let mut learners = Learners::default();
    for student in students {
        learners.student_ids.push(student.user_id);
        if let Some(class_id) = student.class_id {
            if !learners.class_ids.contains(&class_id) {
                learners.class_ids.push(class_id);
            }
        }
    }
    learners
}
