use std::fmt;

use serde::Serialize;

use crate::error::ApiError;

/// Roles carried in the bearer token. Declaration order is precedence:
/// a user holding several roles acts as the highest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn parse(name: &str) -> Option<Role> {
        match name.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            "parent" => Some(Role::Parent),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Teacher => write!(f, "teacher"),
            Role::Student => write!(f, "student"),
            Role::Parent => write!(f, "parent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentProfile {
    pub user_id: i32,
    pub class_id: Option<i32>,
}

/// Profile rows linked to a user account.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub user_id: i32,
    pub student: Option<StudentProfile>,
    pub children: Vec<StudentProfile>,
}

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: i32,
    pub username: String,
    pub roles: Vec<Role>,
    pub student: Option<StudentProfile>,
    pub children: Vec<StudentProfile>,
}

impl Caller {
    pub fn new(username: String, roles: Vec<Role>, profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            username,
            roles,
            student: profile.student,
            children: profile.children,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.roles.iter().copied().max()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn require_any(&self, allowed: &[Role], message: &str) -> Result<(), ApiError> {
        if allowed.iter().any(|role| self.has_role(*role)) {
            Ok(())
        } else {
            Err(ApiError::forbidden(message))
        }
    }

    /// Admins pass; teachers pass only for their own rows.
    pub fn require_owner(&self, teacher_id: i32) -> Result<(), ApiError> {
        if self.is_admin() {
            return Ok(());
        }
        if self.has_role(Role::Teacher) && self.user_id == teacher_id {
            return Ok(());
        }
        Err(ApiError::forbidden("Not authorized to manage this homework"))
    }
}
