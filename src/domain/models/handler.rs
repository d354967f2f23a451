//! Handler (moderator/admin) snapshot.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a handler in the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerRole {
    User,
    Moderator,
    Admin,
}

/// A moderator or admin eligible to be assigned a ticket.
///
/// Read-only from the workflow's perspective; the user-management
/// collaborator owns the records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handler {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub role: HandlerRole,
}

impl Handler {
    pub fn new(email: impl Into<String>, skills: Vec<String>, role: HandlerRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            skills,
            role,
        }
    }
}
