// Data models and DTOs for the demo resource routers

pub mod comment;
pub mod post;
pub mod user;

pub use comment::{Comment, CreateCommentRequest, UpdateCommentRequest};
pub use post::{CreatePostRequest, Post, UpdatePostRequest};
pub use user::{CreateUserRequest, UpdateUserRequest, User};

use serde::{Deserialize, Serialize};

/// Lifecycle of a stored record; deletes are soft
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Deleted,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Active => write!(f, "active"),
            RecordStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// A row the in-memory store can hold
pub trait Record: Clone + Serialize + Send + Sync + 'static {
    fn id(&self) -> u64;
    fn status(&self) -> RecordStatus;
    fn set_status(&mut self, status: RecordStatus);

    fn is_active(&self) -> bool {
        self.status() == RecordStatus::Active
    }
}
