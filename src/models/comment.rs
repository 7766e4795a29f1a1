use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Record, RecordStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub comment: String,
    pub post_id: u64,
    pub user_id: u64,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Record for Comment {
    fn id(&self) -> u64 {
        self.id
    }

    fn status(&self) -> RecordStatus {
        self.status
    }

    fn set_status(&mut self, status: RecordStatus) {
        self.status = status;
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,

    pub post_id: u64,

    pub user_id: u64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,
}
