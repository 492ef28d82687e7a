//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Moderation state of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "comment_state", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CommentState {
    New,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i32,
    pub created: DateTime<Utc>,
    pub event_id: i32,
    pub author_id: i32,
    pub body: String,
    pub state: CommentState,
}
