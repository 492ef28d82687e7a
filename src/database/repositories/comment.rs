//! Comment repository implementation
//!
//! Comment moderation lives outside this crate. The core attaches the
//! non-rejected comments of an event to its full views, read-only.

use sqlx::PgPool;

use crate::models::comment::Comment;
use crate::utils::errors::Result;

const COMMENT_COLUMNS: &str = "id, created, event_id, author_id, body, state";

#[derive(Debug, Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Non-rejected comments of a single event
    pub async fn find_non_rejected_for_event(&self, event_id: i32) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE event_id = $1 AND state <> 'REJECTED' ORDER BY created ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Non-rejected comments for a batch of events, one query
    pub async fn find_non_rejected_for_events(&self, event_ids: &[i32]) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE event_id = ANY($1) AND state <> 'REJECTED' ORDER BY created ASC"
        ))
        .bind(event_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }
}
