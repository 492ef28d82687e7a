//! Participation request repository implementation
//!
//! Plain reads run against the pool; the mutating helpers take the
//! caller's transaction connection so the request workflow can combine
//! them with an event row lock into one atomic unit.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::models::request::{Request, RequestStatus};
use crate::utils::errors::Result;

const REQUEST_COLUMNS: &str = "id, created, event_id, requester_id, status";

#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All requests filed by a user
    pub async fn find_all_by_requester(&self, requester_id: i32) -> Result<Vec<Request>> {
        let requests = sqlx::query_as::<_, Request>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE requester_id = $1 ORDER BY created ASC"
        ))
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// All requests for an event, visible to that event's initiator only
    pub async fn find_all_by_event_and_initiator(
        &self,
        event_id: i32,
        initiator_id: i32,
    ) -> Result<Vec<Request>> {
        let requests = sqlx::query_as::<_, Request>(
            r#"
            SELECT r.id, r.created, r.event_id, r.requester_id, r.status
            FROM requests r
            INNER JOIN events e ON e.id = r.event_id
            WHERE r.event_id = $1 AND e.initiator_id = $2
            ORDER BY r.created ASC
            "#,
        )
        .bind(event_id)
        .bind(initiator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Lock and load a request by id inside the caller's transaction
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: i32,
    ) -> Result<Option<Request>> {
        let request = sqlx::query_as::<_, Request>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(request)
    }

    /// Lock and load a request by id restricted to its requester
    pub async fn find_by_id_and_requester_for_update(
        &self,
        conn: &mut PgConnection,
        id: i32,
        requester_id: i32,
    ) -> Result<Option<Request>> {
        let request = sqlx::query_as::<_, Request>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1 AND requester_id = $2 FOR UPDATE"
        ))
        .bind(id)
        .bind(requester_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(request)
    }

    /// Whether a request for (event, requester) already exists
    pub async fn exists_for_event_and_requester(
        &self,
        conn: &mut PgConnection,
        event_id: i32,
        requester_id: i32,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM requests WHERE event_id = $1 AND requester_id = $2",
        )
        .bind(event_id)
        .bind(requester_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count > 0)
    }

    /// Count of confirmed requests for an event, read fresh inside the
    /// caller's transaction. The only legitimate measure of capacity usage.
    pub async fn count_confirmed(&self, conn: &mut PgConnection, event_id: i32) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM requests WHERE event_id = $1 AND status = 'CONFIRMED'",
        )
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Insert a new request
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        event_id: i32,
        requester_id: i32,
        status: RequestStatus,
        created: DateTime<Utc>,
    ) -> Result<Request> {
        let request = sqlx::query_as::<_, Request>(&format!(
            r#"
            INSERT INTO requests (created, event_id, requester_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(created)
        .bind(event_id)
        .bind(requester_id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

        Ok(request)
    }

    /// Update the status of a request
    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        status: RequestStatus,
    ) -> Result<Request> {
        let request = sqlx::query_as::<_, Request>(&format!(
            "UPDATE requests SET status = $2 WHERE id = $1 RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

        Ok(request)
    }

    /// Move every pending request of an event to rejected. Used when a
    /// confirmation saturates the participant limit.
    pub async fn reject_all_pending(&self, conn: &mut PgConnection, event_id: i32) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE requests SET status = 'REJECTED' WHERE event_id = $1 AND status = 'PENDING'",
        )
        .bind(event_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
