//! Event repository implementation
//!
//! Owns row access for events, including the composable search used by
//! both the public and the administrative listings. The confirmed-request
//! count is always selected as a subquery over the requests table, so every
//! loaded event carries a capacity figure consistent with the statement
//! that read it.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::event::{Event, NewEvent};
use crate::models::search::{EventFilter, EventOrder, Page};
use crate::utils::errors::Result;

const EVENT_COLUMNS: &str = "e.id, e.title, e.annotation, e.description, e.category_id, \
     e.initiator_id, e.lat, e.lon, e.paid, e.participant_limit, e.request_moderation, \
     e.created_on, e.published_on, e.event_date, e.state, \
     (SELECT COUNT(*) FROM requests r WHERE r.event_id = e.id AND r.status = 'CONFIRMED') AS confirmed_requests";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new event in pending state
    pub async fn create(
        &self,
        new: &NewEvent,
        initiator_id: i32,
        created_on: DateTime<Utc>,
    ) -> Result<Event> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO events (title, annotation, description, category_id, initiator_id,
                                lat, lon, paid, participant_limit, request_moderation,
                                created_on, event_date, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'PENDING')
            RETURNING id
            "#,
        )
        .bind(&new.title)
        .bind(&new.annotation)
        .bind(&new.description)
        .bind(new.category_id)
        .bind(initiator_id)
        .bind(new.location.lat)
        .bind(new.location.lon)
        .bind(new.paid)
        .bind(new.participant_limit)
        .bind(new.request_moderation)
        .bind(created_on)
        .bind(new.event_date)
        .fetch_one(&self.pool)
        .await?;

        let event = self
            .find_by_id(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID restricted to its initiator
    pub async fn find_by_id_and_initiator(
        &self,
        event_id: i32,
        initiator_id: i32,
    ) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1 AND e.initiator_id = $2"
        ))
        .bind(event_id)
        .bind(initiator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Load an event inside the caller's transaction, locking its row.
    /// Serializes capacity decisions for the same event.
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: i32,
    ) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1 FOR UPDATE OF e"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(event)
    }

    /// List the events created by a user, paged, ordered by event date
    pub async fn find_all_by_initiator(&self, initiator_id: i32, page: &Page) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.initiator_id = $1 \
             ORDER BY e.event_date ASC LIMIT $2 OFFSET $3"
        ))
        .bind(initiator_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Search events with a composable predicate set. Every filter
    /// dimension left as `None` is unconstrained.
    pub async fn search(
        &self,
        filter: &EventFilter,
        order: EventOrder,
        page: &Page,
    ) -> Result<Vec<Event>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE TRUE"
        ));

        if let Some(text) = &filter.text {
            let pattern = format!("%{}%", text.to_lowercase());
            query.push(" AND (LOWER(e.annotation) LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR LOWER(e.description) LIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        if let Some(categories) = filter.categories.as_deref().filter(|c| !c.is_empty()) {
            query.push(" AND e.category_id = ANY(");
            query.push_bind(categories.to_vec());
            query.push(")");
        }
        if let Some(paid) = filter.paid {
            query.push(" AND e.paid = ");
            query.push_bind(paid);
        }
        if let Some(users) = filter.users.as_deref().filter(|u| !u.is_empty()) {
            query.push(" AND e.initiator_id = ANY(");
            query.push_bind(users.to_vec());
            query.push(")");
        }
        if let Some(states) = filter.states.as_deref().filter(|s| !s.is_empty()) {
            query.push(" AND e.state = ANY(");
            query.push_bind(states.to_vec());
            query.push(")");
        }
        if let Some(start) = filter.range_start {
            query.push(" AND e.event_date >= ");
            query.push_bind(start);
        }
        if let Some(end) = filter.range_end {
            query.push(" AND e.event_date <= ");
            query.push_bind(end);
        }

        match order {
            EventOrder::ById => query.push(" ORDER BY e.id ASC"),
            EventOrder::ByEventDate => query.push(" ORDER BY e.event_date ASC"),
        };
        query.push(" LIMIT ");
        query.push_bind(page.limit());
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let events = query
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Persist the mutable fields of an event
    pub async fn update(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE events
            SET title = $2,
                annotation = $3,
                description = $4,
                category_id = $5,
                lat = $6,
                lon = $7,
                paid = $8,
                participant_limit = $9,
                request_moderation = $10,
                event_date = $11,
                published_on = $12,
                state = $13
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.annotation)
        .bind(&event.description)
        .bind(event.category_id)
        .bind(event.location.lat)
        .bind(event.location.lon)
        .bind(event.paid)
        .bind(event.participant_limit)
        .bind(event.request_moderation)
        .bind(event.event_date)
        .bind(event.published_on)
        .bind(event.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
