//! Event model and lifecycle state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::comment::Comment;

/// Lifecycle state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_state", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventState {
    Pending,
    Published,
    Canceled,
}

impl sqlx::postgres::PgHasArrayType for EventState {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_event_state")
    }
}

/// Geographic location of an event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i32,
    pub title: String,
    pub annotation: String,
    pub description: Option<String>,
    pub category_id: i32,
    pub initiator_id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub location: Location,
    pub paid: bool,
    /// 0 means unlimited
    pub participant_limit: i32,
    pub request_moderation: bool,
    pub created_on: DateTime<Utc>,
    pub published_on: Option<DateTime<Utc>>,
    pub event_date: DateTime<Utc>,
    pub state: EventState,
    /// Count of confirmed requests, always selected as a subquery over the
    /// requests table and never stored as a column of its own.
    pub confirmed_requests: i64,
    /// View count reported by the stats collector. Transient, filled in by
    /// the event service after the row is loaded.
    #[sqlx(default)]
    #[serde(default)]
    pub views: i64,
}

impl Event {
    /// Whether the event still has free participant slots.
    pub fn is_available(&self) -> bool {
        self.participant_limit == 0 || i64::from(self.participant_limit) > self.confirmed_requests
    }
}

/// Full event view with moderated comments attached
#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub comments: Vec<Comment>,
}

/// Payload for creating a new event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub annotation: String,
    pub description: Option<String>,
    pub category_id: i32,
    pub event_date: DateTime<Utc>,
    pub location: Location,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub participant_limit: i32,
    #[serde(default = "default_request_moderation")]
    pub request_moderation: bool,
}

fn default_request_moderation() -> bool {
    true
}

/// Partial update of an event. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub annotation: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub event_date: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub paid: Option<bool>,
    pub participant_limit: Option<i32>,
    pub request_moderation: Option<bool>,
}

/// Who is applying an event patch. Initiator edits reopen a canceled
/// event to pending, admin edits never touch the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditActor {
    Initiator,
    Admin,
}

/// Apply the non-empty fields of a patch to an event.
pub fn apply_patch(event: &mut Event, patch: &EventPatch, actor: EditActor) {
    if let Some(title) = &patch.title {
        if !title.trim().is_empty() {
            event.title = title.clone();
        }
    }
    if let Some(annotation) = &patch.annotation {
        if !annotation.trim().is_empty() {
            event.annotation = annotation.clone();
        }
    }
    if let Some(description) = &patch.description {
        if !description.trim().is_empty() {
            event.description = Some(description.clone());
        }
    }
    if let Some(category_id) = patch.category_id {
        event.category_id = category_id;
    }
    if let Some(event_date) = patch.event_date {
        event.event_date = event_date;
    }
    if let Some(location) = patch.location {
        event.location = location;
    }
    if let Some(paid) = patch.paid {
        event.paid = paid;
    }
    if let Some(limit) = patch.participant_limit {
        event.participant_limit = limit;
    }
    if let Some(moderation) = patch.request_moderation {
        event.request_moderation = moderation;
    }
    if actor == EditActor::Initiator && event.state == EventState::Canceled {
        event.state = EventState::Pending;
    }
}
