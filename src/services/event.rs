//! Event service implementation
//!
//! Owns the event lifecycle: creation, partial updates by initiator and
//! admin, the publish/cancel transitions, and the public/administrative
//! searches. Loaded events are enriched with view counts from the stats
//! collector and, for full views, with the moderated comments of the
//! event.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::database::repositories::{
    CategoryRepository, CommentRepository, EventRepository, UserRepository,
};
use crate::database::DatabaseService;
use crate::models::comment::Comment;
use crate::models::event::{
    apply_patch, EditActor, Event, EventDetails, EventPatch, EventState, NewEvent,
};
use crate::models::search::{
    AdminSearch, EventFilter, EventOrder, EventSort, Page, PublicSearch,
};
use crate::services::stats::{ClientContext, StatsClient};
use crate::utils::errors::{AfishaError, Result};

/// Event service for lifecycle and search operations
#[derive(Debug, Clone)]
pub struct EventService {
    events: EventRepository,
    users: UserRepository,
    categories: CategoryRepository,
    comments: CommentRepository,
    stats: StatsClient,
}

impl EventService {
    /// Create a new EventService instance
    pub fn new(database: &DatabaseService, stats: StatsClient) -> Self {
        Self {
            events: database.events.clone(),
            users: database.users.clone(),
            categories: database.categories.clone(),
            comments: database.comments.clone(),
            stats,
        }
    }

    /// Public event search. Records a hit for the listing view.
    pub async fn get_all(&self, search: &PublicSearch, ctx: &ClientContext) -> Result<Vec<Event>> {
        let page = Page::new(search.from, search.size)?;
        let filter = public_filter(search, Utc::now());
        let mut events = self
            .events
            .search(&filter, search_order(search.sort), &page)
            .await?;
        info!(found = events.len(), "Public event search completed");

        self.enrich_with_views(&mut events).await;
        self.stats.record_hit(ctx).await;

        if search.sort == Some(EventSort::Views) {
            sort_by_views_desc(&mut events);
        }
        if search.only_available {
            events.retain(Event::is_available);
        }

        Ok(events)
    }

    /// Public single-event view. Records a hit.
    pub async fn get_by_id(&self, event_id: i32, ctx: &ClientContext) -> Result<EventDetails> {
        let mut event = self.find_event(event_id).await?;
        debug!(
            event_id = event.id,
            confirmed_requests = event.confirmed_requests,
            "Event found"
        );

        self.enrich_with_views(std::slice::from_mut(&mut event))
            .await;
        let details = self.with_comments(event).await?;
        self.stats.record_hit(ctx).await;

        Ok(details)
    }

    /// Administrative event search, full views with comments
    pub async fn get_by_admin(&self, search: &AdminSearch) -> Result<Vec<EventDetails>> {
        let page = Page::new(search.from, search.size)?;
        let filter = admin_filter(search);
        let mut events = self.events.search(&filter, EventOrder::ById, &page).await?;
        info!(found = events.len(), "Admin event search completed");

        self.enrich_with_views(&mut events).await;
        self.with_comments_batch(events).await
    }

    /// Events created by a user, paged
    pub async fn get_by_user(&self, user_id: i32, from: i32, size: i32) -> Result<Vec<Event>> {
        self.find_user(user_id).await?;

        let page = Page::new(from, size)?;
        let mut events = self.events.find_all_by_initiator(user_id, &page).await?;
        info!(found = events.len(), user_id = user_id, "Found user events");

        self.enrich_with_views(&mut events).await;
        Ok(events)
    }

    /// A single event of a user, resolved by (event, initiator)
    pub async fn get_user_event_by_id(&self, user_id: i32, event_id: i32) -> Result<Event> {
        let mut event = self.find_user_event(event_id, user_id).await?;

        self.enrich_with_views(std::slice::from_mut(&mut event))
            .await;
        Ok(event)
    }

    /// Create a new event in pending state
    pub async fn create_by_user(&self, user_id: i32, new: &NewEvent) -> Result<EventDetails> {
        let now = Utc::now();
        ensure_event_date_far_enough(new.event_date, now)?;
        self.find_category(new.category_id).await?;
        self.find_user(user_id).await?;

        let event = self.events.create(new, user_id, now).await?;
        info!(event_id = event.id, user_id = user_id, "Saved new event");

        Ok(EventDetails {
            event,
            comments: Vec::new(),
        })
    }

    /// Partial update by the event's initiator
    pub async fn update_by_user(
        &self,
        user_id: i32,
        event_id: i32,
        patch: &EventPatch,
    ) -> Result<EventDetails> {
        let mut event = self.find_event(event_id).await?;
        let now = Utc::now();
        ensure_initiator_can_edit(&event, user_id, now)?;
        if let Some(event_date) = patch.event_date {
            ensure_event_date_far_enough(event_date, now)?;
        }

        // The caller must still exist, and so must a replacement category
        self.find_user(user_id).await?;
        if let Some(category_id) = patch.category_id {
            self.find_category(category_id).await?;
        }

        info!(event_id = event.id, "Updating event");
        apply_patch(&mut event, patch, EditActor::Initiator);
        self.events.update(&event).await?;

        self.enrich_with_views(std::slice::from_mut(&mut event))
            .await;
        self.with_comments(event).await
    }

    /// Partial update by an administrator. No ownership or time-window
    /// checks, and a canceled event stays canceled.
    pub async fn update_by_admin(&self, event_id: i32, patch: &EventPatch) -> Result<EventDetails> {
        let mut event = self.find_event(event_id).await?;

        if let Some(category_id) = patch.category_id {
            self.find_category(category_id).await?;
        }

        warn!(event_id = event.id, "Updating event by admin");
        apply_patch(&mut event, patch, EditActor::Admin);
        self.events.update(&event).await?;

        self.enrich_with_views(std::slice::from_mut(&mut event))
            .await;
        self.with_comments(event).await
    }

    /// Administrative publish transition
    pub async fn publish(&self, event_id: i32) -> Result<EventDetails> {
        let mut event = self.find_event(event_id).await?;
        let now = Utc::now();
        ensure_publishable(&event, now)?;

        event.state = EventState::Published;
        event.published_on = Some(now);
        self.events.update(&event).await?;
        info!(event_id = event.id, "Event published");

        self.enrich_with_views(std::slice::from_mut(&mut event))
            .await;
        self.with_comments(event).await
    }

    /// Administrative reject transition
    pub async fn reject_by_admin(&self, event_id: i32) -> Result<EventDetails> {
        let mut event = self.find_event(event_id).await?;
        ensure_pending(&event)?;

        event.state = EventState::Canceled;
        self.events.update(&event).await?;
        info!(event_id = event.id, "Event rejected by admin");

        self.enrich_with_views(std::slice::from_mut(&mut event))
            .await;
        self.with_comments(event).await
    }

    /// Cancellation by the event's initiator
    pub async fn cancel_by_user(&self, user_id: i32, event_id: i32) -> Result<EventDetails> {
        let mut event = self.find_user_event(event_id, user_id).await?;
        ensure_pending(&event)?;

        event.state = EventState::Canceled;
        self.events.update(&event).await?;
        info!(event_id = event.id, user_id = user_id, "Event canceled");

        self.enrich_with_views(std::slice::from_mut(&mut event))
            .await;
        self.with_comments(event).await
    }

    /// Merge collector view counts onto a page of events. Events without
    /// recorded hits keep 0.
    async fn enrich_with_views(&self, events: &mut [Event]) {
        let ids: Vec<i32> = events.iter().map(|e| e.id).collect();
        let views = self.stats.views_for(&ids).await;
        for event in events.iter_mut() {
            event.views = views.get(&event.id).copied().unwrap_or(0);
        }
    }

    async fn with_comments(&self, event: Event) -> Result<EventDetails> {
        let comments = self.comments.find_non_rejected_for_event(event.id).await?;
        Ok(EventDetails { event, comments })
    }

    async fn with_comments_batch(&self, events: Vec<Event>) -> Result<Vec<EventDetails>> {
        let ids: Vec<i32> = events.iter().map(|e| e.id).collect();
        let all = self.comments.find_non_rejected_for_events(&ids).await?;

        let mut by_event: HashMap<i32, Vec<Comment>> = HashMap::new();
        for comment in all {
            by_event.entry(comment.event_id).or_default().push(comment);
        }

        Ok(events
            .into_iter()
            .map(|event| EventDetails {
                comments: by_event.remove(&event.id).unwrap_or_default(),
                event,
            })
            .collect())
    }

    async fn find_event(&self, event_id: i32) -> Result<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(AfishaError::EventNotFound { event_id })
    }

    async fn find_user_event(&self, event_id: i32, user_id: i32) -> Result<Event> {
        self.events
            .find_by_id_and_initiator(event_id, user_id)
            .await?
            .ok_or(AfishaError::EventNotFound { event_id })
    }

    async fn find_user(&self, user_id: i32) -> Result<()> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AfishaError::UserNotFound { user_id })?;
        Ok(())
    }

    async fn find_category(&self, category_id: i32) -> Result<()> {
        self.categories
            .find_by_id(category_id)
            .await?
            .ok_or(AfishaError::CategoryNotFound { category_id })?;
        Ok(())
    }
}

/// Predicate set of the public search. An unspecified range start
/// defaults to now, so past events never leak into public listings.
fn public_filter(search: &PublicSearch, now: DateTime<Utc>) -> EventFilter {
    EventFilter {
        text: search.text.clone(),
        categories: search.categories.clone(),
        paid: search.paid,
        range_start: Some(search.range_start.unwrap_or(now)),
        range_end: search.range_end,
        ..Default::default()
    }
}

/// Predicate set of the administrative search. Nothing is defaulted.
fn admin_filter(search: &AdminSearch) -> EventFilter {
    EventFilter {
        users: search.users.clone(),
        states: search.states.clone(),
        categories: search.categories.clone(),
        range_start: search.range_start,
        range_end: search.range_end,
        ..Default::default()
    }
}

/// Views sorting is applied in memory after stats enrichment, so its
/// SQL-side order falls back to the stable id order.
fn search_order(sort: Option<EventSort>) -> EventOrder {
    match sort {
        Some(EventSort::EventDate) => EventOrder::ByEventDate,
        _ => EventOrder::ById,
    }
}

fn sort_by_views_desc(events: &mut [Event]) {
    events.sort_by(|a, b| b.views.cmp(&a.views));
}

fn ensure_event_date_far_enough(event_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if event_date < now + Duration::hours(2) {
        return Err(AfishaError::Validation(
            "Event cannot start earlier than two hours from now".to_string(),
        ));
    }
    Ok(())
}

fn ensure_initiator_can_edit(event: &Event, user_id: i32, now: DateTime<Utc>) -> Result<()> {
    if event.initiator_id != user_id {
        return Err(AfishaError::Restricted(
            "Events of another user cannot be edited".to_string(),
        ));
    }
    if event.state == EventState::Published {
        return Err(AfishaError::Restricted(
            "Published events cannot be edited".to_string(),
        ));
    }
    if event.event_date < now + Duration::hours(2) {
        return Err(AfishaError::Restricted(
            "Events starting in less than two hours cannot be edited".to_string(),
        ));
    }
    Ok(())
}

fn ensure_pending(event: &Event) -> Result<()> {
    if event.state != EventState::Pending {
        return Err(AfishaError::Restricted(
            "Event is already published or canceled".to_string(),
        ));
    }
    Ok(())
}

fn ensure_publishable(event: &Event, now: DateTime<Utc>) -> Result<()> {
    ensure_pending(event)?;
    if event.event_date < now + Duration::hours(1) {
        return Err(AfishaError::Restricted(
            "Event starts in less than one hour, move the event date before publishing"
                .to_string(),
        ));
    }
    Ok(())
}
