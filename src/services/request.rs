//! Participation request workflow
//!
//! Creation, cancellation and moderation of participation requests. Every
//! mutating operation runs as one transaction that first locks the event
//! row, then reads the confirmed count fresh, so concurrent confirmations
//! cannot both seat the last free slot. When a confirmation saturates the
//! participant limit, every remaining pending request of the event is
//! rejected in the same transaction.

use chrono::Utc;
use tracing::{info, warn};

use crate::database::repositories::{EventRepository, RequestRepository, UserRepository};
use crate::database::{DatabasePool, DatabaseService};
use crate::models::event::{Event, EventState};
use crate::models::request::{Request, RequestStatus};
use crate::utils::errors::{AfishaError, Result};

/// Request service for the participation workflow
#[derive(Debug, Clone)]
pub struct RequestService {
    pool: DatabasePool,
    requests: RequestRepository,
    events: EventRepository,
    users: UserRepository,
}

impl RequestService {
    /// Create a new RequestService instance
    pub fn new(database: &DatabaseService) -> Self {
        Self {
            pool: database.pool().clone(),
            requests: database.requests.clone(),
            events: database.events.clone(),
            users: database.users.clone(),
        }
    }

    /// All requests filed by a user
    pub async fn get_user_requests(&self, user_id: i32) -> Result<Vec<Request>> {
        let result = self.requests.find_all_by_requester(user_id).await?;
        info!(found = result.len(), user_id = user_id, "Found user requests");

        Ok(result)
    }

    /// Requests for an event, listed for its initiator
    pub async fn get_requests_for_user_event(
        &self,
        user_id: i32,
        event_id: i32,
    ) -> Result<Vec<Request>> {
        let result = self
            .requests
            .find_all_by_event_and_initiator(event_id, user_id)
            .await?;
        info!(found = result.len(), event_id = event_id, "Found event requests");

        Ok(result)
    }

    /// File a participation request. Auto-confirms when the event does
    /// not moderate requests.
    pub async fn create(&self, user_id: i32, event_id: i32) -> Result<Request> {
        self.find_user(user_id).await?;

        let mut tx = self.pool.begin().await?;
        let event = self
            .events
            .find_by_id_for_update(&mut tx, event_id)
            .await?
            .ok_or(AfishaError::EventNotFound { event_id })?;
        let duplicate = self
            .requests
            .exists_for_event_and_requester(&mut tx, event_id, user_id)
            .await?;
        let confirmed = self.requests.count_confirmed(&mut tx, event_id).await?;

        let status = admission_status(&event, user_id, duplicate, confirmed)?;
        let request = self
            .requests
            .insert(&mut tx, event_id, user_id, status, Utc::now())
            .await?;
        tx.commit().await?;

        info!(
            request_id = request.id,
            event_id = event_id,
            user_id = user_id,
            status = ?request.status,
            "Request created"
        );
        Ok(request)
    }

    /// Withdraw a request. Canceling an already-canceled request fails.
    pub async fn cancel_by_requester(&self, user_id: i32, request_id: i32) -> Result<Request> {
        let mut tx = self.pool.begin().await?;
        let request = self
            .requests
            .find_by_id_and_requester_for_update(&mut tx, request_id, user_id)
            .await?
            .ok_or(AfishaError::RequestNotFound { request_id })?;

        if request.status == RequestStatus::Canceled {
            return Err(AfishaError::Restricted(
                "Request is already canceled".to_string(),
            ));
        }

        let request = self
            .requests
            .set_status(&mut tx, request.id, RequestStatus::Canceled)
            .await?;
        tx.commit().await?;

        info!(request_id = request.id, user_id = user_id, "Request canceled");
        Ok(request)
    }

    /// Confirm a pending request for a moderated, capacity-bounded event.
    /// Saturating the participant limit auto-rejects every other pending
    /// request of the event.
    pub async fn confirm(&self, user_id: i32, event_id: i32, request_id: i32) -> Result<Request> {
        self.find_user(user_id).await?;

        let mut tx = self.pool.begin().await?;
        let event = self
            .events
            .find_by_id_for_update(&mut tx, event_id)
            .await?
            .ok_or(AfishaError::EventNotFound { event_id })?;
        ensure_moderation_access(&event, user_id)?;

        let confirmed = self.requests.count_confirmed(&mut tx, event_id).await?;
        if capacity_reached(event.participant_limit, confirmed) {
            return Err(AfishaError::Restricted(
                "No free space on this event".to_string(),
            ));
        }

        let request = self
            .requests
            .find_by_id_for_update(&mut tx, request_id)
            .await?
            .ok_or(AfishaError::RequestNotFound { request_id })?;
        ensure_confirmable(&request, event.id)?;

        let request = self
            .requests
            .set_status(&mut tx, request.id, RequestStatus::Confirmed)
            .await?;

        if capacity_reached(event.participant_limit, confirmed + 1) {
            let rejected = self.requests.reject_all_pending(&mut tx, event_id).await?;
            if rejected > 0 {
                warn!(
                    event_id = event_id,
                    rejected = rejected,
                    "Participant limit reached, auto-rejected pending requests"
                );
            }
        }
        tx.commit().await?;

        info!(request_id = request.id, event_id = event_id, "Request confirmed");
        Ok(request)
    }

    /// Reject a pending or confirmed request
    pub async fn reject(&self, user_id: i32, event_id: i32, request_id: i32) -> Result<Request> {
        self.find_user(user_id).await?;

        let mut tx = self.pool.begin().await?;
        let event = self
            .events
            .find_by_id_for_update(&mut tx, event_id)
            .await?
            .ok_or(AfishaError::EventNotFound { event_id })?;
        ensure_moderation_access(&event, user_id)?;

        let request = self
            .requests
            .find_by_id_for_update(&mut tx, request_id)
            .await?
            .ok_or(AfishaError::RequestNotFound { request_id })?;
        ensure_rejectable(&request, event.id)?;

        let request = self
            .requests
            .set_status(&mut tx, request.id, RequestStatus::Rejected)
            .await?;
        tx.commit().await?;

        info!(request_id = request.id, event_id = event_id, "Request rejected");
        Ok(request)
    }

    async fn find_user(&self, user_id: i32) -> Result<()> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AfishaError::UserNotFound { user_id })?;
        Ok(())
    }
}

fn capacity_reached(participant_limit: i32, confirmed: i64) -> bool {
    participant_limit != 0 && confirmed >= i64::from(participant_limit)
}

/// Admission decision for a new request: reject the attempt outright, or
/// pick the initial status from the event's moderation flag.
fn admission_status(
    event: &Event,
    requester_id: i32,
    duplicate: bool,
    confirmed: i64,
) -> Result<RequestStatus> {
    if duplicate {
        return Err(AfishaError::Restricted(
            "A request for this event already exists".to_string(),
        ));
    }
    if event.initiator_id == requester_id {
        return Err(AfishaError::Restricted(
            "Requests cannot be sent to your own event".to_string(),
        ));
    }
    if event.state != EventState::Published {
        return Err(AfishaError::Restricted(
            "Event is not published".to_string(),
        ));
    }
    if capacity_reached(event.participant_limit, confirmed) {
        return Err(AfishaError::Restricted(
            "No free space on this event".to_string(),
        ));
    }

    Ok(if event.request_moderation {
        RequestStatus::Pending
    } else {
        RequestStatus::Confirmed
    })
}

/// Moderation access check: only the initiator of a moderated,
/// capacity-bounded event has requests to confirm or reject.
fn ensure_moderation_access(event: &Event, user_id: i32) -> Result<()> {
    if event.initiator_id != user_id {
        return Err(AfishaError::Restricted(
            "Only the event initiator can moderate its requests".to_string(),
        ));
    }
    if !event.request_moderation || event.participant_limit == 0 {
        return Err(AfishaError::BadRequest(
            "Requests of this event are not moderated".to_string(),
        ));
    }
    Ok(())
}

fn ensure_confirmable(request: &Request, event_id: i32) -> Result<()> {
    if request.event_id != event_id {
        return Err(AfishaError::BadRequest(
            "Request does not belong to this event".to_string(),
        ));
    }
    if request.status != RequestStatus::Pending {
        return Err(AfishaError::BadRequest(
            "Only pending requests can be confirmed".to_string(),
        ));
    }
    Ok(())
}

fn ensure_rejectable(request: &Request, event_id: i32) -> Result<()> {
    if request.event_id != event_id {
        return Err(AfishaError::BadRequest(
            "Request does not belong to this event".to_string(),
        ));
    }
    match request.status {
        RequestStatus::Canceled => Err(AfishaError::BadRequest(
            "Request is already canceled".to_string(),
        )),
        RequestStatus::Rejected => Err(AfishaError::BadRequest(
            "Request is already rejected".to_string(),
        )),
        RequestStatus::Pending | RequestStatus::Confirmed => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::Location;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    fn published_event(participant_limit: i32, request_moderation: bool) -> Event {
        Event {
            id: 1,
            title: "Collegiate shag workshop".to_string(),
            annotation: "Fast footwork".to_string(),
            description: None,
            category_id: 2,
            initiator_id: 10,
            location: Location { lat: 55.75, lon: 37.62 },
            paid: true,
            participant_limit,
            request_moderation,
            created_on: Utc::now(),
            published_on: Some(Utc::now()),
            event_date: Utc::now() + Duration::days(1),
            state: EventState::Published,
            confirmed_requests: 0,
            views: 0,
        }
    }

    fn request_with_status(status: RequestStatus) -> Request {
        Request {
            id: 50,
            created: Utc::now(),
            event_id: 1,
            requester_id: 20,
            status,
        }
    }

    #[test]
    fn capacity_boundary_treats_zero_as_unlimited() {
        assert!(!capacity_reached(0, 1_000_000));
        assert!(!capacity_reached(2, 1));
        assert!(capacity_reached(2, 2));
        assert!(capacity_reached(2, 3));
    }

    #[test]
    fn admission_rejects_duplicates() {
        let event = published_event(0, true);
        assert_matches!(
            admission_status(&event, 20, true, 0),
            Err(AfishaError::Restricted(_))
        );
    }

    #[test]
    fn admission_rejects_the_initiator() {
        let event = published_event(0, true);
        assert_matches!(
            admission_status(&event, 10, false, 0),
            Err(AfishaError::Restricted(_))
        );
    }

    #[test]
    fn admission_requires_a_published_event() {
        let mut event = published_event(0, true);
        event.state = EventState::Pending;
        assert_matches!(
            admission_status(&event, 20, false, 0),
            Err(AfishaError::Restricted(_))
        );

        event.state = EventState::Canceled;
        assert_matches!(
            admission_status(&event, 20, false, 0),
            Err(AfishaError::Restricted(_))
        );
    }

    #[test]
    fn admission_fails_when_no_space_is_left() {
        let event = published_event(1, false);
        assert_matches!(
            admission_status(&event, 20, false, 1),
            Err(AfishaError::Restricted(_))
        );
    }

    #[test]
    fn admission_status_follows_the_moderation_flag() {
        let moderated = published_event(5, true);
        assert_matches!(
            admission_status(&moderated, 20, false, 0),
            Ok(RequestStatus::Pending)
        );

        let open = published_event(5, false);
        assert_matches!(
            admission_status(&open, 20, false, 0),
            Ok(RequestStatus::Confirmed)
        );
    }

    #[test]
    fn moderation_access_is_initiator_only() {
        let event = published_event(5, true);
        assert_matches!(
            ensure_moderation_access(&event, 11),
            Err(AfishaError::Restricted(_))
        );
        assert!(ensure_moderation_access(&event, 10).is_ok());
    }

    #[test]
    fn unmoderated_or_uncapped_events_have_nothing_to_confirm() {
        let open = published_event(5, false);
        assert_matches!(
            ensure_moderation_access(&open, 10),
            Err(AfishaError::BadRequest(_))
        );

        let uncapped = published_event(0, true);
        assert_matches!(
            ensure_moderation_access(&uncapped, 10),
            Err(AfishaError::BadRequest(_))
        );
    }

    #[test]
    fn only_pending_requests_are_confirmable() {
        assert!(ensure_confirmable(&request_with_status(RequestStatus::Pending), 1).is_ok());

        for status in [
            RequestStatus::Confirmed,
            RequestStatus::Rejected,
            RequestStatus::Canceled,
        ] {
            assert_matches!(
                ensure_confirmable(&request_with_status(status), 1),
                Err(AfishaError::BadRequest(_))
            );
        }
    }

    #[test]
    fn confirm_checks_event_membership() {
        let request = request_with_status(RequestStatus::Pending);
        assert_matches!(
            ensure_confirmable(&request, 2),
            Err(AfishaError::BadRequest(_))
        );
    }

    #[test]
    fn pending_and_confirmed_requests_are_rejectable() {
        assert!(ensure_rejectable(&request_with_status(RequestStatus::Pending), 1).is_ok());
        assert!(ensure_rejectable(&request_with_status(RequestStatus::Confirmed), 1).is_ok());

        for status in [RequestStatus::Rejected, RequestStatus::Canceled] {
            assert_matches!(
                ensure_rejectable(&request_with_status(status), 1),
                Err(AfishaError::BadRequest(_))
            );
        }
    }
}
