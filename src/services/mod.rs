//! Services module
//!
//! This module contains business logic services

pub mod event;
pub mod request;
pub mod stats;

// Re-export commonly used services
pub use event::EventService;
pub use request::RequestService;
pub use stats::{ClientContext, StatsClient, ViewStats};

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Debug, Clone)]
pub struct ServiceFactory {
    pub event_service: EventService,
    pub request_service: RequestService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, database: &DatabaseService) -> Result<Self> {
        let stats_client = StatsClient::new(&settings.stats)?;
        let event_service = EventService::new(database, stats_client);
        let request_service = RequestService::new(database);

        Ok(Self {
            event_service,
            request_service,
        })
    }
}
