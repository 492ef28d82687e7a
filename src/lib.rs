//! Afisha event management backend
//!
//! Library core of an event-management service: the event lifecycle state
//! machine, the capacity-aware participation-request workflow, the
//! filterable event search, and the integration with the external
//! hit-statistics collector. The HTTP boundary layer consuming this crate
//! lives elsewhere.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{AfishaError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
