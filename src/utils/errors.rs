//! Error handling for Afisha
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for the Afisha backend
#[derive(Error, Debug)]
pub enum AfishaError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("User with id={user_id} not found")]
    UserNotFound { user_id: i32 },

    #[error("Event with id={event_id} not found")]
    EventNotFound { event_id: i32 },

    #[error("Category with id={category_id} not found")]
    CategoryNotFound { category_id: i32 },

    #[error("Request with id={request_id} not found")]
    RequestNotFound { request_id: i32 },

    #[error("Restricted: {0}")]
    Restricted(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type alias for Afisha operations
pub type Result<T> = std::result::Result<T, AfishaError>;

impl From<sqlx::Error> for AfishaError {
    fn from(e: sqlx::Error) -> Self {
        // Uniqueness violations are a business outcome (e.g. a duplicate
        // participation request racing past the pre-check), not an
        // infrastructure failure.
        if let sqlx::Error::Database(ref db) = e {
            if db.code().as_deref() == Some("23505") {
                return AfishaError::Conflict(db.message().to_string());
            }
        }
        AfishaError::Database(e)
    }
}

/// Protocol-level outcome of an error, used by the boundary layer to pick
/// a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOutcome {
    NotFound,
    Forbidden,
    BadRequest,
    Conflict,
    Internal,
}

impl AfishaError {
    pub fn outcome(&self) -> ErrorOutcome {
        match self {
            AfishaError::UserNotFound { .. }
            | AfishaError::EventNotFound { .. }
            | AfishaError::CategoryNotFound { .. }
            | AfishaError::RequestNotFound { .. } => ErrorOutcome::NotFound,
            AfishaError::Restricted(_) => ErrorOutcome::Forbidden,
            AfishaError::BadRequest(_) | AfishaError::Validation(_) => ErrorOutcome::BadRequest,
            AfishaError::Conflict(_) => ErrorOutcome::Conflict,
            _ => ErrorOutcome::Internal,
        }
    }

    /// Whether retrying the same call can reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AfishaError::Database(_) | AfishaError::Http(_) | AfishaError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_protocol_outcomes() {
        assert_eq!(
            AfishaError::EventNotFound { event_id: 1 }.outcome(),
            ErrorOutcome::NotFound
        );
        assert_eq!(
            AfishaError::Restricted("no".to_string()).outcome(),
            ErrorOutcome::Forbidden
        );
        assert_eq!(
            AfishaError::BadRequest("bad".to_string()).outcome(),
            ErrorOutcome::BadRequest
        );
        assert_eq!(
            AfishaError::Validation("bad".to_string()).outcome(),
            ErrorOutcome::BadRequest
        );
        assert_eq!(
            AfishaError::Conflict("dup".to_string()).outcome(),
            ErrorOutcome::Conflict
        );
        assert_eq!(
            AfishaError::Config("oops".to_string()).outcome(),
            ErrorOutcome::Internal
        );
    }

    #[test]
    fn row_not_found_stays_an_infrastructure_error() {
        let err: AfishaError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.outcome(), ErrorOutcome::Internal);
    }
}
