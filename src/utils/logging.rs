//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging
//! utilities for the Afisha backend.

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration.
///
/// Returns the worker guard of the file appender when file logging is
/// configured; the caller must keep it alive for the lifetime of the
/// process or buffered log lines are lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    let guard = if let Some(dir) = &config.file_path {
        let file_appender = tracing_appender::rolling::daily(dir, "afisha.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    };

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log event lifecycle actions with structured data
pub fn log_event_action(event_id: i32, action: &str, user_id: Option<i32>) {
    info!(
        event_id = event_id,
        action = action,
        user_id = user_id,
        "Event action performed"
    );
}

/// Log participation request transitions
pub fn log_request_transition(request_id: i32, event_id: i32, status: &str) {
    info!(
        request_id = request_id,
        event_id = event_id,
        status = status,
        "Request status changed"
    );
}
