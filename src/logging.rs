//! Structured logging for the crate.
//!
//! Events go through the `log_*` macros below so that field names (`service`,
//! `operation`, `card_id`, `session_id`, ...) stay the same everywhere. The
//! subscriber itself is installed once by the host through [`init_logging`].

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

// Service layer

/// Log service operation start with context
#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr, card_count = $count:expr) => {
        tracing::debug!(
            service = $service,
            operation = $operation,
            card_count = $count,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr, card_id = $card_id:expr) => {
        tracing::debug!(
            service = $service,
            operation = $operation,
            card_id = %$card_id,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr, subject = $subject:expr) => {
        tracing::debug!(
            service = $service,
            operation = $operation,
            subject = %$subject,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr) => {
        tracing::debug!(
            service = $service,
            operation = $operation,
            "Service operation started"
        );
    };
}

/// Log service operation success
#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, card_id = $card_id:expr, $msg:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            card_id = %$card_id,
            "Service operation completed: {}", $msg
        );
    };
    ($service:expr, $operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            count = $count,
            "Service operation completed: {}", $msg
        );
    };
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation completed: {}", $msg
        );
    };
}

/// Log service warnings
#[macro_export]
macro_rules! log_service_warn {
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::warn!(
            service = $service,
            operation = $operation,
            "Service warning: {}",
            $msg
        );
    };
}

// Snapshot storage

/// Log snapshot store operation performance and results
#[macro_export]
macro_rules! log_db_operation {
    (debug, $operation:expr, bytes = $bytes:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            bytes = $bytes,
            duration_ms = $duration,
            "Database operation completed"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(
            component = "database",
            operation = $operation,
            "Database operation: {}", $msg
        );
    };
    (warn, $operation:expr, $msg:expr) => {
        tracing::warn!(
            component = "database",
            operation = $operation,
            "Database operation warning: {}", $msg
        );
    };
    (error, $operation:expr, error = $error:expr) => {
        tracing::error!(
            component = "database",
            operation = $operation,
            error = %$error,
            "Database operation failed"
        );
    };
}

// Review sessions

/// Log review session transitions
#[macro_export]
macro_rules! log_session_event {
    (started, session_id = $session_id:expr, queue_len = $len:expr) => {
        tracing::info!(
            component = "review_session",
            session_id = %$session_id,
            queue_len = $len,
            "Review session started"
        );
    };
    (graded, session_id = $session_id:expr, card_id = $card_id:expr, grade = $grade:expr, interval_days = $interval:expr) => {
        tracing::debug!(
            component = "review_session",
            session_id = %$session_id,
            card_id = %$card_id,
            grade = %$grade,
            interval_days = $interval,
            "Card graded"
        );
    };
    (skipped, session_id = $session_id:expr, card_id = $card_id:expr) => {
        tracing::debug!(
            component = "review_session",
            session_id = %$session_id,
            card_id = %$card_id,
            "Card skipped"
        );
    };
    (finished, session_id = $session_id:expr, processed = $processed:expr, $msg:expr) => {
        tracing::info!(
            component = "review_session",
            session_id = %$session_id,
            processed = $processed,
            "Review session {}", $msg
        );
    };
}

// System events

/// Log system startup and configuration events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// Timing

/// Log performance metrics with consistent structure
#[macro_export]
macro_rules! log_performance {
    ($operation:expr, duration_ms = $duration:expr, count = $count:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            count = $count,
            "Performance metrics"
        );
    };
}

// Validation

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

/// Install the global subscriber: console and/or a daily rolling file.
///
/// The returned guard must be kept alive for file output to be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .boxed()
    });

    let (file_layer, guard) = if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "memo-deck.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // No ANSI colors for files
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        console_enabled = config.console_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
