//! # Structured Logging
//!
//! Environment-aware `tracing` setup plus domain macros that stamp evaluation and layer
//! events with an operation name and timestamp.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process
///
/// `RUST_LOG` wins over the environment default. Set `TIERHEALTH_LOG_FORMAT=json` for
/// machine-readable output.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json = std::env::var("TIERHEALTH_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let console = if json {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // An embedding application may already own the global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Current environment name from `TIERHEALTH_ENV` or `APP_ENV`
pub fn get_environment() -> String {
    std::env::var("TIERHEALTH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log the outcome of an orchestrated evaluation
pub fn log_evaluation_summary(
    component: &str,
    overall_score: f64,
    status: &str,
    anomaly_count: usize,
    duration_ms: u64,
) {
    tracing::info!(
        component = %component,
        overall_score = overall_score,
        status = %status,
        anomaly_count = anomaly_count,
        duration_ms = duration_ms,
        timestamp = %Utc::now().to_rfc3339(),
        "🩺 EVALUATION_COMPLETE"
    );
}

/// Log an evaluation-level event
///
/// ```rust,ignore
/// log_evaluation!(info, "evaluation_started", component: "overall");
/// log_evaluation!(warn, "deadline_exceeded", evaluation_id: id, layer: "storage");
/// ```
#[macro_export]
macro_rules! log_evaluation {
    ($level:ident, $operation:expr, evaluation_id: $id:expr, $($key:ident: $value:expr),* $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            evaluation_id = %$id,
            $($key = ?$value,)*
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "EVALUATION_{}", $operation
        );
    };
    ($level:ident, $operation:expr $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "EVALUATION_{}", $operation
        );
    };
    ($level:ident, $operation:expr, $($key:ident: $value:expr),+ $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            $($key = ?$value,)*
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "EVALUATION_{}", $operation
        );
    };
}

/// Log a layer-level event
#[macro_export]
macro_rules! log_layer {
    ($level:ident, $operation:expr, layer: $layer:expr, $($key:ident: $value:expr),* $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            layer = %$layer,
            $($key = ?$value,)*
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "LAYER_{} ({})", $operation, $layer
        );
    };
    ($level:ident, $operation:expr $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "LAYER_{}", $operation
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_environment() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_evaluation!(debug, "test_event", component: "overall");
        log_layer!(debug, "test_event", layer: "storage", score: 100.0);
    }
}
