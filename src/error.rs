use thiserror::Error;

use crate::config::ConfigurationError;

/// Errors raised inside the evaluation engine.
///
/// Most of these never reach a caller of [`crate::evaluation::OverallEvaluator`]: metric
/// failures degrade to failure-default scores, layer failures become issues, and anything
/// else is folded into an unsuccessful `EvaluationResult`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HealthError {
    #[error("Metric unavailable for '{factor_id}': {reason}")]
    MetricUnavailable { factor_id: String, reason: String },

    #[error("Metric fetch for '{factor_id}' timed out after {timeout_ms}ms")]
    MetricTimeout { factor_id: String, timeout_ms: u64 },

    #[error("Layer degraded: {0}")]
    LayerDegraded(String),

    #[error("Dependency unreachable: {0}")]
    DependencyUnreachable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Alert error: {0}")]
    AlertError(String),

    #[error("History error: {0}")]
    HistoryError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),
}

impl HealthError {
    pub fn metric_unavailable(factor_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MetricUnavailable {
            factor_id: factor_id.into(),
            reason: reason.into(),
        }
    }

    /// True for the errors a factor evaluator recovers from locally.
    pub fn is_metric_failure(&self) -> bool {
        matches!(
            self,
            HealthError::MetricUnavailable { .. } | HealthError::MetricTimeout { .. }
        )
    }
}

impl From<ConfigurationError> for HealthError {
    fn from(err: ConfigurationError) -> Self {
        HealthError::ConfigurationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HealthError>;
