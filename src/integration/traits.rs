//! # Collaborator Traits
//!
//! Contracts for the systems the evaluation engine talks to but does not own: metric
//! acquisition, time-series history and alert delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{AlertLevel, Layer};
use crate::error::Result;
use crate::history::IntervalSpec;
use crate::models::{HistoryPoint, RawReading};

/// Per-call context handed to metric sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub evaluation_id: Uuid,
    /// History key of the component being evaluated
    pub component: String,
    pub requested_at: DateTime<Utc>,
    /// Tier currently being evaluated, if any
    pub layer: Option<Layer>,
}

impl EvaluationContext {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            evaluation_id: Uuid::new_v4(),
            component: component.into(),
            requested_at: Utc::now(),
            layer: None,
        }
    }

    pub fn for_layer(&self, layer: Layer) -> Self {
        Self {
            layer: Some(layer),
            ..self.clone()
        }
    }
}

/// Source of raw metric readings
///
/// Implementations wrap whatever collector actually gathers the number (connection pool
/// stats, APM latency percentiles, browser telemetry). The engine applies its own timeout
/// around every call, so implementations do not need to.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the current reading for one factor
    ///
    /// # Arguments
    ///
    /// * `factor_id` - Configured factor id, e.g. `storage.connection_pool_utilization`
    /// * `context` - The evaluation this read belongs to
    ///
    /// # Returns
    ///
    /// * `Ok(RawReading)` - The measured value
    /// * `Err` - The reading could not be obtained; the factor falls back to its failure score
    async fn fetch(&self, factor_id: &str, context: &EvaluationContext) -> Result<RawReading>;
}

/// Read-only view over persisted health time series
#[async_trait]
pub trait HistoryQuery: Send + Sync {
    /// Return the points recorded for `component` within `interval`, oldest first
    async fn get_history(&self, component: &str, interval: IntervalSpec)
        -> Result<Vec<HistoryPoint>>;
}

/// Alert payload handed to the alert emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub alert_type: String,
    pub level: AlertLevel,
    pub title: String,
    pub content: String,
    pub source: String,
}

pub type AlertId = String;

/// Alert delivery channel
///
/// The engine calls this once per issue it decides to surface. Delivery, deduplication on
/// the receiving side and notification fan-out are the emitter's concern.
#[async_trait]
pub trait AlertEmitter: Send + Sync {
    /// Create or update an alert
    ///
    /// # Returns
    ///
    /// * `Ok(AlertId)` - Identifier assigned by the alerting system
    /// * `Err` - Delivery failed; the engine logs it and carries on
    async fn create_alert(&self, alert: AlertRequest) -> Result<AlertId>;
}
