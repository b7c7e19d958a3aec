//! In-memory collaborators for embedding the engine without external systems and for tests.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::traits::{AlertEmitter, AlertId, AlertRequest, EvaluationContext, MetricSource};
use crate::error::{HealthError, Result};
use crate::models::RawReading;

/// How a [`StaticMetricSource`] answers for one factor
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingBehavior {
    Value(f64),
    Fail(String),
    /// Never resolves; the caller's timeout decides the outcome
    Hang,
}

/// Metric source answering from a fixed table
///
/// Factors without an entry fail with `MetricUnavailable`. Entries can be changed while the
/// source is shared, which lets a test degrade a reading between two evaluations.
#[derive(Debug, Default)]
pub struct StaticMetricSource {
    readings: DashMap<String, ReadingBehavior>,
    fetch_count: AtomicU64,
}

impl StaticMetricSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, factor_id: impl Into<String>, value: f64) -> Self {
        self.set_value(factor_id, value);
        self
    }

    pub fn with_behavior(self, factor_id: impl Into<String>, behavior: ReadingBehavior) -> Self {
        self.readings.insert(factor_id.into(), behavior);
        self
    }

    pub fn set_value(&self, factor_id: impl Into<String>, value: f64) {
        self.readings
            .insert(factor_id.into(), ReadingBehavior::Value(value));
    }

    pub fn set_behavior(&self, factor_id: impl Into<String>, behavior: ReadingBehavior) {
        self.readings.insert(factor_id.into(), behavior);
    }

    /// Apply `behavior` to every known factor whose id starts with `prefix`
    pub fn set_prefix_behavior(&self, prefix: &str, behavior: ReadingBehavior) {
        for mut entry in self.readings.iter_mut() {
            if entry.key().starts_with(prefix) {
                *entry.value_mut() = behavior.clone();
            }
        }
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetricSource for StaticMetricSource {
    async fn fetch(&self, factor_id: &str, context: &EvaluationContext) -> Result<RawReading> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        // Clone out of the map so no shard guard is held across an await point
        let behavior = self.readings.get(factor_id).map(|b| b.value().clone());
        match behavior {
            Some(ReadingBehavior::Value(value)) => Ok(RawReading::new(value)),
            Some(ReadingBehavior::Fail(reason)) => {
                Err(HealthError::metric_unavailable(factor_id, reason))
            }
            Some(ReadingBehavior::Hang) => {
                debug!(
                    factor_id = %factor_id,
                    evaluation_id = %context.evaluation_id,
                    "Metric source hanging on purpose"
                );
                futures::future::pending::<()>().await;
                Err(HealthError::metric_unavailable(factor_id, "source hung"))
            }
            None => Err(HealthError::metric_unavailable(
                factor_id,
                "no reading configured",
            )),
        }
    }
}

/// Alert emitter that keeps every request in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingAlertEmitter {
    alerts: Arc<Mutex<Vec<AlertRequest>>>,
    fail_with: Arc<Mutex<Option<String>>>,
    hang: Arc<AtomicBool>,
}

impl RecordingAlertEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `create_alert` fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail_with.lock() = Some(reason.into());
    }

    /// Make every following `create_alert` wait forever
    pub fn hang(&self) {
        self.hang.store(true, Ordering::Relaxed);
    }

    pub fn alerts(&self) -> Vec<AlertRequest> {
        self.alerts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }

    pub fn clear(&self) {
        self.alerts.lock().clear();
    }
}

#[async_trait]
impl AlertEmitter for RecordingAlertEmitter {
    async fn create_alert(&self, alert: AlertRequest) -> Result<AlertId> {
        if self.hang.load(Ordering::Relaxed) {
            futures::future::pending::<()>().await;
        }
        if let Some(reason) = self.fail_with.lock().clone() {
            return Err(HealthError::AlertError(reason));
        }
        let mut alerts = self.alerts.lock();
        alerts.push(alert);
        Ok(format!("alert-{}", alerts.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::AlertLevel;

    #[tokio::test]
    async fn test_static_source_returns_configured_values() {
        let source = StaticMetricSource::new().with_value("service.error_rate", 1.5);
        let ctx = EvaluationContext::new("overall");

        let reading = source.fetch("service.error_rate", &ctx).await.unwrap();
        assert_eq!(reading.value, 1.5);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_static_source_unknown_and_failing_factors() {
        let source = StaticMetricSource::new()
            .with_behavior("storage.query_latency", ReadingBehavior::Fail("down".into()));
        let ctx = EvaluationContext::new("overall");

        let err = source.fetch("storage.query_latency", &ctx).await.unwrap_err();
        assert!(err.is_metric_failure());
        let err = source.fetch("nope", &ctx).await.unwrap_err();
        assert!(matches!(err, HealthError::MetricUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_prefix_behavior_only_touches_matching_factors() {
        let source = StaticMetricSource::new()
            .with_value("storage.query_latency", 10.0)
            .with_value("service.response_time", 10.0);
        source.set_prefix_behavior("storage.", ReadingBehavior::Fail("gone".into()));
        let ctx = EvaluationContext::new("overall");

        assert!(source.fetch("storage.query_latency", &ctx).await.is_err());
        assert!(source.fetch("service.response_time", &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_recording_emitter() {
        let emitter = RecordingAlertEmitter::new();
        let request = AlertRequest {
            alert_type: "health".into(),
            level: AlertLevel::Major,
            title: "t".into(),
            content: "c".into(),
            source: "tierhealth".into(),
        };

        let id = emitter.create_alert(request.clone()).await.unwrap();
        assert_eq!(id, "alert-1");
        assert_eq!(emitter.alerts(), vec![request.clone()]);

        emitter.fail_with("smtp down");
        assert!(emitter.create_alert(request).await.is_err());
        assert_eq!(emitter.len(), 1);
    }
}
