//! # Factor Evaluation
//!
//! A factor turns one raw metric into a 0-100 score. [`HealthFactor`] is the seam; the
//! configurable [`ThresholdFactor`] covers every factor shipped in the default catalog.
//! [`FactorEvaluator`] wraps the metric read in a timeout and never fails: a missing or slow
//! reading degrades to the factor's failure score.

use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::curve::ScoringCurve;
use crate::config::FactorSpec;
use crate::constants::clamp_score;
use crate::error::HealthError;
use crate::integration::{EvaluationContext, MetricSource};
use crate::models::{FactorDescriptor, FactorResult, RawReading};

/// One weighted sub-metric of a layer
pub trait HealthFactor: Send + Sync + fmt::Debug {
    fn descriptor(&self) -> &FactorDescriptor;

    /// Score a reading. Pure: the same reading always yields the same result.
    fn assess(&self, reading: &RawReading) -> FactorResult;

    /// Result used when no usable reading exists
    fn failed(&self, reason: &str) -> FactorResult;
}

/// Factor scored through a [`ScoringCurve`]
#[derive(Debug, Clone)]
pub struct ThresholdFactor {
    descriptor: FactorDescriptor,
    curve: ScoringCurve,
    failure_score: f64,
}

impl ThresholdFactor {
    pub fn new(descriptor: FactorDescriptor, curve: ScoringCurve, failure_score: f64) -> Self {
        Self {
            descriptor,
            curve,
            failure_score: clamp_score(failure_score),
        }
    }

    pub fn from_spec(factor_spec: &FactorSpec, failure_score: f64) -> Self {
        Self::new(
            FactorDescriptor {
                id: factor_spec.id.clone(),
                name: factor_spec.name.clone(),
                weight: factor_spec.weight,
                category: factor_spec.category,
                signal: factor_spec.signal,
                unit: factor_spec.unit.clone(),
            },
            factor_spec.curve.clone(),
            failure_score,
        )
    }

    fn result(&self, score: f64, basis: String, recommendation: String, failed: bool) -> FactorResult {
        FactorResult {
            id: self.descriptor.id.clone(),
            name: self.descriptor.name.clone(),
            weight: self.descriptor.weight,
            score: clamp_score(score),
            basis,
            recommendation,
            category: self.descriptor.category,
            signal: self.descriptor.signal,
            failed,
        }
    }
}

impl HealthFactor for ThresholdFactor {
    fn descriptor(&self) -> &FactorDescriptor {
        &self.descriptor
    }

    fn assess(&self, reading: &RawReading) -> FactorResult {
        if !reading.value.is_finite() {
            return self.failed("non-finite reading");
        }
        let outcome = self.curve.apply(reading.value);
        let basis = format!(
            "{} = {}{} ({})",
            self.descriptor.name, reading.value, self.descriptor.unit, outcome.rule
        );
        self.result(
            outcome.score,
            basis,
            outcome.recommendation.unwrap_or_default(),
            false,
        )
    }

    fn failed(&self, reason: &str) -> FactorResult {
        self.result(
            self.failure_score,
            format!("evaluation failed: {reason}"),
            format!("Restore metric collection for {}", self.descriptor.name),
            true,
        )
    }
}

/// Fetches a reading with a bounded wait and scores it
#[derive(Debug, Clone, Copy)]
pub struct FactorEvaluator {
    timeout: Duration,
}

impl FactorEvaluator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn evaluate(
        &self,
        factor: &dyn HealthFactor,
        source: &dyn MetricSource,
        context: &EvaluationContext,
    ) -> FactorResult {
        let factor_id = factor.descriptor().id.as_str();

        let fetched = match tokio::time::timeout(self.timeout, source.fetch(factor_id, context)).await {
            Ok(result) => result,
            Err(_) => Err(HealthError::MetricTimeout {
                factor_id: factor_id.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        match fetched {
            Ok(reading) => {
                let result = factor.assess(&reading);
                debug!(
                    factor_id = %factor_id,
                    value = reading.value,
                    score = result.score,
                    "📏 Factor scored"
                );
                result
            }
            Err(err) => {
                warn!(
                    factor_id = %factor_id,
                    evaluation_id = %context.evaluation_id,
                    error = %err,
                    "⚠️ Factor reading unavailable, using failure score"
                );
                factor.failed(&err.to_string())
            }
        }
    }
}
