//! # Layer Evaluation
//!
//! Scores one tier by reading all of its factors concurrently and combining them with
//! effective weights. Static weights are normalized to 100; tiers with dynamic weighting
//! enabled rescale each category's share to the current performance/business split.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::factor::{FactorEvaluator, HealthFactor, ThresholdFactor};
use crate::config::LayerConfig;
use crate::constants::{clamp_score, Layer};
use crate::integration::{EvaluationContext, MetricSource};
use crate::models::{DynamicWeights, FactorCategory, FactorDescriptor, LayerScore};

pub struct LayerEvaluator {
    layer: Layer,
    factors: Vec<Arc<dyn HealthFactor>>,
    dynamic_weighting: bool,
    factor_evaluator: FactorEvaluator,
    source: Arc<dyn MetricSource>,
}

impl std::fmt::Debug for LayerEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerEvaluator")
            .field("layer", &self.layer)
            .field("factors", &self.factors.len())
            .field("dynamic_weighting", &self.dynamic_weighting)
            .field("timeout", &self.factor_evaluator.timeout())
            .finish()
    }
}

impl LayerEvaluator {
    pub fn new(
        layer: Layer,
        factors: Vec<Arc<dyn HealthFactor>>,
        dynamic_weighting: bool,
        factor_timeout: Duration,
        source: Arc<dyn MetricSource>,
    ) -> Self {
        Self {
            layer,
            factors,
            dynamic_weighting,
            factor_evaluator: FactorEvaluator::new(factor_timeout),
            source,
        }
    }

    /// Build the evaluator for `layer` from its configured factor catalog
    pub fn from_config(
        layer: Layer,
        config: &LayerConfig,
        factor_timeout: Duration,
        source: Arc<dyn MetricSource>,
    ) -> Self {
        let factors = config
            .factors
            .iter()
            .map(|factor_spec| {
                Arc::new(ThresholdFactor::from_spec(factor_spec, config.failure_score)) as Arc<dyn HealthFactor>
            })
            .collect();
        Self::new(layer, factors, config.dynamic_weighting, factor_timeout, source)
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn factors(&self) -> &[Arc<dyn HealthFactor>] {
        &self.factors
    }

    /// Score the tier. Never fails; unreadable factors count with their failure score.
    pub async fn evaluate(
        &self,
        context: &EvaluationContext,
        dynamic_weights: Option<&DynamicWeights>,
    ) -> LayerScore {
        let context = context.for_layer(self.layer);
        let results = join_all(self.factors.iter().map(|factor| {
            self.factor_evaluator
                .evaluate(factor.as_ref(), self.source.as_ref(), &context)
        }))
        .await;

        let failed_factors: Vec<String> = results
            .iter()
            .filter(|r| r.failed)
            .map(|r| r.id.clone())
            .collect();

        if results.is_empty() || failed_factors.len() == results.len() {
            warn!(
                layer = %self.layer,
                failed = failed_factors.len(),
                "🔴 Layer unreachable: no factor could be measured"
            );
            return LayerScore::unreachable(self.layer, results);
        }

        let descriptors: Vec<&FactorDescriptor> =
            self.factors.iter().map(|f| f.descriptor()).collect();
        let weights_used = effective_weights(
            &descriptors,
            if self.dynamic_weighting {
                dynamic_weights
            } else {
                None
            },
        );

        let weighted: f64 = results
            .iter()
            .map(|r| r.score * weights_used.get(&r.id).copied().unwrap_or(0.0))
            .sum();
        let score = clamp_score((weighted / 100.0).round());

        if failed_factors.len() > 1 {
            warn!(
                layer = %self.layer,
                failed_factors = ?failed_factors,
                "🟡 Layer degraded: multiple factors failed"
            );
        }
        debug!(layer = %self.layer, score = score, "📊 Layer scored");

        LayerScore {
            layer: self.layer,
            score,
            factors: results,
            weights_used,
            failed_factors,
            reachable: true,
        }
    }
}

/// Effective weight per factor id, summing to 100
///
/// Negative and non-finite weights count as zero; when nothing positive remains the weights
/// are spread evenly. With `dynamic` set and both categories present, each category's share
/// is rescaled to the dynamic split while keeping relative weights inside the category.
pub fn effective_weights(
    descriptors: &[&FactorDescriptor],
    dynamic: Option<&DynamicWeights>,
) -> BTreeMap<String, f64> {
    let mut weights = BTreeMap::new();
    if descriptors.is_empty() {
        return weights;
    }

    let raw: Vec<f64> = descriptors
        .iter()
        .map(|d| if d.weight.is_finite() { d.weight.max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = raw.iter().sum();
    let normalized: Vec<f64> = if total > 0.0 {
        raw.iter().map(|w| w / total * 100.0).collect()
    } else {
        vec![100.0 / descriptors.len() as f64; descriptors.len()]
    };

    let category_total = |category: FactorCategory| -> f64 {
        descriptors
            .iter()
            .zip(&normalized)
            .filter(|(d, _)| d.category == category)
            .map(|(_, w)| *w)
            .sum()
    };
    let performance_total = category_total(FactorCategory::Performance);
    let business_total = category_total(FactorCategory::Business);

    let rescale = match dynamic {
        Some(split) if performance_total > 0.0 && business_total > 0.0 => Some((
            split.performance_weight * 100.0 / performance_total,
            split.business_weight * 100.0 / business_total,
        )),
        _ => None,
    };

    for (descriptor, weight) in descriptors.iter().zip(normalized) {
        let effective = match (rescale, descriptor.category) {
            (Some((perf, _)), FactorCategory::Performance) => weight * perf,
            (Some((_, business)), FactorCategory::Business) => weight * business,
            (None, _) => weight,
        };
        weights.insert(descriptor.id.clone(), effective);
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::integration::{ReadingBehavior, StaticMetricSource};
    use crate::models::RawReading;

    fn descriptor(id: &str, weight: f64, category: FactorCategory) -> FactorDescriptor {
        FactorDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            weight,
            category,
            signal: None,
            unit: String::new(),
        }
    }

    fn perfect_source(config: &LayerConfig) -> StaticMetricSource {
        let source = StaticMetricSource::new();
        for factor_spec in &config.factors {
            let ideal = match factor_spec.curve.apply(0.0).score {
                s if s >= 100.0 => 0.0,
                _ => 100.0,
            };
            source.set_value(factor_spec.id.clone(), ideal);
        }
        source
    }

    #[test]
    fn test_static_weights_normalize_to_hundred() {
        let a = descriptor("a", 3.0, FactorCategory::Performance);
        let b = descriptor("b", 1.0, FactorCategory::Business);
        let weights = effective_weights(&[&a, &b], None);
        assert!((weights["a"] - 75.0).abs() < 1e-9);
        assert!((weights["b"] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_dynamic_split_rescales_categories() {
        let a = descriptor("a", 30.0, FactorCategory::Performance);
        let b = descriptor("b", 20.0, FactorCategory::Performance);
        let c = descriptor("c", 50.0, FactorCategory::Business);
        let split = DynamicWeights {
            performance_weight: 0.4,
            business_weight: 0.6,
            high_load: true,
            load_ratio: Some(0.9),
        };
        let weights = effective_weights(&[&a, &b, &c], Some(&split));
        assert!((weights["a"] - 24.0).abs() < 1e-9);
        assert!((weights["b"] - 16.0).abs() < 1e-9);
        assert!((weights["c"] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_category_ignores_dynamic_split() {
        let a = descriptor("a", 50.0, FactorCategory::Performance);
        let b = descriptor("b", 50.0, FactorCategory::Performance);
        let split = DynamicWeights {
            performance_weight: 0.3,
            business_weight: 0.7,
            high_load: false,
            load_ratio: None,
        };
        let weights = effective_weights(&[&a, &b], Some(&split));
        assert!((weights.values().sum::<f64>() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_spread_evenly() {
        let a = descriptor("a", 0.0, FactorCategory::Performance);
        let b = descriptor("b", f64::NAN, FactorCategory::Business);
        let weights = effective_weights(&[&a, &b], None);
        assert_eq!(weights["a"], 50.0);
        assert_eq!(weights["b"], 50.0);
    }

    #[tokio::test]
    async fn test_perfect_readings_score_hundred() {
        let config = ScoringConfig::default();
        let layer_config = config.layers.get(Layer::Storage);
        let source = Arc::new(perfect_source(layer_config));
        let evaluator = LayerEvaluator::from_config(
            Layer::Storage,
            layer_config,
            Duration::from_millis(200),
            source,
        );

        let score = evaluator.evaluate(&EvaluationContext::new("overall"), None).await;
        assert_eq!(score.score, 100.0);
        assert!(score.reachable);
        assert!(score.failed_factors.is_empty());
        assert!((score.weights_used.values().sum::<f64>() - 100.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_partial_failures_are_collected() {
        let config = ScoringConfig::default();
        let layer_config = config.layers.get(Layer::Storage);
        let source = perfect_source(layer_config);
        source.set_behavior("storage.query_latency", ReadingBehavior::Fail("apm down".into()));
        source.set_behavior("storage.replication_lag", ReadingBehavior::Fail("apm down".into()));
        let evaluator = LayerEvaluator::from_config(
            Layer::Storage,
            layer_config,
            Duration::from_millis(200),
            Arc::new(source),
        );

        let score = evaluator.evaluate(&EvaluationContext::new("overall"), None).await;
        assert!(score.reachable);
        assert!(score.is_degraded());
        assert_eq!(score.failed_factors.len(), 2);
        // query latency (30) and replication lag (10) score 0
        assert_eq!(score.score, 60.0);
    }

    #[tokio::test]
    async fn test_all_failures_make_layer_unreachable() {
        let config = ScoringConfig::default();
        let evaluator = LayerEvaluator::from_config(
            Layer::Storage,
            config.layers.get(Layer::Storage),
            Duration::from_millis(200),
            Arc::new(StaticMetricSource::new()),
        );

        let score = evaluator.evaluate(&EvaluationContext::new("overall"), None).await;
        assert!(!score.reachable);
        assert_eq!(score.score, 0.0);
        assert_eq!(score.failed_factors.len(), 5);
    }

    #[test]
    fn test_assess_is_pure() {
        let config = ScoringConfig::default();
        let factor_spec = &config.layers.get(Layer::Service).factors[0];
        let factor = ThresholdFactor::from_spec(factor_spec, 0.0);
        let reading = RawReading::new(123.0);
        assert_eq!(factor.assess(&reading), factor.assess(&reading));
    }
}
