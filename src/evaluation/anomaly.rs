//! # Anomaly Pattern Recognition
//!
//! Matches composite signatures across factor scores, layer reachability and the score trend.
//! Recognition is pure: the same inputs always produce the same patterns, and missing data
//! simply produces no pattern.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::AnomalyConfig;
use crate::constants::{AnomalyType, Layer, TrendDirection};
use crate::models::{AnomalyPattern, FactorResult, FactorSignal, LayerScore, TrendResult};

#[derive(Debug, Clone)]
pub struct AnomalyRecognizer {
    config: AnomalyConfig,
}

impl AnomalyRecognizer {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Recognize every pattern whose evidence is present
    ///
    /// `dependency_scores` are node scores from the dependency graph; the business-facing
    /// layer's own entry is ignored when looking for failing dependencies.
    pub fn recognize(
        &self,
        layer_scores: &[LayerScore],
        trend: Option<&TrendResult>,
        dependency_scores: &BTreeMap<Layer, f64>,
    ) -> Vec<AnomalyPattern> {
        let mut patterns = Vec::new();

        patterns.extend(self.avalanche_precursor(layer_scores, trend, dependency_scores));
        patterns.extend(self.deadlock_blocking(layer_scores));
        patterns.extend(self.memory_leak(layer_scores, trend));
        patterns.extend(Self::dependency_failures(layer_scores));
        patterns.extend(Self::rapid_degradation(trend));

        if !patterns.is_empty() {
            debug!(
                patterns = ?patterns.iter().map(|p| p.anomaly_type.as_str()).collect::<Vec<_>>(),
                "🔍 Anomaly patterns recognized"
            );
        }
        patterns
    }

    fn avalanche_precursor(
        &self,
        layer_scores: &[LayerScore],
        trend: Option<&TrendResult>,
        dependency_scores: &BTreeMap<Layer, f64>,
    ) -> Option<AnomalyPattern> {
        let business = layer_scores
            .iter()
            .find(|s| s.layer == self.config.business_layer && s.reachable)?;
        if business.score >= self.config.business_score_threshold {
            return None;
        }

        let mut evidence = Vec::new();
        if let Some(f) = lowest(layer_scores, FactorSignal::Latency) {
            if f.score < self.config.latency_threshold {
                evidence.push(format!("{} at {}", f.name, f.score));
            }
        }
        if let Some(f) = lowest(layer_scores, FactorSignal::ErrorRate) {
            if f.score < self.config.error_rate_threshold {
                evidence.push(format!("{} at {}", f.name, f.score));
            }
        }
        for (layer, score) in dependency_scores {
            if *layer != self.config.business_layer && *score < self.config.dependency_threshold {
                evidence.push(format!("{layer} dependency at {score}"));
            }
        }
        if evidence.is_empty() {
            return None;
        }

        let rapid = trend.is_some_and(|t| t.is_rapid_decline);
        let confidence = if rapid {
            self.config.avalanche_confidence + self.config.rapid_decline_boost
        } else {
            self.config.avalanche_confidence
        };

        Some(AnomalyPattern {
            anomaly_type: AnomalyType::AvalanchePrecursor,
            description: format!(
                "{} layer at {} with upstream pressure: {}",
                business.layer,
                business.score,
                evidence.join(", ")
            ),
            confidence: confidence.min(1.0),
            source: business.layer.to_string(),
        })
    }

    fn deadlock_blocking(&self, layer_scores: &[LayerScore]) -> Option<AnomalyPattern> {
        let saturated = lowest(layer_scores, FactorSignal::Concurrency)
            .filter(|f| f.score < self.config.concurrency_threshold)?;
        let memory = highest(layer_scores, FactorSignal::Memory)
            .filter(|f| f.score >= self.config.memory_busy_idle_threshold)?;

        Some(AnomalyPattern {
            anomaly_type: AnomalyType::DeadlockBlocking,
            description: format!(
                "{} saturated ({}) while {} stays healthy ({}): work is blocked rather than busy",
                saturated.name, saturated.score, memory.name, memory.score
            ),
            confidence: self.config.deadlock_confidence.min(1.0),
            source: saturated.id.clone(),
        })
    }

    fn memory_leak(&self, layer_scores: &[LayerScore], trend: Option<&TrendResult>) -> Option<AnomalyPattern> {
        let memory = lowest(layer_scores, FactorSignal::Memory)
            .filter(|f| f.score < self.config.memory_leak_threshold)?;
        let gc = lowest(layer_scores, FactorSignal::GcPressure)
            .filter(|f| f.score < self.config.gc_pressure_threshold)?;

        let declining = trend.is_some_and(|t| t.direction == TrendDirection::Down);
        let confidence = if declining {
            self.config.memory_leak_confidence + self.config.downtrend_boost
        } else {
            self.config.memory_leak_confidence
        };

        Some(AnomalyPattern {
            anomaly_type: AnomalyType::MemoryLeak,
            description: format!(
                "{} ({}) and {} ({}) both degraded",
                memory.name, memory.score, gc.name, gc.score
            ),
            confidence: confidence.min(1.0),
            source: memory.id.clone(),
        })
    }

    fn dependency_failures(layer_scores: &[LayerScore]) -> impl Iterator<Item = AnomalyPattern> + '_ {
        layer_scores.iter().filter(|s| !s.reachable).map(|s| AnomalyPattern {
            anomaly_type: AnomalyType::DependencyFailure,
            description: format!(
                "{} layer unreachable: none of {} factors could be measured",
                s.layer,
                s.factors.len()
            ),
            confidence: 1.0,
            source: s.layer.to_string(),
        })
    }

    fn rapid_degradation(trend: Option<&TrendResult>) -> Option<AnomalyPattern> {
        let trend = trend.filter(|t| t.is_rapid_decline)?;
        Some(AnomalyPattern {
            anomaly_type: AnomalyType::RapidDegradation,
            description: format!(
                "Health declining {:.1} points per minute",
                trend.decline_rate_per_minute
            ),
            confidence: (0.6 + trend.decline_rate_per_minute / 20.0).min(0.9),
            source: "trend".to_string(),
        })
    }
}

fn with_signal(layer_scores: &[LayerScore], signal: FactorSignal) -> impl Iterator<Item = &FactorResult> {
    layer_scores
        .iter()
        .filter(|s| s.reachable)
        .flat_map(move |s| s.factors_with_signal(signal))
}

fn lowest(layer_scores: &[LayerScore], signal: FactorSignal) -> Option<&FactorResult> {
    with_signal(layer_scores, signal).min_by(|a, b| a.score.total_cmp(&b.score))
}

fn highest(layer_scores: &[LayerScore], signal: FactorSignal) -> Option<&FactorResult> {
    with_signal(layer_scores, signal).max_by(|a, b| a.score.total_cmp(&b.score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FactorCategory;

    fn factor(id: &str, signal: Option<FactorSignal>, score: f64) -> FactorResult {
        FactorResult {
            id: id.to_string(),
            name: id.to_string(),
            weight: 10.0,
            score,
            basis: String::new(),
            recommendation: String::new(),
            category: FactorCategory::Performance,
            signal,
            failed: false,
        }
    }

    fn layer(layer: Layer, score: f64, factors: Vec<FactorResult>) -> LayerScore {
        LayerScore {
            layer,
            score,
            factors,
            weights_used: BTreeMap::new(),
            failed_factors: Vec::new(),
            reachable: true,
        }
    }

    fn trend(direction: TrendDirection, decline: f64, rapid: bool) -> TrendResult {
        TrendResult {
            current_score: 50.0,
            direction,
            change_rate_per_minute: -decline,
            decline_rate_per_minute: decline,
            is_rapid_decline: rapid,
            stability_index: 50.0,
            historical_scores: Vec::new(),
            sample_count: 5,
        }
    }

    fn recognizer() -> AnomalyRecognizer {
        AnomalyRecognizer::new(AnomalyConfig::default())
    }

    fn types(patterns: &[AnomalyPattern]) -> Vec<AnomalyType> {
        patterns.iter().map(|p| p.anomaly_type).collect()
    }

    #[test]
    fn test_healthy_layers_have_no_patterns() {
        let layers = vec![
            layer(Layer::Client, 100.0, vec![factor("lat", Some(FactorSignal::Latency), 100.0)]),
            layer(Layer::Service, 100.0, vec![factor("mem", Some(FactorSignal::Memory), 100.0)]),
        ];
        assert!(recognizer().recognize(&layers, None, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_avalanche_needs_business_layer_and_pressure() {
        let layers = vec![layer(
            Layer::Client,
            55.0,
            vec![factor("client.page_load_time", Some(FactorSignal::Latency), 20.0)],
        )];
        let patterns = recognizer().recognize(&layers, None, &BTreeMap::new());
        assert_eq!(types(&patterns), vec![AnomalyType::AvalanchePrecursor]);
        assert_eq!(patterns[0].confidence, 0.7);

        let boosted = recognizer().recognize(
            &layers,
            Some(&trend(TrendDirection::Down, 3.0, true)),
            &BTreeMap::new(),
        );
        let avalanche = boosted
            .iter()
            .find(|p| p.anomaly_type == AnomalyType::AvalanchePrecursor)
            .unwrap();
        assert!((avalanche.confidence - 0.85).abs() < 1e-9);

        // Business layer fine: no avalanche even with slow latency
        let layers = vec![layer(
            Layer::Client,
            75.0,
            vec![factor("client.page_load_time", Some(FactorSignal::Latency), 20.0)],
        )];
        assert!(recognizer().recognize(&layers, None, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_avalanche_from_failing_dependency() {
        let layers = vec![layer(Layer::Client, 50.0, vec![])];
        let deps = BTreeMap::from([(Layer::Client, 50.0), (Layer::Storage, 30.0)]);
        let patterns = recognizer().recognize(&layers, None, &deps);
        assert_eq!(types(&patterns), vec![AnomalyType::AvalanchePrecursor]);
        assert!(patterns[0].description.contains("storage"));
    }

    #[test]
    fn test_deadlock_busy_but_idle() {
        let layers = vec![layer(
            Layer::Service,
            60.0,
            vec![
                factor("service.worker_saturation", Some(FactorSignal::Concurrency), 0.0),
                factor("service.memory_utilization", Some(FactorSignal::Memory), 100.0),
            ],
        )];
        let patterns = recognizer().recognize(&layers, None, &BTreeMap::new());
        assert_eq!(types(&patterns), vec![AnomalyType::DeadlockBlocking]);
        assert_eq!(patterns[0].confidence, 0.75);
    }

    #[test]
    fn test_memory_leak_with_downtrend_boost() {
        let layers = vec![layer(
            Layer::Service,
            60.0,
            vec![
                factor("service.memory_utilization", Some(FactorSignal::Memory), 40.0),
                factor("service.gc_pressure", Some(FactorSignal::GcPressure), 30.0),
            ],
        )];
        let patterns = recognizer().recognize(
            &layers,
            Some(&trend(TrendDirection::Down, 0.5, false)),
            &BTreeMap::new(),
        );
        assert_eq!(types(&patterns), vec![AnomalyType::MemoryLeak]);
        assert!((patterns[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_layer_is_dependency_failure() {
        let layers = vec![LayerScore::unreachable(
            Layer::Storage,
            vec![factor("storage.query_latency", Some(FactorSignal::Latency), 0.0)],
        )];
        let patterns = recognizer().recognize(&layers, None, &BTreeMap::new());
        assert_eq!(types(&patterns), vec![AnomalyType::DependencyFailure]);
        assert_eq!(patterns[0].confidence, 1.0);
        assert_eq!(patterns[0].source, "storage");
    }

    #[test]
    fn test_rapid_degradation_confidence_is_capped() {
        let patterns = recognizer().recognize(
            &[],
            Some(&trend(TrendDirection::Down, 2.8, true)),
            &BTreeMap::new(),
        );
        assert_eq!(types(&patterns), vec![AnomalyType::RapidDegradation]);
        assert!((patterns[0].confidence - 0.74).abs() < 1e-9);

        let capped = recognizer().recognize(
            &[],
            Some(&trend(TrendDirection::Down, 50.0, true)),
            &BTreeMap::new(),
        );
        assert_eq!(capped[0].confidence, 0.9);
    }
}
