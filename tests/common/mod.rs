//! Shared fixtures for integration tests.
#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tierhealth_core::config::{ScoringConfig, TimeoutConfig};
use tierhealth_core::constants::HealthStatus;
use tierhealth_core::evaluation::OverallEvaluator;
use tierhealth_core::integration::{RecordingAlertEmitter, StaticMetricSource};
use tierhealth_core::models::HistoryEntry;
use tierhealth_core::Layer;

/// Default configuration with timeouts short enough for tests
pub fn test_config() -> ScoringConfig {
    ScoringConfig {
        timeouts: TimeoutConfig {
            factor_fetch_ms: 50,
            evaluation_deadline_ms: 200,
        },
        ..ScoringConfig::default()
    }
}

/// Reading that scores 100 for every configured factor
pub fn ideal_reading(config: &ScoringConfig, factor_id: &str) -> Option<f64> {
    Layer::ALL
        .iter()
        .flat_map(|layer| config.layers.get(*layer).factors.iter())
        .find(|factor_spec| factor_spec.id == factor_id)
        .map(|factor_spec| if factor_spec.curve.apply(0.0).score >= 100.0 { 0.0 } else { 100.0 })
}

/// Metric source answering every factor with a perfect reading and a modest load
pub fn perfect_source(config: &ScoringConfig) -> StaticMetricSource {
    let source = StaticMetricSource::new().with_value(config.dynamic_weights.load_metric.clone(), 100.0);
    for layer in Layer::ALL {
        for factor_spec in &config.layers.get(layer).factors {
            if let Some(value) = ideal_reading(config, &factor_spec.id) {
                source.set_value(factor_spec.id.clone(), value);
            }
        }
    }
    source
}

pub struct Harness {
    pub evaluator: OverallEvaluator,
    pub source: Arc<StaticMetricSource>,
    pub alerts: RecordingAlertEmitter,
}

pub fn harness(config: ScoringConfig) -> Harness {
    let source = Arc::new(perfect_source(&config));
    let alerts = RecordingAlertEmitter::new();
    let evaluator = OverallEvaluator::builder(config)
        .metric_source(source.clone())
        .alert_emitter(Arc::new(alerts.clone()))
        .build()
        .expect("test configuration is valid");
    Harness {
        evaluator,
        source,
        alerts,
    }
}

/// History entries spaced `spacing` apart ending now, published status equal to raw status
pub fn spaced_history(scores: &[f64], spacing: Duration, config: &ScoringConfig) -> Vec<HistoryEntry> {
    let spacing = chrono::Duration::from_std(spacing).expect("spacing fits");
    let start: DateTime<Utc> = Utc::now() - spacing * scores.len() as i32;
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            HistoryEntry::raw(start + spacing * i as i32, *score, config.status.classify(*score))
        })
        .collect()
}

pub fn status_of(score: f64) -> HealthStatus {
    ScoringConfig::default().status.classify(score)
}
