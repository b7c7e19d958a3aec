mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{perfect_source, spaced_history, test_config};
use tierhealth_core::constants::{AnomalyType, Forecast, RiskLevel, TrendDirection};
use tierhealth_core::evaluation::{AnomalyRecognizer, OverallEvaluator, PredictiveAnalyzer, TrendAnalyzer};
use tierhealth_core::history::HistoryStore;
use tierhealth_core::integration::ReadingBehavior;

const FIVE_MINUTES: Duration = Duration::from_secs(300);

#[test]
fn steady_decline_is_flagged_rapid() {
    let config = test_config();
    let history = spaced_history(&[95.0, 80.0, 65.0, 50.0, 40.0], FIVE_MINUTES, &config);

    let trend = TrendAnalyzer::new(config.trend.clone()).analyze(&history);
    assert_eq!(trend.direction, TrendDirection::Down);
    assert!(trend.is_rapid_decline);
    assert!(trend.decline_rate_per_minute > 2.0);
    assert_eq!(trend.current_score, 40.0);

    let anomalies = AnomalyRecognizer::new(config.anomaly.clone()).recognize(
        &[],
        Some(&trend),
        &Default::default(),
    );
    assert!(anomalies
        .iter()
        .any(|a| a.anomaly_type == AnomalyType::RapidDegradation));

    let prediction =
        PredictiveAnalyzer::new(config.prediction.clone()).predict(40.0, Some(&trend), &anomalies, Utc::now());
    assert_eq!(prediction.forecast, Forecast::Degrading);
    assert!(prediction.risk_level >= RiskLevel::High);
    assert!(prediction.predicted_failure_time.is_some());
}

#[test]
fn flat_history_is_stable() {
    let config = test_config();
    let history = spaced_history(&[95.0; 8], FIVE_MINUTES, &config);

    let trend = TrendAnalyzer::new(config.trend.clone()).analyze(&history);
    assert_eq!(trend.direction, TrendDirection::Stable);
    assert!(!trend.is_rapid_decline);
    assert_eq!(trend.stability_index, 100.0);

    let prediction =
        PredictiveAnalyzer::new(config.prediction.clone()).predict(95.0, Some(&trend), &[], Utc::now());
    assert_eq!(prediction.forecast, Forecast::Stable);
    assert_eq!(prediction.risk_level, RiskLevel::Low);
    assert!(prediction.predicted_failure_time.is_none());
}

#[tokio::test]
async fn evaluator_escalates_risk_on_seeded_decline() {
    let config = test_config();
    let store = Arc::new(HistoryStore::new(config.history.capacity));
    for entry in spaced_history(&[95.0, 80.0, 65.0, 50.0], FIVE_MINUTES, &config) {
        store.record("overall", entry);
    }

    let source = Arc::new(perfect_source(&config));
    source.set_prefix_behavior("client.", ReadingBehavior::Fail("cdn outage".into()));
    source.set_prefix_behavior("storage.", ReadingBehavior::Fail("primary lost".into()));

    let evaluator = OverallEvaluator::builder(config)
        .metric_source(source)
        .history(Arc::clone(&store))
        .build()
        .unwrap();

    let result = evaluator.evaluate().await;

    assert!(result.success);
    // Only the service node (weight 0.4) is still answering
    assert_eq!(result.overall_score, 40.0);
    let trend = result.trend.as_ref().unwrap();
    assert_eq!(trend.direction, TrendDirection::Down);
    assert!(trend.is_rapid_decline);
    assert_eq!(trend.sample_count, 5);

    let prediction = result.prediction.as_ref().unwrap();
    assert!(prediction.risk_level >= RiskLevel::High);
    assert!(result
        .issues
        .iter()
        .any(|i| i.source == "prediction"));
    assert_eq!(store.len("overall"), 5);
}
