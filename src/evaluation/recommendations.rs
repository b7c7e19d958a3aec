//! Turns scored layers, anomalies and predictions into issues and recommendations.

use std::collections::HashSet;

use crate::config::StatusThresholds;
use crate::constants::{AnomalyType, Layer, RiskLevel};
use crate::models::{AnomalyPattern, HealthIssue, LayerScore, PredictiveResult};

fn anomaly_recommendation(anomaly_type: AnomalyType) -> &'static str {
    match anomaly_type {
        AnomalyType::AvalanchePrecursor => {
            "Shed non-critical traffic and enable circuit breakers before failures cascade"
        }
        AnomalyType::DeadlockBlocking => {
            "Inspect lock waits and blocked workers; capture thread and connection dumps"
        }
        AnomalyType::MemoryLeak => "Capture a heap profile and plan a rolling restart",
        AnomalyType::DependencyFailure => {
            "Restore connectivity to the unreachable tier and verify its metric collectors"
        }
        AnomalyType::RapidDegradation => {
            "Review recent deployments and configuration changes for a rollback candidate"
        }
    }
}

/// Issues for one layer score
pub fn layer_issues(score: &LayerScore, thresholds: &StatusThresholds) -> Vec<HealthIssue> {
    let source = score.layer.to_string();
    let mut issues = Vec::new();

    if !score.reachable {
        issues.push(HealthIssue {
            source,
            message: format!("{} layer unreachable", score.layer),
            score: 0.0,
            anomaly: None,
        });
        return issues;
    }

    if score.is_degraded() {
        issues.push(HealthIssue {
            source: source.clone(),
            message: format!(
                "{} layer degraded: {} factors failed ({})",
                score.layer,
                score.failed_factors.len(),
                score.failed_factors.join(", ")
            ),
            score: score.score,
            anomaly: None,
        });
    }

    if score.score < thresholds.healthy {
        issues.push(HealthIssue {
            source,
            message: format!("{} layer health score is {}", score.layer, score.score),
            score: score.score,
            anomaly: None,
        });
    }
    issues
}

/// Issue for a recognized anomaly, scored by the layer it came from when there is one
pub fn anomaly_issue(pattern: &AnomalyPattern, layer_scores: &[LayerScore], overall_score: f64) -> HealthIssue {
    let score = pattern
        .source
        .parse::<Layer>()
        .ok()
        .and_then(|layer| layer_scores.iter().find(|s| s.layer == layer))
        .map_or(overall_score, |s| s.score);
    HealthIssue {
        source: pattern.source.clone(),
        message: format!("{}: {}", pattern.anomaly_type, pattern.description),
        score,
        anomaly: Some(pattern.anomaly_type),
    }
}

pub fn prediction_issue(prediction: &PredictiveResult, overall_score: f64) -> Option<HealthIssue> {
    if prediction.risk_level < RiskLevel::High {
        return None;
    }
    let message = match prediction.predicted_failure_time {
        Some(at) => format!(
            "{:?} risk: health projected to reach zero by {}",
            prediction.risk_level,
            at.to_rfc3339()
        ),
        None => format!("{:?} risk of health failure", prediction.risk_level),
    };
    Some(HealthIssue {
        source: "prediction".to_string(),
        message,
        score: overall_score,
        anomaly: None,
    })
}

/// Deduplicated recommendations, most urgent first
///
/// Anomaly actions come first, then factor recommendations ordered by ascending score.
pub fn collect_recommendations(layer_scores: &[LayerScore], anomalies: &[AnomalyPattern]) -> Vec<String> {
    let mut candidates: Vec<String> = anomalies
        .iter()
        .map(|a| anomaly_recommendation(a.anomaly_type).to_string())
        .collect();

    let mut factors: Vec<_> = layer_scores
        .iter()
        .flat_map(|s| s.factors.iter())
        .filter(|f| f.has_recommendation())
        .collect();
    factors.sort_by(|a, b| a.score.total_cmp(&b.score));
    candidates.extend(factors.into_iter().map(|f| f.recommendation.clone()));

    let mut seen = HashSet::new();
    candidates.retain(|r| seen.insert(r.clone()));
    candidates
}
