use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::layer::LayerScore;
use crate::constants::{
    AnomalyType, Forecast, HealthStatus, ImpactLevel, Layer, RiskLevel, TrendDirection,
};

/// Performance/business split for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicWeights {
    pub performance_weight: f64,
    pub business_weight: f64,
    /// True when the high-load split was chosen
    pub high_load: bool,
    /// `current_load / peak_reference`, when load telemetry was available
    pub load_ratio: Option<f64>,
}

impl DynamicWeights {
    pub fn sum(&self) -> f64 {
        self.performance_weight + self.business_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub current_score: f64,
    pub direction: TrendDirection,
    /// Signed change of the recent half against the older half, per minute
    pub change_rate_per_minute: f64,
    /// Positive part of the decline, per minute; zero when not declining
    pub decline_rate_per_minute: f64,
    pub is_rapid_decline: bool,
    pub stability_index: f64,
    pub historical_scores: Vec<f64>,
    pub sample_count: usize,
}

impl TrendResult {
    /// Result used when there is not enough history to say anything
    pub fn neutral(current_score: f64, historical_scores: Vec<f64>) -> Self {
        Self {
            current_score,
            direction: TrendDirection::Stable,
            change_rate_per_minute: 0.0,
            decline_rate_per_minute: 0.0,
            is_rapid_decline: false,
            stability_index: 100.0,
            sample_count: historical_scores.len(),
            historical_scores,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPattern {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub description: String,
    /// 0..=1
    pub confidence: f64,
    /// Layer, factor or analyzer that produced the evidence
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveResult {
    pub forecast: Forecast,
    pub risk_level: RiskLevel,
    pub predicted_failure_time: Option<DateTime<Utc>>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeImpact {
    pub node: Layer,
    pub health_score: f64,
    pub impact_level: ImpactLevel,
    pub affected_capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyImpact {
    pub impacts: Vec<NodeImpact>,
    pub overall_impact_level: ImpactLevel,
    /// Sum over flagged nodes; capabilities shared by several nodes count more than once
    pub impacted_capability_count: usize,
    /// Weighted share of lost health across flagged nodes, in percent
    pub estimated_user_impact_pct: f64,
}

impl DependencyImpact {
    pub fn none() -> Self {
        Self {
            impacts: Vec::new(),
            overall_impact_level: ImpactLevel::None,
            impacted_capability_count: 0,
            estimated_user_impact_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceConfidence {
    /// Too little history; the raw status was published as-is
    Low,
    Normal,
}

/// Output of the hysteresis state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebounceOutcome {
    pub current_status: HealthStatus,
    pub previous_status: HealthStatus,
    pub raw_status: HealthStatus,
    pub stability_index: f64,
    pub reason: String,
    /// Consecutive newest samples whose raw status agrees with the published status
    pub consecutive_stable_checks: usize,
    pub confidence: DebounceConfidence,
    pub transitioned: bool,
}

/// Something worth telling a human about, with the score that caused it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub source: String,
    pub message: String,
    pub score: f64,
    /// Set when the issue was raised by an anomaly pattern
    pub anomaly: Option<AnomalyType>,
}

/// The single artifact produced by an orchestrated evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub evaluation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub overall_score: f64,
    pub status: HealthStatus,
    pub debounce: Option<DebounceOutcome>,
    pub layer_scores: Vec<LayerScore>,
    pub dynamic_weights: Option<DynamicWeights>,
    pub trend: Option<TrendResult>,
    pub anomaly_patterns: Vec<AnomalyPattern>,
    pub prediction: Option<PredictiveResult>,
    pub dependency_impact: Option<DependencyImpact>,
    pub issues: Vec<HealthIssue>,
    pub recommendations: Vec<String>,
    pub duration_ms: u64,
}

impl EvaluationResult {
    /// Envelope returned when the evaluation could not be assembled
    pub fn failure(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            evaluation_id: Uuid::new_v4(),
            timestamp,
            success: false,
            error: Some(error.into()),
            overall_score: 0.0,
            status: HealthStatus::Critical,
            debounce: None,
            layer_scores: Vec::new(),
            dynamic_weights: None,
            trend: None,
            anomaly_patterns: Vec::new(),
            prediction: None,
            dependency_impact: None,
            issues: Vec::new(),
            recommendations: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn layer(&self, layer: Layer) -> Option<&LayerScore> {
        self.layer_scores.iter().find(|s| s.layer == layer)
    }

    pub fn has_anomaly(&self, anomaly_type: AnomalyType) -> bool {
        self.anomaly_patterns
            .iter()
            .any(|p| p.anomaly_type == anomaly_type)
    }

    pub fn issue_messages(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.message.as_str()).collect()
    }
}
