use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the dynamic performance/business split a factor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Performance,
    Business,
}

/// Semantic tag used by anomaly recognition to find factors across layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSignal {
    Latency,
    ErrorRate,
    Concurrency,
    Memory,
    GcPressure,
}

/// Static identity of a factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDescriptor {
    pub id: String,
    pub name: String,
    /// Share of the layer score in percent
    pub weight: f64,
    pub category: FactorCategory,
    pub signal: Option<FactorSignal>,
    pub unit: String,
}

/// One raw metric value returned by a metric source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl RawReading {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            observed_at: Utc::now(),
        }
    }
}

/// Scored factor, fresh for every evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorResult {
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub score: f64,
    pub basis: String,
    pub recommendation: String,
    pub category: FactorCategory,
    pub signal: Option<FactorSignal>,
    /// True when the score is the failure default rather than a measurement
    pub failed: bool,
}

impl FactorResult {
    pub fn has_recommendation(&self) -> bool {
        !self.recommendation.is_empty()
    }
}
