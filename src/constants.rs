//! # System Constants
//!
//! Core enums and constants shared by every stage of the evaluation pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known keys and defaults
pub mod system {
    /// History key used by the orchestrator for the composite score
    pub const OVERALL_HISTORY_KEY: &str = "overall";
    /// Prefix for per-layer sample keys written by the periodic sampler
    pub const LAYER_HISTORY_PREFIX: &str = "layer:";
    pub const DEFAULT_HISTORY_CAPACITY: usize = 20;
    pub const DEFAULT_FACTOR_TIMEOUT_MS: u64 = 5_000;
    pub const DEFAULT_EVALUATION_DEADLINE_MS: u64 = 15_000;
    /// Tolerance used when checking that weights add up
    pub const WEIGHT_TOLERANCE: f64 = 1e-6;
    pub const MAX_SCORE: f64 = 100.0;
    pub const MIN_SCORE: f64 = 0.0;
}

/// Clamp a score into `[0, 100]`, mapping NaN to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return system::MIN_SCORE;
    }
    score.clamp(system::MIN_SCORE, system::MAX_SCORE)
}

/// Published health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Check if this status should page someone
    pub fn is_problematic(&self) -> bool {
        matches!(self, HealthStatus::Warning | HealthStatus::Critical)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Self::Healthy),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid health status: {s}")),
        }
    }
}

/// Application tier being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Client,
    Service,
    Storage,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Client, Layer::Service, Layer::Storage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Client => "client",
            Layer::Service => "service",
            Layer::Storage => "storage",
        }
    }

    /// History key used for per-layer samples
    pub fn history_key(&self) -> String {
        format!("{}{}", system::LAYER_HISTORY_PREFIX, self.as_str())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "service" => Ok(Self::Service),
            "storage" => Ok(Self::Storage),
            _ => Err(format!("Invalid layer: {s}")),
        }
    }
}

/// Known composite failure signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    AvalanchePrecursor,
    DeadlockBlocking,
    MemoryLeak,
    DependencyFailure,
    RapidDegradation,
}

impl AnomalyType {
    pub const ALL: [AnomalyType; 5] = [
        AnomalyType::AvalanchePrecursor,
        AnomalyType::DeadlockBlocking,
        AnomalyType::MemoryLeak,
        AnomalyType::DependencyFailure,
        AnomalyType::RapidDegradation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::AvalanchePrecursor => "avalanche_precursor",
            AnomalyType::DeadlockBlocking => "deadlock_blocking",
            AnomalyType::MemoryLeak => "memory_leak",
            AnomalyType::DependencyFailure => "dependency_failure",
            AnomalyType::RapidDegradation => "rapid_degradation",
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Forecast {
    Stable,
    Improving,
    Degrading,
}

/// Risk level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Blast-radius level of a degraded dependency node, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    None,
    Medium,
    High,
    Critical,
}

/// Alert severity handed to the alert emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Minor,
    Major,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
            Self::Critical => write!(f, "critical"),
        }
    }
}
