//! # Scoring Configuration
//!
//! Every threshold, weight and count used by the evaluation pipeline lives here, loaded once
//! at startup and shared by reference. All sections carry defaults, so a configuration file
//! only needs to contain the values it overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tierhealth_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let capacity = manager.config().history.capacity;
//! let deadline = manager.config().timeouts.evaluation_deadline();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod factor_catalog;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{system, AnomalyType, HealthStatus, Layer};
use crate::evaluation::curve::ScoringCurve;
use crate::models::{FactorCategory, FactorSignal};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration for the evaluation engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ScoringConfig {
    pub history: HistoryConfig,
    pub timeouts: TimeoutConfig,
    pub status: StatusThresholds,
    pub debounce: DebounceConfig,
    pub dynamic_weights: DynamicWeightConfig,
    pub trend: TrendConfig,
    pub anomaly: AnomalyConfig,
    pub prediction: PredictionConfig,
    pub dependency: DependencyConfig,
    pub layers: LayersConfig,
    pub alerts: AlertConfig,
    pub sampler: SamplerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Ring buffer capacity per component key
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: system::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on a single metric read
    pub factor_fetch_ms: u64,
    /// Bound on the whole layer fan-out of one evaluation
    pub evaluation_deadline_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            factor_fetch_ms: system::DEFAULT_FACTOR_TIMEOUT_MS,
            evaluation_deadline_ms: system::DEFAULT_EVALUATION_DEADLINE_MS,
        }
    }
}

impl TimeoutConfig {
    pub fn factor_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.factor_fetch_ms)
    }

    pub fn evaluation_deadline(&self) -> Duration {
        Duration::from_millis(self.evaluation_deadline_ms)
    }
}

/// Score boundaries for the instantaneous (raw) status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusThresholds {
    /// Scores at or above this are healthy
    pub healthy: f64,
    /// Scores below this are critical
    pub critical: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            healthy: 80.0,
            critical: 60.0,
        }
    }
}

impl StatusThresholds {
    pub fn classify(&self, score: f64) -> HealthStatus {
        if score >= self.healthy {
            HealthStatus::Healthy
        } else if score >= self.critical {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

/// Evidence required by each debouncer transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebounceConfig {
    /// Below this many samples the raw status is reported with low confidence
    pub min_samples: usize,
    pub healthy_to_warning_consecutive: usize,
    pub warning_to_critical_consecutive: usize,
    pub critical_to_warning_consecutive: usize,
    pub warning_to_healthy_consecutive: usize,
    /// Samples at or above this count towards critical -> warning
    pub recovery_threshold: f64,
    /// Samples at or above this count towards warning -> healthy
    pub fully_healthy_threshold: f64,
    /// Failure ratio inside the window that forces healthy -> warning
    pub failure_rate_threshold: f64,
    pub failure_rate_window_seconds: u64,
    /// The failure-rate rule is ignored with fewer samples than this in the window
    pub failure_rate_min_samples: usize,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            healthy_to_warning_consecutive: 3,
            warning_to_critical_consecutive: 5,
            critical_to_warning_consecutive: 10,
            warning_to_healthy_consecutive: 15,
            recovery_threshold: 60.0,
            fully_healthy_threshold: 85.0,
            failure_rate_threshold: 0.3,
            failure_rate_window_seconds: 300,
            failure_rate_min_samples: 10,
        }
    }
}

/// Performance/business split
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeightSplit {
    pub performance: f64,
    pub business: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DynamicWeightConfig {
    /// Metric id read from the metric source to measure current load
    pub load_metric: String,
    pub peak_load_reference: f64,
    /// Fraction of the peak above which the high-load split applies
    pub high_load_ratio: f64,
    pub default_split: WeightSplit,
    pub high_load_split: WeightSplit,
}

impl Default for DynamicWeightConfig {
    fn default() -> Self {
        Self {
            load_metric: "request_rate".to_string(),
            peak_load_reference: 1000.0,
            high_load_ratio: 0.8,
            default_split: WeightSplit {
                performance: 0.3,
                business: 0.7,
            },
            high_load_split: WeightSplit {
                performance: 0.4,
                business: 0.6,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of newest history entries analyzed
    pub window: usize,
    /// Mean difference (points) below which the direction is stable
    pub direction_threshold: f64,
    pub rapid_decline_per_minute: f64,
    /// Sampling interval assumed when timestamps cannot be used
    pub default_interval_minutes: f64,
    /// Stability index penalty per point of standard deviation
    pub stddev_penalty: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 10,
            direction_threshold: 2.0,
            rapid_decline_per_minute: 2.0,
            default_interval_minutes: 1.0,
            stddev_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Layer whose score represents business-facing health
    pub business_layer: Layer,
    pub business_score_threshold: f64,
    pub latency_threshold: f64,
    pub error_rate_threshold: f64,
    pub dependency_threshold: f64,
    pub concurrency_threshold: f64,
    /// Memory score at or above this while concurrency is starved reads as blocked work
    pub memory_busy_idle_threshold: f64,
    pub memory_leak_threshold: f64,
    pub gc_pressure_threshold: f64,
    pub avalanche_confidence: f64,
    pub deadlock_confidence: f64,
    pub memory_leak_confidence: f64,
    /// Added to avalanche confidence when the trend shows a rapid decline
    pub rapid_decline_boost: f64,
    /// Added to memory-leak confidence when the trend points down
    pub downtrend_boost: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            business_layer: Layer::Client,
            business_score_threshold: 60.0,
            latency_threshold: 50.0,
            error_rate_threshold: 50.0,
            dependency_threshold: 50.0,
            concurrency_threshold: 40.0,
            memory_busy_idle_threshold: 70.0,
            memory_leak_threshold: 50.0,
            gc_pressure_threshold: 50.0,
            avalanche_confidence: 0.7,
            deadlock_confidence: 0.75,
            memory_leak_confidence: 0.8,
            rapid_decline_boost: 0.15,
            downtrend_boost: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PredictionConfig {
    pub low_risk_min_score: f64,
    pub medium_risk_min_score: f64,
    /// Any anomaly above this confidence escalates risk to critical
    pub critical_confidence: f64,
    pub critical_types: Vec<AnomalyType>,
    pub base_confidence: f64,
    pub confidence_step: f64,
    pub max_confidence: f64,
    /// Floor applied to the decline rate when projecting time to failure
    pub min_decline_rate: f64,
    pub max_horizon_hours: i64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            low_risk_min_score: 90.0,
            medium_risk_min_score: 70.0,
            critical_confidence: 0.8,
            critical_types: vec![
                AnomalyType::AvalanchePrecursor,
                AnomalyType::DeadlockBlocking,
                AnomalyType::DependencyFailure,
            ],
            base_confidence: 0.6,
            confidence_step: 0.1,
            max_confidence: 0.95,
            min_decline_rate: 0.1,
            max_horizon_hours: 168,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyNodeConfig {
    pub layer: Layer,
    /// Share of the overall score (all nodes sum to 1.0)
    pub weight: f64,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DependencyConfig {
    /// Nodes scoring below this are reported as impacted
    pub impact_threshold: f64,
    pub critical_below: f64,
    pub high_below: f64,
    pub nodes: Vec<DependencyNodeConfig>,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        let caps = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            impact_threshold: 70.0,
            critical_below: 50.0,
            high_below: 70.0,
            nodes: vec![
                DependencyNodeConfig {
                    layer: Layer::Client,
                    weight: 0.3,
                    capabilities: caps(&["page_rendering", "user_interaction", "session_management"]),
                },
                DependencyNodeConfig {
                    layer: Layer::Service,
                    weight: 0.4,
                    capabilities: caps(&[
                        "order_processing",
                        "search",
                        "authentication",
                        "notifications",
                    ]),
                },
                DependencyNodeConfig {
                    layer: Layer::Storage,
                    weight: 0.3,
                    capabilities: caps(&["data_persistence", "reporting", "caching"]),
                },
            ],
        }
    }
}

/// One configured factor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorSpec {
    pub id: String,
    pub name: String,
    /// Share of the layer score in percent
    pub weight: f64,
    pub category: FactorCategory,
    #[serde(default)]
    pub signal: Option<FactorSignal>,
    #[serde(default)]
    pub unit: String,
    pub curve: ScoringCurve,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerConfig {
    /// Rescale performance/business shares using the dynamic weights
    pub dynamic_weighting: bool,
    /// Score substituted for a factor whose reading could not be obtained
    pub failure_score: f64,
    pub factors: Vec<FactorSpec>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            dynamic_weighting: false,
            failure_score: 0.0,
            factors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayersConfig {
    pub client: LayerConfig,
    pub service: LayerConfig,
    pub storage: LayerConfig,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            client: LayerConfig {
                factors: factor_catalog::client_factors(),
                ..LayerConfig::default()
            },
            service: LayerConfig {
                dynamic_weighting: true,
                factors: factor_catalog::service_factors(),
                ..LayerConfig::default()
            },
            storage: LayerConfig {
                factors: factor_catalog::storage_factors(),
                ..LayerConfig::default()
            },
        }
    }
}

impl LayersConfig {
    pub fn get(&self, layer: Layer) -> &LayerConfig {
        match layer {
            Layer::Client => &self.client,
            Layer::Service => &self.service,
            Layer::Storage => &self.storage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Issue scores below this raise critical alerts
    pub critical_below: f64,
    /// Issue scores below this raise major alerts; anything else is minor
    pub major_below: f64,
    /// Consecutive evaluations an anomaly must persist before it alerts
    pub anomaly_min_occurrences: u32,
    /// After the first alert, re-alert every N occurrences
    pub anomaly_repeat_every: u32,
    pub source: String,
    /// Bound on a single `create_alert` call
    pub delivery_timeout_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_below: 40.0,
            major_below: 70.0,
            anomaly_min_occurrences: 1,
            anomaly_repeat_every: 10,
            source: "tierhealth".to_string(),
            delivery_timeout_ms: 5_000,
        }
    }
}

impl AlertConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 60,
        }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

fn check_unit_interval(field: &str, value: f64) -> ConfigResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigurationError::invalid_value(
            field,
            value.to_string(),
            "must be within [0, 1]",
        ));
    }
    Ok(())
}

fn check_positive(field: &str, value: usize) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigurationError::invalid_value(
            field,
            "0",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn check_within_capacity(field: &str, value: usize, capacity: usize) -> ConfigResult<()> {
    if value > capacity {
        return Err(ConfigurationError::invalid_value(
            field,
            value.to_string(),
            format!("must not exceed history.capacity ({capacity})"),
        ));
    }
    Ok(())
}

fn check_split(field: &str, split: &WeightSplit) -> ConfigResult<()> {
    check_unit_interval(&format!("{field}.performance"), split.performance)?;
    check_unit_interval(&format!("{field}.business"), split.business)?;
    let sum = split.performance + split.business;
    if (sum - 1.0).abs() > system::WEIGHT_TOLERANCE {
        return Err(ConfigurationError::weight_sum_mismatch(field, 1.0, sum));
    }
    Ok(())
}

impl ScoringConfig {
    /// Validate cross-field invariants
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("history.capacity", self.history.capacity)?;

        if self.timeouts.factor_fetch_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "timeouts.factor_fetch_ms",
                "0",
                "must be greater than 0",
            ));
        }
        // A deadline below the fetch timeout is allowed: it cuts slow layers short
        if self.timeouts.evaluation_deadline_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "timeouts.evaluation_deadline_ms",
                "0",
                "must be greater than 0",
            ));
        }

        for (field, value) in [
            ("status.healthy", self.status.healthy),
            ("status.critical", self.status.critical),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value.to_string(),
                    "must be within 0..=100",
                ));
            }
        }
        if self.status.critical >= self.status.healthy {
            return Err(ConfigurationError::invalid_value(
                "status.critical",
                self.status.critical.to_string(),
                "must be below status.healthy",
            ));
        }

        let d = &self.debounce;
        check_positive("debounce.min_samples", d.min_samples)?;
        check_positive(
            "debounce.healthy_to_warning_consecutive",
            d.healthy_to_warning_consecutive,
        )?;
        check_positive(
            "debounce.warning_to_critical_consecutive",
            d.warning_to_critical_consecutive,
        )?;
        check_positive(
            "debounce.critical_to_warning_consecutive",
            d.critical_to_warning_consecutive,
        )?;
        check_positive(
            "debounce.warning_to_healthy_consecutive",
            d.warning_to_healthy_consecutive,
        )?;
        check_unit_interval("debounce.failure_rate_threshold", d.failure_rate_threshold)?;
        // The debouncer never sees more than `history.capacity` stored samples
        for (field, count) in [
            ("debounce.min_samples", d.min_samples),
            ("debounce.healthy_to_warning_consecutive", d.healthy_to_warning_consecutive),
            ("debounce.warning_to_critical_consecutive", d.warning_to_critical_consecutive),
            ("debounce.critical_to_warning_consecutive", d.critical_to_warning_consecutive),
            ("debounce.warning_to_healthy_consecutive", d.warning_to_healthy_consecutive),
            ("debounce.failure_rate_min_samples", d.failure_rate_min_samples),
        ] {
            check_within_capacity(field, count, self.history.capacity)?;
        }
        if d.recovery_threshold > d.fully_healthy_threshold {
            return Err(ConfigurationError::invalid_value(
                "debounce.recovery_threshold",
                d.recovery_threshold.to_string(),
                "must not exceed debounce.fully_healthy_threshold",
            ));
        }

        check_split("dynamic_weights.default_split", &self.dynamic_weights.default_split)?;
        check_split(
            "dynamic_weights.high_load_split",
            &self.dynamic_weights.high_load_split,
        )?;
        check_unit_interval("dynamic_weights.high_load_ratio", self.dynamic_weights.high_load_ratio)?;

        check_positive("trend.window", self.trend.window)?;
        check_within_capacity("trend.window", self.trend.window, self.history.capacity)?;
        if self.trend.default_interval_minutes <= 0.0 {
            return Err(ConfigurationError::invalid_value(
                "trend.default_interval_minutes",
                self.trend.default_interval_minutes.to_string(),
                "must be greater than 0",
            ));
        }

        let p = &self.prediction;
        if p.medium_risk_min_score > p.low_risk_min_score {
            return Err(ConfigurationError::invalid_value(
                "prediction.medium_risk_min_score",
                p.medium_risk_min_score.to_string(),
                "must not exceed prediction.low_risk_min_score",
            ));
        }
        check_unit_interval("prediction.max_confidence", p.max_confidence)?;
        if p.min_decline_rate <= 0.0 {
            return Err(ConfigurationError::invalid_value(
                "prediction.min_decline_rate",
                p.min_decline_rate.to_string(),
                "must be greater than 0",
            ));
        }

        self.validate_dependency_graph()?;
        self.validate_layers()?;

        if self.alerts.critical_below > self.alerts.major_below {
            return Err(ConfigurationError::invalid_value(
                "alerts.critical_below",
                self.alerts.critical_below.to_string(),
                "must not exceed alerts.major_below",
            ));
        }
        if self.alerts.anomaly_repeat_every == 0 {
            return Err(ConfigurationError::invalid_value(
                "alerts.anomaly_repeat_every",
                "0",
                "must be greater than 0",
            ));
        }
        if self.alerts.delivery_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "alerts.delivery_timeout_ms",
                "0",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    fn validate_dependency_graph(&self) -> ConfigResult<()> {
        let nodes = &self.dependency.nodes;
        for layer in Layer::ALL {
            let count = nodes.iter().filter(|n| n.layer == layer).count();
            if count != 1 {
                return Err(ConfigurationError::invalid_value(
                    "dependency.nodes",
                    format!("{count} entries for '{layer}'"),
                    "every layer must appear exactly once",
                ));
            }
        }
        if let Some(node) = nodes.iter().find(|n| n.weight < 0.0) {
            return Err(ConfigurationError::invalid_value(
                format!("dependency.nodes.{}.weight", node.layer),
                node.weight.to_string(),
                "must not be negative",
            ));
        }
        let sum: f64 = nodes.iter().map(|n| n.weight).sum();
        if (sum - 1.0).abs() > system::WEIGHT_TOLERANCE {
            return Err(ConfigurationError::weight_sum_mismatch(
                "dependency.nodes",
                1.0,
                sum,
            ));
        }
        Ok(())
    }

    fn validate_layers(&self) -> ConfigResult<()> {
        for layer in Layer::ALL {
            let layer_config = self.layers.get(layer);
            if layer_config.factors.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    format!("layers.{layer}.factors"),
                    "layer configuration",
                ));
            }
            for factor in &layer_config.factors {
                if factor.id.is_empty() {
                    return Err(ConfigurationError::missing_required_field(
                        format!("layers.{layer}.factors[].id"),
                        "factor configuration",
                    ));
                }
                if !factor.weight.is_finite() || factor.weight < 0.0 {
                    return Err(ConfigurationError::invalid_value(
                        format!("layers.{layer}.factors.{}.weight", factor.id),
                        factor.weight.to_string(),
                        "must be a non-negative number",
                    ));
                }
                factor.curve.validate().map_err(|reason| {
                    ConfigurationError::invalid_value(
                        format!("layers.{layer}.factors.{}.curve", factor.id),
                        format!("{:?}", factor.curve),
                        reason,
                    )
                })?;
            }
            let sum: f64 = layer_config.factors.iter().map(|f| f.weight).sum();
            if sum <= 0.0 {
                return Err(ConfigurationError::weight_sum_mismatch(
                    format!("layers.{layer}.factors"),
                    100.0,
                    sum,
                ));
            }
        }
        Ok(())
    }
}
