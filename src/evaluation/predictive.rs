//! # Predictive Analysis
//!
//! Projects where health is heading from the overall score, the trend and the recognized
//! anomalies: a forecast, a risk level and, when degrading, an estimated failure time.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::PredictionConfig;
use crate::constants::{Forecast, RiskLevel, TrendDirection};
use crate::models::{AnomalyPattern, PredictiveResult, TrendResult};

#[derive(Debug, Clone)]
pub struct PredictiveAnalyzer {
    config: PredictionConfig,
}

impl PredictiveAnalyzer {
    pub fn new(config: PredictionConfig) -> Self {
        Self { config }
    }

    pub fn predict(
        &self,
        overall_score: f64,
        trend: Option<&TrendResult>,
        anomalies: &[AnomalyPattern],
        now: DateTime<Utc>,
    ) -> PredictiveResult {
        let direction = trend.map_or(TrendDirection::Stable, |t| t.direction);
        let forecast = match direction {
            TrendDirection::Down => Forecast::Degrading,
            TrendDirection::Up => Forecast::Improving,
            TrendDirection::Stable if overall_score < self.config.medium_risk_min_score => {
                Forecast::Degrading
            }
            TrendDirection::Stable => Forecast::Stable,
        };

        let mut risk_level = self.base_risk(overall_score);
        if trend.is_some_and(|t| t.is_rapid_decline) {
            risk_level = risk_level.max(RiskLevel::High);
        }

        let critical_anomalies = anomalies.iter().filter(|a| self.is_critical(a)).count();
        if critical_anomalies > 0 {
            risk_level = RiskLevel::Critical;
        }

        let predicted_failure_time = (forecast == Forecast::Degrading).then(|| {
            let decline = trend.map_or(0.0, |t| t.decline_rate_per_minute);
            self.failure_time(overall_score, decline, now)
        });

        let confidence = (self.config.base_confidence
            + self.config.confidence_step * critical_anomalies as f64)
            .min(self.config.max_confidence);

        debug!(
            forecast = ?forecast,
            risk_level = ?risk_level,
            critical_anomalies = critical_anomalies,
            "🔮 Prediction computed"
        );

        PredictiveResult {
            forecast,
            risk_level,
            predicted_failure_time,
            confidence,
        }
    }

    fn base_risk(&self, overall_score: f64) -> RiskLevel {
        if overall_score >= self.config.low_risk_min_score {
            RiskLevel::Low
        } else if overall_score >= self.config.medium_risk_min_score {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    fn is_critical(&self, anomaly: &AnomalyPattern) -> bool {
        anomaly.confidence > self.config.critical_confidence
            || self.config.critical_types.contains(&anomaly.anomaly_type)
    }

    /// `now + score / max(decline, min_rate)` minutes, capped at the configured horizon
    fn failure_time(&self, overall_score: f64, decline_per_minute: f64, now: DateTime<Utc>) -> DateTime<Utc> {
        let rate = decline_per_minute.max(self.config.min_decline_rate).max(f64::EPSILON);
        let horizon_minutes = (self.config.max_horizon_hours.max(0) * 60) as f64;
        let minutes = (overall_score.max(0.0) / rate).min(horizon_minutes);
        now + Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }
}
