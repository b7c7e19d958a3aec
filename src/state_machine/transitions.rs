//! Named transition rules of the status hysteresis machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{DebounceConfig, StatusThresholds};
use crate::constants::HealthStatus;
use crate::models::HistoryEntry;

/// Which side of the rule's threshold counts as evidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evidence {
    Below(f64),
    AtOrAbove(f64),
}

impl Evidence {
    pub fn matches(&self, score: f64) -> bool {
        match *self {
            Evidence::Below(threshold) => score < threshold,
            Evidence::AtOrAbove(threshold) => score >= threshold,
        }
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Below(threshold) => write!(f, "below {threshold}"),
            Evidence::AtOrAbove(threshold) => write!(f, "at or above {threshold}"),
        }
    }
}

/// The only status changes the debouncer can make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRule {
    HealthyToWarning,
    WarningToCritical,
    CriticalToWarning,
    WarningToHealthy,
}

impl TransitionRule {
    pub fn from_status(&self) -> HealthStatus {
        match self {
            Self::HealthyToWarning => HealthStatus::Healthy,
            Self::WarningToCritical | Self::WarningToHealthy => HealthStatus::Warning,
            Self::CriticalToWarning => HealthStatus::Critical,
        }
    }

    pub fn to_status(&self) -> HealthStatus {
        match self {
            Self::HealthyToWarning | Self::CriticalToWarning => HealthStatus::Warning,
            Self::WarningToCritical => HealthStatus::Critical,
            Self::WarningToHealthy => HealthStatus::Healthy,
        }
    }

    /// Rules leaving `status`, degradation first
    pub fn leaving(status: HealthStatus) -> &'static [TransitionRule] {
        match status {
            HealthStatus::Healthy => &[Self::HealthyToWarning],
            HealthStatus::Warning => &[Self::WarningToCritical, Self::WarningToHealthy],
            HealthStatus::Critical => &[Self::CriticalToWarning],
        }
    }

    /// Rule that would move `from` towards `raw`, if any
    pub fn towards(from: HealthStatus, raw: HealthStatus) -> Option<TransitionRule> {
        match (from, raw) {
            (HealthStatus::Healthy, HealthStatus::Warning | HealthStatus::Critical) => {
                Some(Self::HealthyToWarning)
            }
            (HealthStatus::Warning, HealthStatus::Critical) => Some(Self::WarningToCritical),
            (HealthStatus::Warning, HealthStatus::Healthy) => Some(Self::WarningToHealthy),
            (HealthStatus::Critical, HealthStatus::Warning | HealthStatus::Healthy) => {
                Some(Self::CriticalToWarning)
            }
            _ => None,
        }
    }

    pub fn required_consecutive(&self, config: &DebounceConfig) -> usize {
        match self {
            Self::HealthyToWarning => config.healthy_to_warning_consecutive,
            Self::WarningToCritical => config.warning_to_critical_consecutive,
            Self::CriticalToWarning => config.critical_to_warning_consecutive,
            Self::WarningToHealthy => config.warning_to_healthy_consecutive,
        }
    }

    pub fn evidence(&self, config: &DebounceConfig, thresholds: &StatusThresholds) -> Evidence {
        match self {
            Self::HealthyToWarning => Evidence::Below(thresholds.healthy),
            Self::WarningToCritical => Evidence::Below(thresholds.critical),
            Self::CriticalToWarning => Evidence::AtOrAbove(config.recovery_threshold),
            Self::WarningToHealthy => Evidence::AtOrAbove(config.fully_healthy_threshold),
        }
    }

    /// Newest samples in a row satisfying this rule's evidence
    pub fn consecutive_matches(
        &self,
        history: &[HistoryEntry],
        config: &DebounceConfig,
        thresholds: &StatusThresholds,
    ) -> usize {
        let evidence = self.evidence(config, thresholds);
        history
            .iter()
            .rev()
            .take_while(|e| evidence.matches(e.health_score))
            .count()
    }
}

impl fmt::Display for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from_status(), self.to_status())
    }
}
