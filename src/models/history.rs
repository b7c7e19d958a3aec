use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::HealthStatus;

/// One recorded evaluation of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub health_score: f64,
    /// Status implied by the score alone
    pub raw_status: HealthStatus,
    /// Status published after debouncing; the debouncer's last stable state
    pub published_status: HealthStatus,
    /// False when the evaluation behind this sample failed
    pub success: bool,
}

impl HistoryEntry {
    /// Entry whose published status equals its raw status
    pub fn raw(timestamp: DateTime<Utc>, health_score: f64, raw_status: HealthStatus) -> Self {
        Self {
            timestamp,
            health_score,
            raw_status,
            published_status: raw_status,
            success: true,
        }
    }

    pub fn point(&self) -> HistoryPoint {
        HistoryPoint {
            value: self.health_score,
            timestamp: self.timestamp,
        }
    }
}

/// Read-only time-series point returned by the history query API
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}
