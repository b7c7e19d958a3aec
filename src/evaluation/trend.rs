//! # Trend Analysis
//!
//! Compares the newer half of recent history against the older half to find direction and
//! rate of change, and turns score dispersion into a stability index.

use crate::config::TrendConfig;
use crate::constants::{clamp_score, TrendDirection};
use crate::models::{HistoryEntry, TrendResult};

#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Analyze `history` (oldest first); only the newest `window` entries are used
    pub fn analyze(&self, history: &[HistoryEntry]) -> TrendResult {
        let start = history.len().saturating_sub(self.config.window.max(2));
        let window = &history[start..];
        let scores: Vec<f64> = window.iter().map(|e| e.health_score).collect();
        let current_score = scores.last().copied().unwrap_or(0.0);

        if window.len() < 2 {
            return TrendResult::neutral(current_score, scores);
        }

        let recent_len = window.len() / 2;
        let (older, recent) = window.split_at(window.len() - recent_len);
        let difference = mean(recent.iter().map(|e| e.health_score))
            - mean(older.iter().map(|e| e.health_score));

        let direction = if difference > self.config.direction_threshold {
            TrendDirection::Up
        } else if difference < -self.config.direction_threshold {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };

        let minutes = self.minutes_between(window, older.len());
        let change_rate_per_minute = difference / minutes;
        let decline_rate_per_minute = (-change_rate_per_minute).max(0.0);

        TrendResult {
            current_score,
            direction,
            change_rate_per_minute,
            decline_rate_per_minute,
            is_rapid_decline: decline_rate_per_minute > self.config.rapid_decline_per_minute,
            stability_index: self.stability_index(&scores),
            sample_count: scores.len(),
            historical_scores: scores,
        }
    }

    /// `max(0, 100 - penalty * population stddev)`
    pub fn stability_index(&self, scores: &[f64]) -> f64 {
        if scores.len() < 2 {
            return 100.0;
        }
        let avg = mean(scores.iter().copied());
        let variance = mean(scores.iter().map(|s| (s - avg).powi(2)));
        clamp_score(100.0 - self.config.stddev_penalty * variance.sqrt())
    }

    /// Minutes between the mean timestamps of the two halves
    ///
    /// Falls back to the configured sampling interval times the mean index distance when the
    /// timestamps do not move forward.
    fn minutes_between(&self, window: &[HistoryEntry], older_len: usize) -> f64 {
        let origin = window[0].timestamp;
        let offset_minutes =
            |e: &HistoryEntry| (e.timestamp - origin).num_milliseconds() as f64 / 60_000.0;
        let from_timestamps = mean(window[older_len..].iter().map(offset_minutes))
            - mean(window[..older_len].iter().map(offset_minutes));
        if from_timestamps.is_finite() && from_timestamps > 0.0 {
            return from_timestamps;
        }

        let recent_len = window.len() - older_len;
        let index_distance =
            (older_len as f64 + (recent_len as f64 - 1.0) / 2.0) - (older_len as f64 - 1.0) / 2.0;
        (index_distance * self.config.default_interval_minutes).max(f64::EPSILON)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HealthStatus;
    use chrono::{Duration, Utc};

    fn history(scores: &[f64], spacing_minutes: i64) -> Vec<HistoryEntry> {
        let start = Utc::now() - Duration::minutes(spacing_minutes * scores.len() as i64);
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| {
                HistoryEntry::raw(
                    start + Duration::minutes(spacing_minutes * i as i64),
                    *score,
                    HealthStatus::Healthy,
                )
            })
            .collect()
    }

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::new(TrendConfig::default())
    }

    #[test]
    fn test_short_history_is_neutral() {
        let result = analyzer().analyze(&history(&[72.0], 1));
        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.current_score, 72.0);
        assert_eq!(result.stability_index, 100.0);
        assert!(!result.is_rapid_decline);

        let empty = analyzer().analyze(&[]);
        assert_eq!(empty.sample_count, 0);
    }

    #[test]
    fn test_steep_decline_at_five_minute_spacing() {
        let result = analyzer().analyze(&history(&[95.0, 80.0, 65.0, 50.0, 40.0], 5));
        assert_eq!(result.direction, TrendDirection::Down);
        // halves: [95, 80, 65] vs [50, 40], 35 points over 12.5 minutes
        assert!((result.decline_rate_per_minute - 2.8).abs() < 1e-6);
        assert!(result.is_rapid_decline);
        assert_eq!(result.current_score, 40.0);
        assert_eq!(result.stability_index, 0.0);
    }

    #[test]
    fn test_slow_decline_is_not_rapid() {
        let result = analyzer().analyze(&history(&[90.0, 88.0, 85.0, 82.0], 10));
        assert_eq!(result.direction, TrendDirection::Down);
        assert!(!result.is_rapid_decline);
    }

    #[test]
    fn test_flat_history_is_stable_and_fully_stable() {
        let result = analyzer().analyze(&history(&[90.0; 6], 1));
        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.change_rate_per_minute, 0.0);
        assert_eq!(result.stability_index, 100.0);
    }

    #[test]
    fn test_rising_scores_trend_up() {
        let result = analyzer().analyze(&history(&[50.0, 60.0, 70.0, 80.0], 1));
        assert_eq!(result.direction, TrendDirection::Up);
        assert!(result.change_rate_per_minute > 0.0);
        assert_eq!(result.decline_rate_per_minute, 0.0);
    }

    #[test]
    fn test_identical_timestamps_use_default_interval() {
        let now = Utc::now();
        let entries: Vec<HistoryEntry> = [90.0, 90.0, 80.0, 80.0]
            .iter()
            .map(|s| HistoryEntry::raw(now, *s, HealthStatus::Healthy))
            .collect();
        let result = analyzer().analyze(&entries);
        // 10 points over 2 sample intervals of one minute each
        assert!((result.decline_rate_per_minute - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_limits_samples() {
        let scores: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let result = analyzer().analyze(&history(&scores, 1));
        assert_eq!(result.sample_count, 10);
        assert_eq!(result.historical_scores.first(), Some(&10.0));
    }

    #[test]
    fn test_stability_index_penalizes_dispersion() {
        // population stddev of [80, 90] is 5
        assert!((analyzer().stability_index(&[80.0, 90.0]) - 50.0).abs() < 1e-9);
    }
}
