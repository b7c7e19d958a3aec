//! # Status Debouncer
//!
//! Hysteresis over the published health status. A status only changes when a named
//! [`TransitionRule`] has its full evidence: enough consecutive samples on the far side of the
//! rule's threshold, or (healthy only) a sustained failure rate. Otherwise the last stable
//! status is held, whatever the latest raw score says.

use chrono::Duration;
use tracing::{debug, info};

use super::transitions::TransitionRule;
use crate::config::{DebounceConfig, StatusThresholds};
use crate::constants::HealthStatus;
use crate::models::{DebounceConfidence, DebounceOutcome, HistoryEntry};

/// Samples considered when computing the debouncer's stability index
const STABILITY_WINDOW: usize = 10;

#[derive(Debug, Clone)]
pub struct StateDebouncer {
    config: DebounceConfig,
    thresholds: StatusThresholds,
}

impl StateDebouncer {
    pub fn new(config: DebounceConfig, thresholds: StatusThresholds) -> Self {
        Self { config, thresholds }
    }

    pub fn raw_status(&self, score: f64) -> HealthStatus {
        self.thresholds.classify(score)
    }

    /// Decide the published status for the newest entry of `history` (oldest first)
    ///
    /// The previous stable status is the `published_status` of the entry before the newest;
    /// the newest entry's own `published_status` is ignored.
    pub fn apply(&self, history: &[HistoryEntry]) -> DebounceOutcome {
        let Some(latest) = history.last() else {
            return DebounceOutcome {
                current_status: HealthStatus::Healthy,
                previous_status: HealthStatus::Healthy,
                raw_status: HealthStatus::Healthy,
                stability_index: 100.0,
                reason: "no samples recorded yet".to_string(),
                consecutive_stable_checks: 0,
                confidence: DebounceConfidence::Low,
                transitioned: false,
            };
        };

        let raw_status = self.raw_status(latest.health_score);
        let previous_status = history
            .len()
            .checked_sub(2)
            .map_or(raw_status, |i| history[i].published_status);

        if history.len() < self.config.min_samples {
            return self.outcome(
                history,
                raw_status,
                previous_status,
                raw_status,
                format!(
                    "only {} of {} samples available; publishing raw status {}",
                    history.len(),
                    self.config.min_samples,
                    raw_status
                ),
                DebounceConfidence::Low,
            );
        }

        for rule in TransitionRule::leaving(previous_status) {
            if let Some(reason) = self.rule_satisfied(*rule, history) {
                info!(
                    transition = %rule,
                    score = latest.health_score,
                    reason = %reason,
                    "🔀 Published health status changed"
                );
                return self.outcome(
                    history,
                    rule.to_status(),
                    previous_status,
                    raw_status,
                    reason,
                    DebounceConfidence::Normal,
                );
            }
        }

        let reason = match TransitionRule::towards(previous_status, raw_status) {
            Some(rule) => {
                let have = rule.consecutive_matches(history, &self.config, &self.thresholds);
                debug!(
                    transition = %rule,
                    consecutive = have,
                    required = rule.required_consecutive(&self.config),
                    "🛑 Holding status: transition evidence incomplete"
                );
                format!(
                    "insufficient consecutive evidence for {}: {} of {} samples {}; holding {}",
                    rule,
                    have,
                    rule.required_consecutive(&self.config),
                    rule.evidence(&self.config, &self.thresholds),
                    previous_status
                )
            }
            None => format!("raw status matches published status {previous_status}"),
        };

        self.outcome(
            history,
            previous_status,
            previous_status,
            raw_status,
            reason,
            DebounceConfidence::Normal,
        )
    }

    fn rule_satisfied(&self, rule: TransitionRule, history: &[HistoryEntry]) -> Option<String> {
        let required = rule.required_consecutive(&self.config).max(1);
        let consecutive = rule.consecutive_matches(history, &self.config, &self.thresholds);
        if consecutive >= required {
            return Some(format!(
                "{rule}: {consecutive} consecutive samples {}",
                rule.evidence(&self.config, &self.thresholds)
            ));
        }

        if rule == TransitionRule::HealthyToWarning {
            let (failures, samples) = self.failure_rate(history);
            if samples >= self.config.failure_rate_min_samples.max(1) {
                let rate = failures as f64 / samples as f64;
                if rate > self.config.failure_rate_threshold {
                    return Some(format!(
                        "{rule}: failure rate {:.0}% over {samples} samples in the last {}s",
                        rate * 100.0,
                        self.config.failure_rate_window_seconds
                    ));
                }
            }
        }
        None
    }

    /// `(failures, samples)` inside the failure-rate window ending at the newest sample
    fn failure_rate(&self, history: &[HistoryEntry]) -> (usize, usize) {
        let Some(latest) = history.last() else {
            return (0, 0);
        };
        let window = i64::try_from(self.config.failure_rate_window_seconds).unwrap_or(i64::MAX);
        let since = latest.timestamp - Duration::seconds(window.min(i64::MAX / 1_000));
        history
            .iter()
            .filter(|e| e.timestamp >= since)
            .fold((0, 0), |(failures, samples), e| {
                let failed = !e.success || self.raw_status(e.health_score) == HealthStatus::Critical;
                (failures + usize::from(failed), samples + 1)
            })
    }

    fn outcome(
        &self,
        history: &[HistoryEntry],
        current_status: HealthStatus,
        previous_status: HealthStatus,
        raw_status: HealthStatus,
        reason: String,
        confidence: DebounceConfidence,
    ) -> DebounceOutcome {
        let consecutive_stable_checks = history
            .iter()
            .rev()
            .take_while(|e| self.raw_status(e.health_score) == current_status)
            .count();

        let recent: Vec<&HistoryEntry> = history.iter().rev().take(STABILITY_WINDOW).collect();
        let agreeing = recent
            .iter()
            .filter(|e| self.raw_status(e.health_score) == current_status)
            .count();
        let stability_index = if recent.is_empty() {
            100.0
        } else {
            (agreeing as f64 / recent.len() as f64 * 100.0).round()
        };

        DebounceOutcome {
            current_status,
            previous_status,
            raw_status,
            stability_index,
            reason,
            consecutive_stable_checks,
            confidence,
            transitioned: current_status != previous_status,
        }
    }
}
