//! # Alert Dispatch
//!
//! Sends one alert per issue to the configured [`AlertEmitter`]. Anomaly-driven issues are
//! rate limited per component and anomaly type: the first alert fires once the anomaly has
//! persisted for `anomaly_min_occurrences` consecutive evaluations, then again every
//! `anomaly_repeat_every` occurrences, and the counter resets as soon as the anomaly clears.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::AlertConfig;
use crate::constants::{AlertLevel, AnomalyType};
use crate::integration::{AlertEmitter, AlertRequest};
use crate::models::HealthIssue;

/// What happened to the issues of one evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
}

pub struct AlertDispatcher {
    config: AlertConfig,
    emitter: Option<Arc<dyn AlertEmitter>>,
    anomaly_counters: DashMap<String, u32>,
    delivery_failures: AtomicU64,
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("enabled", &self.config.enabled)
            .field("has_emitter", &self.emitter.is_some())
            .field("tracked_anomalies", &self.anomaly_counters.len())
            .finish()
    }
}

impl AlertDispatcher {
    pub fn new(config: AlertConfig, emitter: Option<Arc<dyn AlertEmitter>>) -> Self {
        Self {
            config,
            emitter,
            anomaly_counters: DashMap::new(),
            delivery_failures: AtomicU64::new(0),
        }
    }

    pub fn classify(&self, score: f64) -> AlertLevel {
        if score < self.config.critical_below {
            AlertLevel::Critical
        } else if score < self.config.major_below {
            AlertLevel::Major
        } else {
            AlertLevel::Minor
        }
    }

    /// Total emitter errors and timeouts since construction
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    /// Consecutive evaluations `anomaly_type` has been present for `component`
    pub fn anomaly_streak(&self, component: &str, anomaly_type: AnomalyType) -> u32 {
        self.anomaly_counters
            .get(&counter_key(component, anomaly_type))
            .map_or(0, |c| *c)
    }

    /// Deliver alerts for one evaluation's issues. Never fails; emitter errors are counted.
    pub async fn dispatch(&self, component: &str, issues: &[HealthIssue]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let streaks = self.advance_counters(component, issues);

        let emitter = match (&self.emitter, self.config.enabled) {
            (Some(emitter), true) => emitter,
            _ => return summary,
        };

        for issue in issues {
            if let Some(anomaly_type) = issue.anomaly {
                let streak = streaks
                    .iter()
                    .find(|(t, _)| *t == anomaly_type)
                    .map_or(0, |(_, s)| *s);
                if !self.should_emit(streak) {
                    summary.suppressed += 1;
                    debug!(
                        component = %component,
                        anomaly = %anomaly_type,
                        streak = streak,
                        "🔕 Anomaly alert suppressed by rate limit"
                    );
                    continue;
                }
            }

            let request = self.build_request(component, issue);
            let level = request.level;
            let timeout = self.config.delivery_timeout();
            match tokio::time::timeout(timeout, emitter.create_alert(request)).await {
                Ok(Ok(alert_id)) => {
                    summary.sent += 1;
                    info!(
                        component = %component,
                        alert_id = %alert_id,
                        level = %level,
                        "🚨 Alert created"
                    );
                }
                Ok(Err(err)) => {
                    summary.failed += 1;
                    self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                    error!(component = %component, error = %err, "❌ Alert delivery failed");
                }
                Err(_) => {
                    summary.failed += 1;
                    self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        component = %component,
                        timeout_ms = timeout.as_millis() as u64,
                        "⏰ Alert delivery timed out"
                    );
                }
            }
        }
        summary
    }

    /// Bump streaks for anomalies present in `issues` and reset the rest for `component`
    fn advance_counters(&self, component: &str, issues: &[HealthIssue]) -> Vec<(AnomalyType, u32)> {
        let present: HashSet<AnomalyType> = issues.iter().filter_map(|i| i.anomaly).collect();

        for cleared in AnomalyType::ALL.iter().filter(|t| !present.contains(t)) {
            self.anomaly_counters.remove(&counter_key(component, *cleared));
        }

        present
            .into_iter()
            .map(|anomaly_type| {
                let mut counter = self
                    .anomaly_counters
                    .entry(counter_key(component, anomaly_type))
                    .or_insert(0);
                *counter = counter.saturating_add(1);
                (anomaly_type, *counter)
            })
            .collect()
    }

    fn should_emit(&self, streak: u32) -> bool {
        let first = self.config.anomaly_min_occurrences.max(1);
        let every = self.config.anomaly_repeat_every.max(1);
        streak >= first && (streak - first) % every == 0
    }

    fn build_request(&self, component: &str, issue: &HealthIssue) -> AlertRequest {
        let level = self.classify(issue.score);
        let alert_type = match issue.anomaly {
            Some(anomaly_type) => format!("health_anomaly.{anomaly_type}"),
            None => "health_issue".to_string(),
        };
        AlertRequest {
            alert_type,
            level,
            title: format!("[{level}] {component}: {}", issue.source),
            content: format!("{} (score {})", issue.message, issue.score),
            source: self.config.source.clone(),
        }
    }
}

fn counter_key(component: &str, anomaly_type: AnomalyType) -> String {
    format!("{component}:{anomaly_type}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::RecordingAlertEmitter;

    fn issue(score: f64, anomaly: Option<AnomalyType>) -> HealthIssue {
        HealthIssue {
            source: "storage".to_string(),
            message: "storage layer unreachable".to_string(),
            score,
            anomaly,
        }
    }

    fn dispatcher(config: AlertConfig) -> (AlertDispatcher, RecordingAlertEmitter) {
        let emitter = RecordingAlertEmitter::new();
        let dispatcher = AlertDispatcher::new(config, Some(Arc::new(emitter.clone())));
        (dispatcher, emitter)
    }

    #[test]
    fn test_level_classification() {
        let (dispatcher, _) = dispatcher(AlertConfig::default());
        assert_eq!(dispatcher.classify(10.0), AlertLevel::Critical);
        assert_eq!(dispatcher.classify(40.0), AlertLevel::Major);
        assert_eq!(dispatcher.classify(69.9), AlertLevel::Major);
        assert_eq!(dispatcher.classify(70.0), AlertLevel::Minor);
    }

    #[tokio::test]
    async fn test_one_alert_per_issue() {
        let (dispatcher, emitter) = dispatcher(AlertConfig::default());
        let summary = dispatcher
            .dispatch("overall", &[issue(0.0, None), issue(75.0, None)])
            .await;
        assert_eq!(summary.sent, 2);
        let alerts = emitter.alerts();
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert_eq!(alerts[1].level, AlertLevel::Minor);
        assert_eq!(alerts[0].source, "tierhealth");
        assert_eq!(alerts[0].alert_type, "health_issue");
    }

    #[tokio::test]
    async fn test_anomaly_alerts_are_rate_limited() {
        let config = AlertConfig {
            anomaly_min_occurrences: 2,
            anomaly_repeat_every: 3,
            ..AlertConfig::default()
        };
        let (dispatcher, emitter) = dispatcher(config);
        let anomalous = [issue(0.0, Some(AnomalyType::DependencyFailure))];

        let mut sent = Vec::new();
        for _ in 0..6 {
            sent.push(dispatcher.dispatch("overall", &anomalous).await.sent);
        }
        // streaks 1..=6 emit at 2 and 5
        assert_eq!(sent, vec![0, 1, 0, 0, 1, 0]);
        assert_eq!(emitter.len(), 2);
        assert_eq!(dispatcher.anomaly_streak("overall", AnomalyType::DependencyFailure), 6);

        // Clearing resets the streak
        dispatcher.dispatch("overall", &[]).await;
        assert_eq!(dispatcher.anomaly_streak("overall", AnomalyType::DependencyFailure), 0);
    }

    #[tokio::test]
    async fn test_components_are_tracked_separately() {
        let (dispatcher, _) = dispatcher(AlertConfig::default());
        let anomalous = [issue(0.0, Some(AnomalyType::MemoryLeak))];
        dispatcher.dispatch("a", &anomalous).await;
        dispatcher.dispatch("b", &[]).await;
        assert_eq!(dispatcher.anomaly_streak("a", AnomalyType::MemoryLeak), 1);
    }

    #[tokio::test]
    async fn test_emitter_errors_are_counted_not_propagated() {
        let (dispatcher, emitter) = dispatcher(AlertConfig::default());
        emitter.fail_with("pager offline");
        let summary = dispatcher.dispatch("overall", &[issue(10.0, None)]).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(dispatcher.delivery_failures(), 1);
    }

    #[tokio::test]
    async fn test_stuck_emitter_times_out() {
        let config = AlertConfig {
            delivery_timeout_ms: 20,
            ..AlertConfig::default()
        };
        let (dispatcher, emitter) = dispatcher(config);
        emitter.hang();

        let summary = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            dispatcher.dispatch("overall", &[issue(10.0, None), issue(50.0, None)]),
        )
        .await
        .expect("dispatch must not wait on a stuck emitter");

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.sent, 0);
        assert_eq!(dispatcher.delivery_failures(), 2);
    }

    #[tokio::test]
    async fn test_disabled_alerts_send_nothing() {
        let config = AlertConfig {
            enabled: false,
            ..AlertConfig::default()
        };
        let (dispatcher, emitter) = dispatcher(config);
        let summary = dispatcher.dispatch("overall", &[issue(0.0, None)]).await;
        assert_eq!(summary, DispatchSummary::default());
        assert!(emitter.is_empty());
    }
}
