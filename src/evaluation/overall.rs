//! # Overall Evaluator
//!
//! Orchestrates one full health evaluation: dynamic weights, concurrent layer fan-out under a
//! deadline, dependency-weighted combination, debouncing under the history lock, then trend,
//! anomaly, prediction and impact analysis, issues, recommendations and alert dispatch.
//!
//! `evaluate` never fails. Anything that prevents assembling a result becomes an unsuccessful
//! [`EvaluationResult`] with status `critical` and score 0.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tierhealth_core::config::ScoringConfig;
//! use tierhealth_core::evaluation::OverallEvaluator;
//! use tierhealth_core::integration::StaticMetricSource;
//!
//! # async fn example() -> tierhealth_core::Result<()> {
//! let evaluator = OverallEvaluator::builder(ScoringConfig::default())
//!     .metric_source(Arc::new(StaticMetricSource::new()))
//!     .build()?;
//! let result = evaluator.evaluate().await;
//! println!("{} -> {}", result.overall_score, result.status);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use super::alerts::AlertDispatcher;
use super::anomaly::AnomalyRecognizer;
use super::dependency::{DependencyGraph, DependencyImpactAnalyzer};
use super::layer::LayerEvaluator;
use super::predictive::PredictiveAnalyzer;
use super::recommendations;
use super::trend::TrendAnalyzer;
use super::weights::DynamicWeightCalculator;
use crate::config::ScoringConfig;
use crate::constants::{system, AnomalyType, Layer};
use crate::error::{HealthError, Result};
use crate::history::HistoryStore;
use crate::integration::{AlertEmitter, EvaluationContext, MetricSource};
use crate::logging::log_evaluation_summary;
use crate::models::{
    DebounceOutcome, DynamicWeights, EvaluationResult, HealthIssue, HistoryEntry, LayerScore,
    LayerScoreResult,
};
use crate::state_machine::StateDebouncer;
use crate::{log_evaluation, log_layer};

pub struct OverallEvaluator {
    config: Arc<ScoringConfig>,
    component: String,
    source: Arc<dyn MetricSource>,
    history: Arc<HistoryStore>,
    layers: Vec<LayerEvaluator>,
    weights: DynamicWeightCalculator,
    graph: DependencyGraph,
    impact: DependencyImpactAnalyzer,
    trend: TrendAnalyzer,
    anomalies: AnomalyRecognizer,
    predictive: PredictiveAnalyzer,
    debouncer: StateDebouncer,
    alerts: AlertDispatcher,
}

impl std::fmt::Debug for OverallEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverallEvaluator")
            .field("component", &self.component)
            .field("layers", &self.layers)
            .field("alerts", &self.alerts)
            .finish()
    }
}

/// Assembles an [`OverallEvaluator`] from configuration and collaborators
pub struct OverallEvaluatorBuilder {
    config: ScoringConfig,
    component: String,
    source: Option<Arc<dyn MetricSource>>,
    history: Option<Arc<HistoryStore>>,
    emitter: Option<Arc<dyn AlertEmitter>>,
}

impl OverallEvaluatorBuilder {
    /// History key the evaluator records under; defaults to `overall`
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    pub fn metric_source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Share a history store with other evaluators or samplers
    pub fn history(mut self, history: Arc<HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn alert_emitter(mut self, emitter: Arc<dyn AlertEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn build(self) -> Result<OverallEvaluator> {
        self.config.validate()?;
        let source = self.source.ok_or_else(|| {
            HealthError::ConfigurationError("a metric source is required".to_string())
        })?;
        let config = Arc::new(self.config);
        let history = self
            .history
            .unwrap_or_else(|| Arc::new(HistoryStore::new(config.history.capacity)));
        let graph = DependencyGraph::from_config(&config.dependency)?;

        let layers = Layer::ALL
            .iter()
            .map(|layer| {
                LayerEvaluator::from_config(
                    *layer,
                    config.layers.get(*layer),
                    config.timeouts.factor_fetch_timeout(),
                    Arc::clone(&source),
                )
            })
            .collect();

        Ok(OverallEvaluator {
            weights: DynamicWeightCalculator::new(config.dynamic_weights.clone()),
            impact: DependencyImpactAnalyzer::new(&config.dependency),
            trend: TrendAnalyzer::new(config.trend.clone()),
            anomalies: AnomalyRecognizer::new(config.anomaly.clone()),
            predictive: PredictiveAnalyzer::new(config.prediction.clone()),
            debouncer: StateDebouncer::new(config.debounce.clone(), config.status.clone()),
            alerts: AlertDispatcher::new(config.alerts.clone(), self.emitter),
            component: self.component,
            source,
            history,
            layers,
            graph,
            config,
        })
    }
}

impl OverallEvaluator {
    pub fn builder(config: ScoringConfig) -> OverallEvaluatorBuilder {
        OverallEvaluatorBuilder {
            config,
            component: system::OVERALL_HISTORY_KEY.to_string(),
            source: None,
            history: None,
            emitter: None,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn alerts(&self) -> &AlertDispatcher {
        &self.alerts
    }

    /// Run a full evaluation and record it in history
    pub async fn evaluate(&self) -> EvaluationResult {
        let started = Instant::now();
        let context = EvaluationContext::new(self.component.clone());
        log_evaluation!(debug, "started", evaluation_id: context.evaluation_id, component: self.component);

        match self.try_evaluate(&context, started).await {
            Ok(result) => result,
            Err(err) => {
                log_evaluation!(
                    error,
                    "failed",
                    evaluation_id: context.evaluation_id,
                    error: err.to_string()
                );
                let mut result = EvaluationResult::failure(err.to_string(), context.requested_at);
                result.evaluation_id = context.evaluation_id;
                result.duration_ms = started.elapsed().as_millis() as u64;
                result
            }
        }
    }

    /// Score a single tier without touching history
    pub async fn evaluate_layer(&self, layer: Layer) -> LayerScoreResult {
        let Some(evaluator) = self.layers.iter().find(|l| l.layer() == layer) else {
            return LayerScoreResult {
                success: false,
                layer,
                layer_score: None,
                issues: Vec::new(),
                error: Some(format!("{layer} layer is not configured")),
            };
        };

        let context = EvaluationContext::new(layer.history_key());
        let weights = self.dynamic_weights(&context).await;
        let deadline = tokio::time::Instant::now() + self.config.timeouts.evaluation_deadline();
        let score = self.evaluate_within(evaluator, &context, &weights, deadline).await;

        let issues = recommendations::layer_issues(&score, &self.config.status)
            .into_iter()
            .map(|i| i.message)
            .collect();
        let error = (!score.reachable)
            .then(|| HealthError::DependencyUnreachable(format!("{layer} layer")).to_string());

        LayerScoreResult {
            success: score.reachable,
            layer,
            layer_score: Some(score),
            issues,
            error,
        }
    }

    /// Score every tier and append one sample per tier under `layer:<name>`
    ///
    /// Used by the periodic sampler; no debouncing, analysis or alerting happens here.
    pub async fn record_layer_samples(&self) -> Vec<LayerScore> {
        let context = EvaluationContext::new(self.component.clone());
        let scores = self.evaluate_layers(&context).await;
        let now = Utc::now();
        for score in &scores {
            let status = self.debouncer.raw_status(score.score);
            let mut entry = HistoryEntry::raw(now, score.score, status);
            entry.success = score.reachable;
            self.history.record(&score.layer.history_key(), entry);
        }
        scores
    }

    async fn try_evaluate(&self, context: &EvaluationContext, started: Instant) -> Result<EvaluationResult> {
        let now = context.requested_at;
        let weights = self.dynamic_weights(context).await;
        let layer_scores = self.fan_out(context, &weights).await;

        if layer_scores.iter().all(|s| !s.reachable) {
            // Still recorded so the failure rate reflects the outage
            let mut entry = HistoryEntry::raw(now, 0.0, self.debouncer.raw_status(0.0));
            entry.success = false;
            self.history.update(&self.component, |buffer| {
                if let Some(last) = buffer.latest() {
                    entry.published_status = last.published_status;
                }
                buffer.push(entry);
            });
            let outage = HealthIssue {
                source: self.component.clone(),
                message: format!("{}: every tier is unreachable", AnomalyType::DependencyFailure),
                score: 0.0,
                anomaly: Some(AnomalyType::DependencyFailure),
            };
            self.alerts.dispatch(&self.component, &[outage]).await;
            return Err(HealthError::DependencyUnreachable(
                "no tier could be evaluated".to_string(),
            ));
        }

        let overall_score = self.graph.combine(&layer_scores);
        let (debounce, history) = self.debounce_and_record(overall_score, now);

        let trend = self.trend.analyze(&history);
        let node_scores = self.graph.node_scores(&layer_scores);
        let anomaly_patterns = self
            .anomalies
            .recognize(&layer_scores, Some(&trend), &node_scores);
        let prediction = self
            .predictive
            .predict(overall_score, Some(&trend), &anomaly_patterns, now);
        let dependency_impact = self.impact.analyze(&node_scores, &self.graph);

        let mut issues: Vec<_> = layer_scores
            .iter()
            .flat_map(|s| recommendations::layer_issues(s, &self.config.status))
            .collect();
        issues.extend(
            anomaly_patterns
                .iter()
                .map(|p| recommendations::anomaly_issue(p, &layer_scores, overall_score)),
        );
        issues.extend(recommendations::prediction_issue(&prediction, overall_score));
        let recommendations = recommendations::collect_recommendations(&layer_scores, &anomaly_patterns);

        self.alerts.dispatch(&self.component, &issues).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        log_evaluation_summary(
            &self.component,
            overall_score,
            debounce.current_status.to_string().as_str(),
            anomaly_patterns.len(),
            duration_ms,
        );

        Ok(EvaluationResult {
            evaluation_id: context.evaluation_id,
            timestamp: now,
            success: true,
            error: None,
            overall_score,
            status: debounce.current_status,
            debounce: Some(debounce),
            layer_scores,
            dynamic_weights: Some(weights),
            trend: Some(trend),
            anomaly_patterns,
            prediction: Some(prediction),
            dependency_impact: Some(dependency_impact),
            issues,
            recommendations,
            duration_ms,
        })
    }

    /// Debounce the candidate sample and append it, all under the component's history lock
    fn debounce_and_record(&self, overall_score: f64, now: DateTime<Utc>) -> (DebounceOutcome, Vec<HistoryEntry>) {
        let raw_status = self.debouncer.raw_status(overall_score);
        self.history.update(&self.component, |buffer| {
            let mut candidate = HistoryEntry::raw(now, overall_score, raw_status);
            let mut snapshot = buffer.snapshot();
            snapshot.push(candidate.clone());

            let outcome = self.debouncer.apply(&snapshot);
            candidate.published_status = outcome.current_status;
            if let Some(last) = snapshot.last_mut() {
                last.published_status = outcome.current_status;
            }
            buffer.push(candidate);
            (outcome, snapshot)
        })
    }

    async fn dynamic_weights(&self, context: &EvaluationContext) -> DynamicWeights {
        let metric = self.weights.load_metric();
        let timeout = self.config.timeouts.factor_fetch_timeout();
        let load = match tokio::time::timeout(timeout, self.source.fetch(metric, context)).await {
            Ok(Ok(reading)) => Some(reading.value),
            Ok(Err(err)) => {
                warn!(metric = %metric, error = %err, "⚠️ Load metric unavailable, using default weights");
                None
            }
            Err(_) => {
                warn!(metric = %metric, timeout_ms = timeout.as_millis() as u64, "⚠️ Load metric timed out, using default weights");
                None
            }
        };
        self.weights.compute(load)
    }

    async fn evaluate_layers(&self, context: &EvaluationContext) -> Vec<LayerScore> {
        let weights = self.dynamic_weights(context).await;
        self.fan_out(context, &weights).await
    }

    async fn fan_out(&self, context: &EvaluationContext, weights: &DynamicWeights) -> Vec<LayerScore> {
        let deadline = tokio::time::Instant::now() + self.config.timeouts.evaluation_deadline();
        join_all(
            self.layers
                .iter()
                .map(|layer| self.evaluate_within(layer, context, weights, deadline)),
        )
        .await
    }

    async fn evaluate_within(
        &self,
        evaluator: &LayerEvaluator,
        context: &EvaluationContext,
        weights: &DynamicWeights,
        deadline: tokio::time::Instant,
    ) -> LayerScore {
        match tokio::time::timeout_at(deadline, evaluator.evaluate(context, Some(weights))).await {
            Ok(score) => score,
            Err(_) => {
                log_layer!(
                    warn,
                    "deadline_exceeded",
                    layer: evaluator.layer(),
                    evaluation_id: context.evaluation_id
                );
                let factors = evaluator
                    .factors()
                    .iter()
                    .map(|f| f.failed("evaluation deadline exceeded"))
                    .collect();
                LayerScore::unreachable(evaluator.layer(), factors)
            }
        }
    }
}
