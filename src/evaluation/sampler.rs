//! # Periodic Sampler
//!
//! Background task that records per-layer score samples on a fixed interval, independent of
//! on-demand evaluations. It feeds the `layer:<name>` history keys and nothing else: no
//! debouncing, analysis or alerting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::overall::OverallEvaluator;

/// Handle to a running sampler; dropping it without `stop` leaves the task running
#[derive(Debug)]
pub struct SamplerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    samples: Arc<AtomicU64>,
}

impl SamplerHandle {
    /// Completed sampling rounds so far
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Signal shutdown and wait for the loop to exit
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            debug!(error = %err, "Sampler task ended abnormally");
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeriodicSampler {
    evaluator: Arc<OverallEvaluator>,
    interval: Duration,
}

impl PeriodicSampler {
    pub fn new(evaluator: Arc<OverallEvaluator>, interval: Duration) -> Self {
        Self {
            evaluator,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Sampler using the evaluator's configured interval
    pub fn from_config(evaluator: Arc<OverallEvaluator>) -> Self {
        let interval = evaluator.config().sampler.interval();
        Self::new(evaluator, interval)
    }

    /// Spawn the sampling loop on the current runtime
    pub fn start(self) -> SamplerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let samples = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&samples);

        info!(
            component = %self.evaluator.component(),
            interval_ms = self.interval.as_millis() as u64,
            "⏱️ Periodic sampler started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let scores = self.evaluator.record_layer_samples().await;
                        counter.fetch_add(1, Ordering::Relaxed);
                        debug!(layers = scores.len(), "📥 Layer samples recorded");
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(
                component = %self.evaluator.component(),
                rounds = counter.load(Ordering::Relaxed),
                "⏹️ Periodic sampler stopped"
            );
        });

        SamplerHandle {
            shutdown,
            task,
            samples,
        }
    }
}
