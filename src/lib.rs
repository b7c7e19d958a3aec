#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tierhealth Core
//!
//! Health evaluation and anomaly-detection engine for three-tier applications.
//!
//! ## Overview
//!
//! Each evaluation scores the client, service and storage tiers from weighted factors,
//! combines them through a static dependency graph into a composite score in `[0, 100]`, and
//! publishes a debounced `healthy` / `warning` / `critical` status. Trend analysis, anomaly
//! pattern recognition and risk prediction run on top, producing issues, recommendations
//! and alerts.
//!
//! ## Module Organization
//!
//! - [`evaluation`] - Factor, layer and overall evaluation plus the analyzers
//! - [`state_machine`] - Hysteresis over the published status
//! - [`history`] - Bounded per-component history and interval queries
//! - [`integration`] - Metric source, history query and alert emitter seams
//! - [`models`] - Result types shared across the pipeline
//! - [`config`] - Scoring configuration and its loader
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and macros
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tierhealth_core::config::ConfigManager;
//! use tierhealth_core::evaluation::OverallEvaluator;
//! use tierhealth_core::integration::StaticMetricSource;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! tierhealth_core::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//!
//! let evaluator = OverallEvaluator::builder(manager.config().clone())
//!     .metric_source(Arc::new(StaticMetricSource::new()))
//!     .build()?;
//!
//! let result = evaluator.evaluate().await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod evaluation;
pub mod history;
pub mod integration;
pub mod logging;
pub mod models;
pub mod state_machine;

pub use config::{ConfigManager, ConfigurationError, ScoringConfig};
pub use constants::{AnomalyType, HealthStatus, Layer};
pub use error::{HealthError, Result};
pub use evaluation::{OverallEvaluator, PeriodicSampler};
pub use history::{HistoryStore, IntervalSpec};
pub use integration::{AlertEmitter, HistoryQuery, MetricSource};
pub use models::{EvaluationResult, LayerScoreResult};
pub use state_machine::StateDebouncer;
