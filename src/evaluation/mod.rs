//! # Evaluation Pipeline
//!
//! Leaf to root: [`curve`] and [`factor`] score single metrics, [`layer`] combines factors
//! into a tier score, [`dependency`] combines tiers, and [`overall`] runs the whole pipeline
//! including [`trend`], [`anomaly`], [`predictive`] analysis and [`alerts`].

pub mod alerts;
pub mod anomaly;
pub mod curve;
pub mod dependency;
pub mod factor;
pub mod layer;
pub mod overall;
pub mod predictive;
pub mod recommendations;
pub mod sampler;
pub mod trend;
pub mod weights;

pub use alerts::{AlertDispatcher, DispatchSummary};
pub use anomaly::AnomalyRecognizer;
pub use curve::{CurveDirection, CurveOutcome, CurvePoint, ScoreBand, ScoringCurve};
pub use dependency::{DependencyGraph, DependencyImpactAnalyzer};
pub use factor::{FactorEvaluator, HealthFactor, ThresholdFactor};
pub use layer::{effective_weights, LayerEvaluator};
pub use overall::{OverallEvaluator, OverallEvaluatorBuilder};
pub use predictive::PredictiveAnalyzer;
pub use sampler::{PeriodicSampler, SamplerHandle};
pub use trend::TrendAnalyzer;
pub use weights::DynamicWeightCalculator;
