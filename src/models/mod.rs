//! Data types produced and consumed by the evaluation pipeline.
//!
//! Apart from [`HistoryEntry`], everything here is built and discarded within a single
//! evaluation call.

pub mod evaluation;
pub mod factor;
pub mod history;
pub mod layer;

pub use evaluation::{
    AnomalyPattern, DebounceConfidence, DebounceOutcome, DependencyImpact, DynamicWeights,
    EvaluationResult, HealthIssue, NodeImpact, PredictiveResult, TrendResult,
};
pub use factor::{FactorCategory, FactorDescriptor, FactorResult, FactorSignal, RawReading};
pub use history::{HistoryEntry, HistoryPoint};
pub use layer::{LayerScore, LayerScoreResult};
