//! # Integration Seams
//!
//! Traits for the external collaborators of the evaluation engine, plus in-memory
//! implementations usable for embedding and testing.

pub mod memory;
pub mod traits;

pub use memory::{ReadingBehavior, RecordingAlertEmitter, StaticMetricSource};
pub use traits::{AlertEmitter, AlertId, AlertRequest, EvaluationContext, HistoryQuery, MetricSource};
