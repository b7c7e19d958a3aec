use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::factor::{FactorResult, FactorSignal};
use crate::constants::Layer;

/// Score of one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerScore {
    pub layer: Layer,
    /// Rounded and clamped to `[0, 100]`
    pub score: f64,
    pub factors: Vec<FactorResult>,
    /// Effective weight per factor id after normalization and dynamic rescaling; sums to 100
    pub weights_used: BTreeMap<String, f64>,
    pub failed_factors: Vec<String>,
    /// False when no factor of the tier could be measured
    pub reachable: bool,
}

impl LayerScore {
    /// Placeholder for a tier that could not be evaluated at all
    pub fn unreachable(layer: Layer, factors: Vec<FactorResult>) -> Self {
        let failed_factors = factors.iter().map(|f| f.id.clone()).collect();
        Self {
            layer,
            score: 0.0,
            factors,
            weights_used: BTreeMap::new(),
            failed_factors,
            reachable: false,
        }
    }

    /// More than one factor failed but the tier still produced a score
    pub fn is_degraded(&self) -> bool {
        self.reachable && self.failed_factors.len() > 1
    }

    pub fn factor(&self, id: &str) -> Option<&FactorResult> {
        self.factors.iter().find(|f| f.id == id)
    }

    /// Measured factors carrying the given signal
    pub fn factors_with_signal(
        &self,
        signal: FactorSignal,
    ) -> impl Iterator<Item = &FactorResult> + '_ {
        self.factors
            .iter()
            .filter(move |f| f.signal == Some(signal) && !f.failed)
    }
}

/// Envelope returned by the per-layer evaluation API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerScoreResult {
    pub success: bool,
    pub layer: Layer,
    pub layer_score: Option<LayerScore>,
    pub issues: Vec<String>,
    pub error: Option<String>,
}
