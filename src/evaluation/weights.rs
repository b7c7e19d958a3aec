//! Load-aware performance/business weighting.

use tracing::debug;

use crate::config::{DynamicWeightConfig, WeightSplit};
use crate::models::DynamicWeights;

#[derive(Debug, Clone)]
pub struct DynamicWeightCalculator {
    config: DynamicWeightConfig,
}

impl DynamicWeightCalculator {
    pub fn new(config: DynamicWeightConfig) -> Self {
        Self { config }
    }

    pub fn load_metric(&self) -> &str {
        &self.config.load_metric
    }

    /// Split for the configured peak reference
    pub fn compute(&self, current_load: Option<f64>) -> DynamicWeights {
        self.compute_with_peak(current_load, self.config.peak_load_reference)
    }

    /// Pick the high-load split when load exceeds `high_load_ratio` of `peak_reference`
    ///
    /// Missing or non-finite load and a non-positive peak fall back to the default split.
    pub fn compute_with_peak(&self, current_load: Option<f64>, peak_reference: f64) -> DynamicWeights {
        let load_ratio = match current_load {
            Some(load) if load.is_finite() && peak_reference.is_finite() && peak_reference > 0.0 => {
                Some(load.max(0.0) / peak_reference)
            }
            _ => None,
        };

        let high_load = load_ratio.is_some_and(|ratio| ratio > self.config.high_load_ratio);
        let split = if high_load {
            self.config.high_load_split
        } else {
            self.config.default_split
        };

        let weights = Self::normalized(split, high_load, load_ratio);
        debug!(
            performance_weight = weights.performance_weight,
            business_weight = weights.business_weight,
            high_load = weights.high_load,
            "⚖️ Dynamic weights computed"
        );
        weights
    }

    fn normalized(split: WeightSplit, high_load: bool, load_ratio: Option<f64>) -> DynamicWeights {
        let performance_weight = split.performance.clamp(0.0, 1.0);
        DynamicWeights {
            performance_weight,
            // Derived so the pair always sums to exactly one
            business_weight: 1.0 - performance_weight,
            high_load,
            load_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> DynamicWeightCalculator {
        DynamicWeightCalculator::new(DynamicWeightConfig::default())
    }

    #[test]
    fn test_default_split_under_normal_load() {
        let weights = calculator().compute(Some(500.0));
        assert_eq!(weights.performance_weight, 0.3);
        assert!(!weights.high_load);
        assert_eq!(weights.load_ratio, Some(0.5));
        assert!((weights.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_high_load_split_above_ratio() {
        let weights = calculator().compute(Some(850.0));
        assert!(weights.high_load);
        assert_eq!(weights.performance_weight, 0.4);
        assert!((weights.business_weight - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_exactly_at_ratio_is_not_high_load() {
        assert!(!calculator().compute(Some(800.0)).high_load);
    }

    #[test]
    fn test_missing_or_invalid_inputs_use_default() {
        let calc = calculator();
        for weights in [
            calc.compute(None),
            calc.compute(Some(f64::NAN)),
            calc.compute_with_peak(Some(5000.0), 0.0),
            calc.compute_with_peak(Some(5000.0), -3.0),
        ] {
            assert!(!weights.high_load);
            assert_eq!(weights.performance_weight, 0.3);
            assert!(weights.load_ratio.is_none());
        }
    }
}
