//! Proptest strategies for scoring inputs.

use proptest::prelude::*;

/// Any reading a collector might plausibly return, including garbage
pub fn raw_reading_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -1_000.0f64..100_000.0,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

pub fn score_strategy() -> impl Strategy<Value = f64> {
    0.0f64..=100.0
}

pub fn load_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        (-10.0f64..10_000.0).prop_map(Some),
        Just(Some(f64::NAN)),
    ]
}

/// Positive factor weights for a layer of 1..8 factors
pub fn weights_strategy() -> impl Strategy<Value = Vec<(f64, bool)>> {
    prop::collection::vec((0.0f64..100.0, any::<bool>()), 1..8)
}
