//! Scoring curves map one raw metric value onto a 0-100 score.
//!
//! Two shapes are supported: ordered threshold bands (first match wins) and piecewise-linear
//! interpolation between points. Both always produce a score inside `[0, 100]`.

use serde::{Deserialize, Serialize};

use crate::constants::clamp_score;

fn full_score() -> f64 {
    100.0
}

fn default_recommend_below() -> f64 {
    70.0
}

/// Which side of a band boundary is bad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveDirection {
    /// Bands fire when `value > bound` (latency, utilization, error rate)
    HigherIsWorse,
    /// Bands fire when `value < bound` (hit ratio, success rate)
    HigherIsBetter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBand {
    pub bound: f64,
    pub score: f64,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    pub value: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringCurve {
    Step {
        direction: CurveDirection,
        bands: Vec<ScoreBand>,
        #[serde(default = "full_score")]
        otherwise: f64,
    },
    Linear {
        points: Vec<CurvePoint>,
        #[serde(default)]
        recommendation: Option<String>,
        #[serde(default = "default_recommend_below")]
        recommend_below: f64,
    },
}

/// Result of applying a curve to one value
#[derive(Debug, Clone, PartialEq)]
pub struct CurveOutcome {
    pub score: f64,
    /// Human-readable rule that produced the score, e.g. `"> 90"`
    pub rule: String,
    pub recommendation: Option<String>,
}

impl ScoringCurve {
    /// Convenience constructor for threshold curves
    pub fn step(direction: CurveDirection, bands: &[(f64, f64, &str)]) -> Self {
        ScoringCurve::Step {
            direction,
            bands: bands
                .iter()
                .map(|(bound, score, recommendation)| ScoreBand {
                    bound: *bound,
                    score: *score,
                    recommendation: if recommendation.is_empty() {
                        None
                    } else {
                        Some((*recommendation).to_string())
                    },
                })
                .collect(),
            otherwise: full_score(),
        }
    }

    pub fn apply(&self, value: f64) -> CurveOutcome {
        match self {
            ScoringCurve::Step {
                direction,
                bands,
                otherwise,
            } => {
                let matched = bands.iter().find(|band| match direction {
                    CurveDirection::HigherIsWorse => value > band.bound,
                    CurveDirection::HigherIsBetter => value < band.bound,
                });
                match matched {
                    Some(band) => CurveOutcome {
                        score: clamp_score(band.score),
                        rule: match direction {
                            CurveDirection::HigherIsWorse => format!("> {}", band.bound),
                            CurveDirection::HigherIsBetter => format!("< {}", band.bound),
                        },
                        recommendation: band.recommendation.clone(),
                    },
                    None => CurveOutcome {
                        score: clamp_score(*otherwise),
                        rule: "within normal range".to_string(),
                        recommendation: None,
                    },
                }
            }
            ScoringCurve::Linear {
                points,
                recommendation,
                recommend_below,
            } => {
                let score = clamp_score(interpolate(points, value));
                CurveOutcome {
                    score,
                    rule: "interpolated".to_string(),
                    recommendation: if score < *recommend_below {
                        recommendation.clone()
                    } else {
                        None
                    },
                }
            }
        }
    }

    /// Check ordering and ranges; returns a reason on failure
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ScoringCurve::Step {
                direction,
                bands,
                otherwise,
            } => {
                if !(0.0..=100.0).contains(otherwise) {
                    return Err(format!("otherwise score {otherwise} outside [0, 100]"));
                }
                for band in bands {
                    if !band.bound.is_finite() {
                        return Err("band bounds must be finite".to_string());
                    }
                    if !(0.0..=100.0).contains(&band.score) {
                        return Err(format!("band score {} outside [0, 100]", band.score));
                    }
                }
                let ordered = bands.windows(2).all(|pair| match direction {
                    CurveDirection::HigherIsWorse => pair[0].bound > pair[1].bound,
                    CurveDirection::HigherIsBetter => pair[0].bound < pair[1].bound,
                });
                if !ordered {
                    return Err("bands must be ordered from the most severe bound".to_string());
                }
                Ok(())
            }
            ScoringCurve::Linear { points, .. } => {
                if points.len() < 2 {
                    return Err("linear curves need at least two points".to_string());
                }
                if points.iter().any(|p| !(0.0..=100.0).contains(&p.score)) {
                    return Err("point scores must be within [0, 100]".to_string());
                }
                if !points.windows(2).all(|pair| pair[0].value < pair[1].value) {
                    return Err("point values must be strictly ascending".to_string());
                }
                Ok(())
            }
        }
    }
}

fn interpolate(points: &[CurvePoint], value: f64) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };
    if value <= first.value {
        return first.score;
    }
    if value >= last.value {
        return last.score;
    }
    for pair in points.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if value <= hi.value {
            let span = hi.value - lo.value;
            if span <= f64::EPSILON {
                return hi.score;
            }
            let t = (value - lo.value) / span;
            return lo.score + t * (hi.score - lo.score);
        }
    }
    last.score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_utilization_curve() -> ScoringCurve {
        ScoringCurve::step(
            CurveDirection::HigherIsWorse,
            &[(90.0, 0.0, "scale the pool"), (70.0, 60.0, "watch the pool")],
        )
    }

    #[test]
    fn test_step_bands_first_match_wins() {
        let curve = pool_utilization_curve();
        assert_eq!(curve.apply(95.0).score, 0.0);
        assert_eq!(curve.apply(80.0).score, 60.0);
        assert_eq!(curve.apply(50.0).score, 100.0);
        // Bounds are exclusive
        assert_eq!(curve.apply(90.0).score, 60.0);
        assert_eq!(curve.apply(70.0).score, 100.0);
    }

    #[test]
    fn test_step_carries_band_recommendation() {
        let outcome = pool_utilization_curve().apply(95.0);
        assert_eq!(outcome.rule, "> 90");
        assert_eq!(outcome.recommendation.as_deref(), Some("scale the pool"));
        assert!(pool_utilization_curve().apply(10.0).recommendation.is_none());
    }

    #[test]
    fn test_higher_is_better_bands() {
        let curve = ScoringCurve::step(
            CurveDirection::HigherIsBetter,
            &[(50.0, 20.0, ""), (80.0, 60.0, "")],
        );
        assert_eq!(curve.apply(40.0).score, 20.0);
        assert_eq!(curve.apply(75.0).score, 60.0);
        assert_eq!(curve.apply(99.0).score, 100.0);
        assert_eq!(curve.apply(40.0).rule, "< 50");
    }

    #[test]
    fn test_linear_interpolation_and_clamping() {
        let curve = ScoringCurve::Linear {
            points: vec![
                CurvePoint { value: 100.0, score: 100.0 },
                CurvePoint { value: 1000.0, score: 0.0 },
            ],
            recommendation: Some("investigate latency".to_string()),
            recommend_below: 70.0,
        };
        assert_eq!(curve.apply(50.0).score, 100.0);
        assert_eq!(curve.apply(5000.0).score, 0.0);
        assert!((curve.apply(550.0).score - 50.0).abs() < 1e-9);
        assert!(curve.apply(550.0).recommendation.is_some());
        assert!(curve.apply(150.0).recommendation.is_none());
    }

    #[test]
    fn test_validate_rejects_unordered_bands() {
        let curve = ScoringCurve::step(
            CurveDirection::HigherIsWorse,
            &[(70.0, 60.0, ""), (90.0, 0.0, "")],
        );
        assert!(curve.validate().is_err());
        assert!(pool_utilization_curve().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_linear_curve() {
        let curve = ScoringCurve::Linear {
            points: vec![CurvePoint { value: 1.0, score: 50.0 }],
            recommendation: None,
            recommend_below: 70.0,
        };
        assert!(curve.validate().is_err());
    }

    #[test]
    fn test_curve_deserializes_from_tagged_json() {
        let json = r#"{"kind": "step", "direction": "higher_is_worse",
                       "bands": [{"bound": 90, "score": 0}]}"#;
        let curve: ScoringCurve = serde_json::from_str(json).unwrap();
        assert_eq!(curve.apply(10.0).score, 100.0);
        assert_eq!(curve.apply(91.0).score, 0.0);
    }
}
