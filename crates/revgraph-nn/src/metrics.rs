//! Regression metrics for held-out ratings.
//!
//! | Metric | Range | Description |
//! |--------|-------|-------------|
//! | RMSE | [0, inf) | sqrt(mean((p - y)^2)) |
//! | MAE | [0, inf) | mean(abs(p - y)) |

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingMetrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Number of predictions scored.
    pub num_samples: usize,
}

impl RatingMetrics {
    /// Compute metrics from parallel predictions and targets.
    ///
    /// Empty input yields the default (all zero).
    pub fn from_predictions(predictions: &[f32], targets: &[f32]) -> Result<Self> {
        if predictions.len() != targets.len() {
            return Err(Error::ShapeMismatch {
                context: "predictions vs targets",
                expected: targets.len(),
                got: predictions.len(),
            });
        }
        if predictions.is_empty() {
            return Ok(Self::default());
        }

        let n = predictions.len() as f64;
        let (sq, abs) = predictions
            .iter()
            .zip(targets)
            .fold((0.0f64, 0.0f64), |(sq, abs), (&p, &y)| {
                let d = p as f64 - y as f64;
                (sq + d * d, abs + d.abs())
            });

        Ok(Self {
            rmse: (sq / n).sqrt(),
            mae: abs / n,
            num_samples: predictions.len(),
        })
    }

    pub fn is_finite(&self) -> bool {
        self.rmse.is_finite() && self.mae.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let m = RatingMetrics::from_predictions(&[1.0, 2.0, 4.0, 4.0], &[1.0, 4.0, 4.0, 2.0])
            .unwrap();
        // errors 0, -2, 0, 2
        assert!((m.rmse - 2.0f64.sqrt()).abs() < 1e-12);
        assert!((m.mae - 1.0).abs() < 1e-12);
        assert_eq!(m.num_samples, 4);
    }

    #[test]
    fn test_perfect_predictions() {
        let m = RatingMetrics::from_predictions(&[3.5, 1.0], &[3.5, 1.0]).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
    }

    #[test]
    fn test_empty_and_mismatch() {
        assert_eq!(
            RatingMetrics::from_predictions(&[], &[]).unwrap(),
            RatingMetrics::default()
        );
        assert!(RatingMetrics::from_predictions(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_rmse_bounds_mae() {
        let m = RatingMetrics::from_predictions(&[0.0, 0.0, 0.0], &[1.0, 2.0, 6.0]).unwrap();
        assert!(m.rmse >= m.mae);
    }
}
