//! Objective
//!
//! Prediction losses on probability scores, returned as a batch mean together
//! with the gradient w.r.t. every score.
use crate::constants::{LOG_CLAMP, PROB_EPSILON};
use serde::{Deserialize, Serialize};

/// Trait defining a prediction loss on scores in `[0, 1]`.
pub trait ObjectiveFunction {
    /// Mean loss over the batch.
    fn loss(&self, y: &[f64], yhat: &[f64]) -> f64;

    /// Gradient of the mean loss w.r.t. every `yhat_i`.
    fn gradient(&self, y: &[f64], yhat: &[f64]) -> Vec<f64>;

    /// Loss and gradient in one call.
    fn loss_and_gradient(&self, y: &[f64], yhat: &[f64]) -> (f64, Vec<f64>) {
        (self.loss(y, yhat), self.gradient(y, yhat))
    }
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy)]
/// Log Loss (binary cross-entropy) on probabilities.
///
/// Each `ln` is clamped from below at `-100`, so a confident wrong prediction
/// yields a large finite loss instead of infinity.
pub struct LogLoss {}

impl ObjectiveFunction for LogLoss {
    #[inline]
    fn loss(&self, y: &[f64], yhat: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let total: f64 = y
            .iter()
            .zip(yhat)
            .map(|(y_, p)| {
                let lp = p.ln().max(LOG_CLAMP);
                let lq = (1.0 - p).ln().max(LOG_CLAMP);
                -(y_ * lp + (1.0 - y_) * lq)
            })
            .sum();
        total / y.len() as f64
    }

    #[inline]
    fn gradient(&self, y: &[f64], yhat: &[f64]) -> Vec<f64> {
        let n = y.len().max(1) as f64;
        y.iter()
            .zip(yhat)
            .map(|(y_, p)| {
                let p = p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
                -(y_ / p - (1.0 - y_) / (1.0 - p)) / n
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logloss_value() {
        let y = vec![1.0, 0.0];
        let yhat = vec![0.5, 0.5];
        let l = LogLoss::default().loss(&y, &yhat);
        assert!((l - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_logloss_clamped() {
        let l = LogLoss::default().loss(&[1.0], &[0.0]);
        assert_eq!(l, 100.0);
        assert_eq!(LogLoss::default().loss(&[], &[]), 0.0);
    }

    #[test]
    fn test_logloss_gradient() {
        let y = vec![1.0, 0.0, 1.0];
        let yhat = vec![0.2, 0.7, 0.9];
        let (l, g) = LogLoss::default().loss_and_gradient(&y, &yhat);
        let h = 1e-7;
        for i in 0..y.len() {
            let mut plus = yhat.clone();
            plus[i] += h;
            let numeric = (LogLoss::default().loss(&y, &plus) - l) / h;
            assert!((numeric - g[i]).abs() < 1e-4);
        }
    }
}
