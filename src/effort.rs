//! Effort
//!
//! Simulated, bounded feature improvement available to individuals whose score
//! is below the decision threshold. An effort transform receives the model,
//! the dataset it is trained on and the eligible rows, and returns the improved
//! rows. Its output is used as a constant input to the adversarial model.
use crate::data::{FairnessDataset, Matrix};
use crate::errors::EIError;
use crate::model::Classifier;
use crate::utils::{sign, validate_positive_float_parameter};
use serde::{Deserialize, Serialize};

/// Trait defining an effort transform.
pub trait Effort {
    /// Improved copy of `x`, same shape.
    fn apply<M: Classifier>(&self, model: &M, dataset: &FairnessDataset, x: &Matrix) -> Result<Matrix, EIError>;

    /// Size of the effort budget, reported in logs.
    fn delta(&self) -> f64;
}

/// No improvement: the rows are returned unchanged.
#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy)]
pub struct NoEffort {}

impl Effort for NoEffort {
    fn apply<M: Classifier>(&self, _model: &M, _dataset: &FairnessDataset, x: &Matrix) -> Result<Matrix, EIError> {
        Ok(x.clone())
    }

    fn delta(&self) -> f64 {
        0.0
    }
}

/// Best response inside an L∞ ball of radius `delta`, found by signed gradient
/// ascent of the model score on the improvable features.
///
/// Improved values are also kept inside the range observed for each feature
/// in the training dataset, as recorded by [`FairnessDataset::new`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GradientEffort {
    pub delta: f64,
    pub n_steps: usize,
    pub step_size: f64,
    /// Features an individual may change. `None` means every feature.
    pub improvable: Option<Vec<usize>>,
}

impl GradientEffort {
    /// Ten step projected ascent with step `delta / 4`.
    pub fn new(delta: f64) -> Result<Self, EIError> {
        validate_positive_float_parameter(delta, "delta")?;
        Ok(GradientEffort {
            delta,
            n_steps: 10,
            step_size: delta / 4.0,
            improvable: None,
        })
    }

    /// A single full-size signed step, `x + delta · sign(∇score)`.
    pub fn single_step(delta: f64) -> Result<Self, EIError> {
        validate_positive_float_parameter(delta, "delta")?;
        Ok(GradientEffort {
            delta,
            n_steps: 1,
            step_size: delta,
            improvable: None,
        })
    }

    pub fn with_improvable(mut self, features: Vec<usize>) -> Self {
        self.improvable = Some(features);
        self
    }

    fn feature_mask(&self, n_features: usize) -> Result<Vec<bool>, EIError> {
        match &self.improvable {
            None => Ok(vec![true; n_features]),
            Some(features) => {
                let mut mask = vec![false; n_features];
                for &f in features {
                    if f >= n_features {
                        return Err(EIError::InvalidParameter(
                            "improvable".to_string(),
                            format!("feature index below {}", n_features),
                            f.to_string(),
                        ));
                    }
                    mask[f] = true;
                }
                Ok(mask)
            }
        }
    }
}

impl Effort for GradientEffort {
    fn apply<M: Classifier>(&self, model: &M, dataset: &FairnessDataset, x: &Matrix) -> Result<Matrix, EIError> {
        let mask = self.feature_mask(x.cols)?;
        let ranges = dataset.feature_ranges();
        let mut current = x.clone();
        // Each row's score depends on that row only, so one backward pass of
        // the summed scores yields every row's input gradient.
        let ones = vec![1.0; x.rows];
        for _ in 0..self.n_steps {
            let grads = model.backward(&current, &ones)?;
            for r in 0..current.rows {
                let origin = x.row(r);
                let g = grads.inputs.row(r);
                let row = current.row_mut(r);
                for j in 0..row.len() {
                    if !mask[j] {
                        continue;
                    }
                    let stepped = row[j] + self.step_size * sign(g[j]);
                    let mut v = stepped.max(origin[j] - self.delta).min(origin[j] + self.delta);
                    if let Some((lo, hi)) = ranges.get(j) {
                        if lo <= hi {
                            v = v.max(*lo).min(*hi);
                        }
                    }
                    row[j] = v;
                }
            }
        }
        Ok(current)
    }

    fn delta(&self) -> f64 {
        self.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, Linear, Sequential};

    fn model() -> Sequential {
        Sequential::new(vec![
            Layer::Linear(Linear {
                in_features: 2,
                out_features: 1,
                weight: vec![1.0, -1.0],
                bias: vec![0.0],
            }),
            Layer::Sigmoid,
        ])
        .unwrap()
    }

    fn dataset() -> FairnessDataset {
        let x = Matrix::from_rows(&[vec![-1.0, -1.0], vec![1.0, 1.0]]).unwrap();
        FairnessDataset::new(x, vec![0.0, 1.0], vec![0.0, 1.0]).unwrap()
    }

    #[test]
    fn test_gradient_effort_moves_towards_higher_score() {
        let m = model();
        let ds = dataset();
        let x = Matrix::from_rows(&[vec![0.0, 0.0]]).unwrap();
        let effort = GradientEffort::new(0.5).unwrap();
        let improved = effort.apply(&m, &ds, &x).unwrap();
        assert!((improved.get(0, 0) - 0.5).abs() < 1e-12);
        assert!((improved.get(0, 1) + 0.5).abs() < 1e-12);
        assert!(m.forward(&improved).unwrap()[0] > m.forward(&x).unwrap()[0]);
    }

    #[test]
    fn test_gradient_effort_respects_budget_and_range() {
        let m = model();
        let ds = dataset();
        let x = Matrix::from_rows(&[vec![0.9, -0.8]]).unwrap();
        let improved = GradientEffort::single_step(0.5).unwrap().apply(&m, &ds, &x).unwrap();
        // Clamped to the observed feature range [-1, 1].
        assert_eq!(improved.get(0, 0), 1.0);
        assert_eq!(improved.get(0, 1), -1.0);
    }

    #[test]
    fn test_improvable_features_only() {
        let m = model();
        let ds = dataset();
        let x = Matrix::from_rows(&[vec![0.0, 0.0]]).unwrap();
        let effort = GradientEffort::new(0.5).unwrap().with_improvable(vec![1]);
        let improved = effort.apply(&m, &ds, &x).unwrap();
        assert_eq!(improved.get(0, 0), 0.0);
        assert!(improved.get(0, 1) < 0.0);

        let bad = GradientEffort::new(0.5).unwrap().with_improvable(vec![5]);
        assert!(bad.apply(&m, &ds, &x).is_err());
    }

    #[test]
    fn test_no_effort_is_identity() {
        let x = Matrix::from_rows(&[vec![0.3, 0.1]]).unwrap();
        let out = NoEffort::default().apply(&model(), &dataset(), &x).unwrap();
        assert_eq!(out, x);
        assert!(GradientEffort::new(-1.0).is_err());
    }
}
