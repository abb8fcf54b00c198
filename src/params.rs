//! Parameters
//!
//! Value-type snapshots of model parameters (`ParamArena`) and the per-tensor
//! box constraints (`BoxBounds`) the adversary is projected into.
use crate::errors::EIError;
use serde::{Deserialize, Serialize};

/// Which handle of a layer a tensor belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParamKind {
    Weight,
    Bias,
}

/// Location of a parameter tensor inside a model: the layer index and the handle.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct ParamSlot {
    pub layer: usize,
    pub kind: ParamKind,
}

/// A flat parameter tensor together with the slot it was read from.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ParamTensor {
    pub slot: ParamSlot,
    pub values: Vec<f64>,
}

/// Owned copy of every parameter tensor of a model, in slot order.
///
/// Also used to carry gradients, which share the layout of the parameters.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ParamArena {
    pub tensors: Vec<ParamTensor>,
}

impl ParamArena {
    pub fn new(tensors: Vec<ParamTensor>) -> Self {
        ParamArena { tensors }
    }

    /// Same layout, every value set to zero.
    pub fn zeros_like(&self) -> Self {
        ParamArena {
            tensors: self
                .tensors
                .iter()
                .map(|t| ParamTensor {
                    slot: t.slot,
                    values: vec![0.0; t.values.len()],
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Total number of scalar parameters.
    pub fn n_values(&self) -> usize {
        self.tensors.iter().map(|t| t.values.len()).sum()
    }

    /// Check that `other` has the same slots and tensor sizes.
    pub fn check_layout(&self, other: &ParamArena) -> Result<(), EIError> {
        if self.tensors.len() != other.tensors.len() {
            return Err(EIError::ParameterLayout(format!(
                "expected {} tensors, found {}",
                self.tensors.len(),
                other.tensors.len()
            )));
        }
        for (a, b) in self.tensors.iter().zip(other.tensors.iter()) {
            if a.slot != b.slot || a.values.len() != b.values.len() {
                return Err(EIError::ParameterLayout(format!(
                    "tensor {:?} with {} values does not match {:?} with {} values",
                    a.slot,
                    a.values.len(),
                    b.slot,
                    b.values.len()
                )));
            }
        }
        Ok(())
    }

    /// `self += scale * other`, element-wise. Layouts must match.
    pub fn add_scaled(&mut self, other: &ParamArena, scale: f64) {
        for (a, b) in self.tensors.iter_mut().zip(other.tensors.iter()) {
            a.values.iter_mut().zip(b.values.iter()).for_each(|(x, y)| *x += scale * y);
        }
    }

    pub fn scale(&mut self, scale: f64) {
        for t in self.tensors.iter_mut() {
            t.values.iter_mut().for_each(|x| *x *= scale);
        }
    }

    pub fn is_finite(&self) -> bool {
        self.tensors.iter().all(|t| t.values.iter().all(|v| v.is_finite()))
    }

    /// Largest absolute element-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &ParamArena) -> f64 {
        self.tensors
            .iter()
            .zip(other.tensors.iter())
            .flat_map(|(a, b)| a.values.iter().zip(b.values.iter()).map(|(x, y)| (x - y).abs()))
            .fold(0.0, f64::max)
    }
}

/// Element-wise lower and upper bound for every parameter tensor.
///
/// Built once per snapshot from the primary parameters; one box per tensor.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct BoxBounds {
    pub lower: ParamArena,
    pub upper: ParamArena,
}

impl BoxBounds {
    /// The L∞ ball `[center - radius, center + radius]` around every tensor.
    pub fn around(center: &ParamArena, radius: f64) -> Self {
        let radius = radius.max(0.0);
        let mut lower = center.clone();
        let mut upper = center.clone();
        for t in lower.tensors.iter_mut() {
            t.values.iter_mut().for_each(|v| *v -= radius);
        }
        for t in upper.tensors.iter_mut() {
            t.values.iter_mut().for_each(|v| *v += radius);
        }
        BoxBounds { lower, upper }
    }

    /// Clamp every value of `params` into the box.
    pub fn project(&self, params: &mut ParamArena) {
        for ((p, lo), hi) in params
            .tensors
            .iter_mut()
            .zip(self.lower.tensors.iter())
            .zip(self.upper.tensors.iter())
        {
            for ((v, l), h) in p.values.iter_mut().zip(lo.values.iter()).zip(hi.values.iter()) {
                *v = v.max(*l).min(*h);
            }
        }
    }

    /// Whether every value of `params` lies inside the box, with tolerance `eps`.
    pub fn contains(&self, params: &ParamArena, eps: f64) -> bool {
        params
            .tensors
            .iter()
            .zip(self.lower.tensors.iter())
            .zip(self.upper.tensors.iter())
            .all(|((p, lo), hi)| {
                p.values
                    .iter()
                    .zip(lo.values.iter())
                    .zip(hi.values.iter())
                    .all(|((v, l), h)| *v >= l - eps && *v <= h + eps)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ParamArena {
        ParamArena::new(vec![
            ParamTensor {
                slot: ParamSlot {
                    layer: 0,
                    kind: ParamKind::Weight,
                },
                values: vec![1.0, -2.0, 0.5],
            },
            ParamTensor {
                slot: ParamSlot {
                    layer: 0,
                    kind: ParamKind::Bias,
                },
                values: vec![0.25],
            },
        ])
    }

    #[test]
    fn test_box_project() {
        let center = arena();
        let bounds = BoxBounds::around(&center, 0.1);
        let mut p = center.clone();
        p.tensors[0].values = vec![5.0, -5.0, 0.55];
        p.tensors[1].values = vec![0.0];
        assert!(!bounds.contains(&p, 0.0));
        bounds.project(&mut p);
        assert!(bounds.contains(&p, 1e-12));
        assert!((p.tensors[0].values[0] - 1.1).abs() < 1e-12);
        assert!((p.tensors[0].values[1] + 2.1).abs() < 1e-12);
        assert_eq!(p.tensors[0].values[2], 0.55);
        assert!((p.tensors[1].values[0] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_zero_radius_pins_values() {
        let center = arena();
        let bounds = BoxBounds::around(&center, 0.0);
        let mut p = center.zeros_like();
        bounds.project(&mut p);
        assert_eq!(p, center);
    }

    #[test]
    fn test_layout_and_arithmetic() {
        let a = arena();
        let mut b = a.zeros_like();
        assert!(a.check_layout(&b).is_ok());
        b.add_scaled(&a, 2.0);
        assert_eq!(b.tensors[0].values, vec![2.0, -4.0, 1.0]);
        b.scale(0.5);
        assert_eq!(b, a);
        assert_eq!(a.n_values(), 4);
        assert_eq!(a.max_abs_diff(&a.zeros_like()), 2.0);

        let mut short = a.clone();
        short.tensors.pop();
        assert!(a.check_layout(&short).is_err());
    }
}
