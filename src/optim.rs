//! Optimizer
//!
//! Adam over a [`ParamArena`], usable both for descent (the primary model) and
//! ascent (the adversary).
use crate::constants::{ADAM_BETA1, ADAM_BETA2, ADAM_EPSILON};
use crate::params::ParamArena;
use serde::{Deserialize, Serialize};

/// Which way a step moves the objective.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum Direction {
    /// Minimize: parameters move along `-gradient`.
    Descent,
    /// Maximize: parameters move along `+gradient`.
    Ascent,
}

/// Adam with bias correction and optional L2 weight decay.
///
/// The moments are kept for the descent-oriented gradient
/// `d = s · g + weight_decay · θ` with `s = +1` for [`Direction::Descent`] and
/// `s = -1` for [`Direction::Ascent`], and every step applies
/// `θ ← θ − lr · m̂ / (√v̂ + ε)`. For ascent this moves `θ` along the positive
/// gradient of the objective.
#[derive(Clone, Debug)]
pub struct Adam {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub weight_decay: f64,
    pub direction: Direction,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
    t: usize,
}

impl Adam {
    pub fn new(lr: f64, direction: Direction) -> Self {
        Adam {
            lr,
            beta1: ADAM_BETA1,
            beta2: ADAM_BETA2,
            epsilon: ADAM_EPSILON,
            weight_decay: 0.0,
            direction,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> usize {
        self.t
    }

    /// Apply one update to `params` using `grads`, which must share its layout.
    pub fn step(&mut self, params: &mut ParamArena, grads: &ParamArena) {
        if self.m.len() != params.tensors.len() {
            self.m = params.tensors.iter().map(|t| vec![0.0; t.values.len()]).collect();
            self.v = self.m.clone();
        }
        self.t += 1;
        let s = match self.direction {
            Direction::Descent => 1.0,
            Direction::Ascent => -1.0,
        };
        let bc1 = 1.0 - self.beta1.powi(self.t as i32);
        let bc2 = 1.0 - self.beta2.powi(self.t as i32);

        for (idx, (p, g)) in params.tensors.iter_mut().zip(grads.tensors.iter()).enumerate() {
            let m = &mut self.m[idx];
            let v = &mut self.v[idx];
            for i in 0..p.values.len() {
                let d = s * g.values[i] + self.weight_decay * p.values[i];
                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * d;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * d * d;
                let m_hat = m[i] / bc1;
                let v_hat = v[i] / bc2;
                p.values[i] -= self.lr * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamKind, ParamSlot, ParamTensor};

    fn scalar(v: f64) -> ParamArena {
        ParamArena::new(vec![ParamTensor {
            slot: ParamSlot {
                layer: 0,
                kind: ParamKind::Weight,
            },
            values: vec![v],
        }])
    }

    #[test]
    fn test_first_step_size_is_lr() {
        let mut p = scalar(1.0);
        let mut opt = Adam::new(0.1, Direction::Descent);
        opt.step(&mut p, &scalar(3.0));
        assert!((p.tensors[0].values[0] - 0.9).abs() < 1e-6);
        assert_eq!(opt.steps(), 1);
    }

    #[test]
    fn test_ascent_moves_with_gradient() {
        let mut p = scalar(1.0);
        let mut opt = Adam::new(0.1, Direction::Ascent);
        opt.step(&mut p, &scalar(3.0));
        assert!((p.tensors[0].values[0] - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_descent_minimizes_quadratic() {
        // f(x) = (x - 2)^2
        let mut p = scalar(-1.0);
        let mut opt = Adam::new(0.05, Direction::Descent);
        for _ in 0..2000 {
            let x = p.tensors[0].values[0];
            opt.step(&mut p, &scalar(2.0 * (x - 2.0)));
        }
        assert!((p.tensors[0].values[0] - 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_zero_gradient_is_noop() {
        let mut p = scalar(0.5);
        let mut opt = Adam::new(0.1, Direction::Ascent);
        opt.step(&mut p, &scalar(0.0));
        assert_eq!(p.tensors[0].values[0], 0.5);
    }
}
