//! Adversarial inner solver
//!
//! Projected gradient ascent over the parameters of a snapshot of the primary
//! model. The adversary may move every weight and bias inside its box and
//! looks for the perturbation that maximizes the fairness proxy on the
//! effort-transformed rows.
use crate::constants::{DEFAULT_ABSTOL, DEFAULT_PGA_LR, DEFAULT_PGA_N_ITERS};
use crate::data::Matrix;
use crate::errors::EIError;
use crate::model::Classifier;
use crate::optim::{Adam, Direction};
use crate::params::{BoxBounds, ParamArena};
use crate::proxy::FairnessProxy;
use crate::utils::fmt_vec_output;
use log::trace;

/// Settings of one projected gradient ascent run.
#[derive(Debug, Clone, Copy)]
pub struct PgaSolver {
    /// Iteration cap.
    pub n_iters: usize,
    /// Stop once two consecutive proxy values differ by less than this.
    pub abstol: f64,
    /// Adam learning rate of the adversary.
    pub lr: f64,
}

impl Default for PgaSolver {
    fn default() -> Self {
        PgaSolver {
            n_iters: DEFAULT_PGA_N_ITERS,
            abstol: DEFAULT_ABSTOL,
            lr: DEFAULT_PGA_LR,
        }
    }
}

/// Result of [`PgaSolver::run`].
#[derive(Debug, Clone)]
pub struct AdversarialOutcome<M> {
    /// The perturbed copy, every parameter inside the box.
    pub model: M,
    /// Proxy value of `model` on the effort-transformed rows.
    pub fairness: f64,
    /// Scores of `model` on the effort-transformed rows.
    pub scores: Vec<f64>,
    /// Gradient of `fairness` w.r.t. the parameters of `model`.
    pub gradient: ParamArena,
    /// Proxy value seen at the start of every iteration.
    pub trace: Vec<f64>,
    /// Whether the tolerance was met before the cap.
    pub converged: bool,
}

impl<M> AdversarialOutcome<M> {
    pub fn iterations(&self) -> usize {
        self.trace.len()
    }
}

impl PgaSolver {
    pub fn new(n_iters: usize, abstol: f64, lr: f64) -> Self {
        PgaSolver { n_iters, abstol, lr }
    }

    /// Search the box around `primary` for the parameters maximizing `proxy(z, model(x))`.
    ///
    /// * `primary` - Model the snapshot is copied from. Never modified.
    /// * `x` - Effort-transformed rows.
    /// * `z` - Group attribute of those rows.
    /// * `bounds` - Per tensor box, usually `BoxBounds::around(primary.parameters(), radius)`.
    /// * `proxy` - Objective to maximize.
    pub fn run<M: Classifier, P: FairnessProxy>(
        &self,
        primary: &M,
        x: &Matrix,
        z: &[f64],
        bounds: &BoxBounds,
        proxy: &P,
    ) -> Result<AdversarialOutcome<M>, EIError> {
        if z.len() != x.rows {
            return Err(EIError::ShapeMismatch("group attribute".to_string(), x.rows, z.len()));
        }
        let mut adversary = primary.bounded_init(bounds)?;
        let mut params = adversary.parameters();

        if x.is_empty() {
            return Ok(AdversarialOutcome {
                gradient: params.zeros_like(),
                model: adversary,
                fairness: 0.0,
                scores: Vec::new(),
                trace: Vec::new(),
                converged: true,
            });
        }

        let mut optimizer = Adam::new(self.lr, Direction::Ascent);
        let mut trace = Vec::with_capacity(self.n_iters);
        let mut value = 0.0;
        let mut converged = false;

        for _ in 0..self.n_iters {
            let prev = value;
            let scores = adversary.forward(x)?;
            let (v, grad_scores) = proxy.value_and_gradient(z, &scores);
            value = v;
            trace.push(value);

            let grads = adversary.backward(x, &grad_scores)?;
            optimizer.step(&mut params, &grads.params);
            bounds.project(&mut params);
            adversary.set_parameters(&params)?;

            if (prev - value).abs() < self.abstol {
                converged = true;
                break;
            }
        }
        trace!(
            "pga finished after {} iterations, converged: {}, proxy trace: [{}]",
            trace.len(),
            converged,
            fmt_vec_output(&trace)
        );

        let scores = adversary.forward(x)?;
        let (fairness, grad_scores) = proxy.value_and_gradient(z, &scores);
        let gradient = adversary.backward(x, &grad_scores)?.params;

        Ok(AdversarialOutcome {
            model: adversary,
            fairness,
            scores,
            gradient,
            trace,
            converged,
        })
    }
}
