use crate::adversarial::PgaSolver;
use crate::constants::DEFAULT_TAU;
use crate::data::{mask_to_index, select, Batch, FairnessDataset};
use crate::effort::Effort;
use crate::ei_model::config::TrainConfig;
use crate::ei_model::history::{EpochRecord, TrainHistory};
use crate::errors::EIError;
use crate::model::Classifier;
use crate::objective::{LogLoss, ObjectiveFunction};
use crate::optim::{Adam, Direction};
use crate::params::BoxBounds;
use crate::proxy::FairnessProxy;
use crate::utils::{mean, validate_float_parameter};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

/// Radius of the adversarial box at `epoch`, growing linearly from 0 towards `alpha`.
#[inline]
pub fn warmup_radius(alpha: f64, epoch: usize, n_epochs: usize) -> f64 {
    if n_epochs == 0 {
        return 0.0;
    }
    alpha * (epoch as f64 / n_epochs as f64)
}

/// What happened to one mini-batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BatchOutcome {
    Applied {
        loss: f64,
        pred_loss: f64,
        fair_loss: f64,
        pga_iterations: usize,
    },
    Skipped {
        pga_iterations: usize,
    },
}

/// Classifier trained for equal improvability under adversarial parameter perturbation.
///
/// * `model` - The primary classifier, updated in place by [`train`](EIModel::train).
/// * `proxy` - Fairness proxy the adversary maximizes.
/// * `effort` - Improvement available to rows scored below `tau`.
/// * `tau` - Decision threshold.
pub struct EIModel<M, P, E> {
    pub model: M,
    pub proxy: P,
    pub effort: E,
    pub tau: f64,
    pub(crate) history: TrainHistory,
    pub(crate) adversarial: Option<M>,
}

impl<M, P, E> EIModel<M, P, E>
where
    M: Classifier,
    P: FairnessProxy,
    E: Effort,
{
    pub fn new(model: M, proxy: P, effort: E, tau: f64) -> Result<Self, EIError> {
        validate_float_parameter(tau, 0.0, 1.0, "tau")?;
        Ok(EIModel {
            model,
            proxy,
            effort,
            tau,
            history: TrainHistory::default(),
            adversarial: None,
        })
    }

    /// Same as [`new`](EIModel::new) with `tau = 0.5`.
    pub fn with_default_tau(model: M, proxy: P, effort: E) -> Self {
        EIModel {
            model,
            proxy,
            effort,
            tau: DEFAULT_TAU,
            history: TrainHistory::default(),
            adversarial: None,
        }
    }

    pub fn history(&self) -> &TrainHistory {
        &self.history
    }

    /// Adversarial model retained by the last prediction call.
    pub fn adversarial_model(&self) -> Option<&M> {
        self.adversarial.as_ref()
    }

    pub(crate) fn check_dataset(&self, dataset: &FairnessDataset) -> Result<(), EIError> {
        if dataset.is_empty() {
            return Err(EIError::EmptyDataset);
        }
        if dataset.n_features() != self.model.n_features() {
            return Err(EIError::ShapeMismatch(
                "dataset features".to_string(),
                self.model.n_features(),
                dataset.n_features(),
            ));
        }
        Ok(())
    }

    /// Train the primary model.
    ///
    /// Every mini-batch takes one optimizer step on
    /// `(1 - lamb) · BCE + lamb · fairness`, where the fairness term is the
    /// proxy of the worst-case model found by projected gradient ascent in a
    /// box of radius `alpha · epoch / n_epochs` around the current parameters,
    /// evaluated on the effort-improved rows scored below `tau`. Training ends
    /// early once two consecutive epoch mean losses differ by less than `abstol`.
    ///
    /// * `dataset` - Rows to train on.
    /// * `cfg` - Hyper-parameters, see [`TrainConfig`].
    pub fn train(&mut self, dataset: &FairnessDataset, cfg: &TrainConfig) -> Result<&mut Self, EIError> {
        cfg.validate()?;
        self.check_dataset(dataset)?;

        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let solver = PgaSolver::new(cfg.pga_n_iters, cfg.abstol, cfg.pga_lr);
        let mut optimizer = Adam::new(cfg.lr, Direction::Descent).with_weight_decay(cfg.weight_decay);
        let mut prev_loss = 0.0;
        self.history.converged_at = None;

        for epoch in 0..cfg.n_epochs {
            let radius = warmup_radius(cfg.alpha, epoch, cfg.n_epochs);
            let mut losses = Vec::new();
            let mut pred_losses = Vec::new();
            let mut fair_losses = Vec::new();
            let mut skipped = 0;
            let mut pga_total = 0;

            for batch in dataset.batches(cfg.batch_size, cfg.sample_method, &mut rng) {
                match self.step_batch(dataset, &batch, radius, cfg.lamb, &solver, &mut optimizer)? {
                    BatchOutcome::Applied {
                        loss,
                        pred_loss,
                        fair_loss,
                        pga_iterations,
                    } => {
                        losses.push(loss);
                        pred_losses.push(pred_loss);
                        fair_losses.push(fair_loss);
                        pga_total += pga_iterations;
                    }
                    BatchOutcome::Skipped { pga_iterations } => {
                        skipped += 1;
                        pga_total += pga_iterations;
                    }
                }
            }

            let mean_loss = mean(&losses);
            let loss_diff = mean_loss.map(|l| (l - prev_loss).abs());
            self.history.push(EpochRecord {
                epoch,
                radius,
                mean_loss,
                mean_pred_loss: mean(&pred_losses),
                mean_fair_loss: mean(&fair_losses),
                loss_diff,
                batches: losses.len(),
                skipped,
                pga_iterations: pga_total,
            });

            if cfg.log_iterations > 0 && epoch % cfg.log_iterations == 0 {
                info!(
                    "epoch {}, radius: {:.4}, delta: {:.4}, loss: {:?}, pred loss: {:?}, fair loss: {:?}, skipped: {}",
                    epoch,
                    radius,
                    self.effort.delta(),
                    mean_loss,
                    mean(&pred_losses),
                    mean(&fair_losses),
                    skipped,
                );
            }

            if let Some(diff) = loss_diff {
                if diff < cfg.abstol {
                    info!(
                        "Converged at epoch {} with batch loss {:?} and loss diff {}.",
                        epoch, mean_loss, diff
                    );
                    self.history.converged_at = Some(epoch);
                    return Ok(self);
                }
            }
            if let Some(l) = mean_loss {
                prev_loss = l;
            }
        }

        if cfg.log_iterations > 0 {
            info!(
                "Finished training for {0} epochs in {1} seconds, last loss: {2:?}.",
                cfg.n_epochs,
                start.elapsed().as_secs(),
                self.history.last().and_then(|e| e.mean_loss),
            );
        }

        Ok(self)
    }

    /// One optimizer step on a mini-batch, unless its loss is not finite.
    pub(crate) fn step_batch(
        &mut self,
        dataset: &FairnessDataset,
        batch: &Batch,
        radius: f64,
        lamb: f64,
        solver: &PgaSolver,
        optimizer: &mut Adam,
    ) -> Result<BatchOutcome, EIError> {
        let y_hat = self.model.forward(&batch.x)?;
        let (pred_loss, pred_grad_scores) = LogLoss::default().loss_and_gradient(&batch.y, &y_hat);
        let mut grads = self.model.backward(&batch.x, &pred_grad_scores)?.params;
        grads.scale(1.0 - lamb);

        let eligible: Vec<bool> = y_hat.iter().map(|p| *p < self.tau).collect();
        let mut fair_loss = 0.0;
        let mut pga_iterations = 0;
        if eligible.iter().any(|e| *e) {
            let index = mask_to_index(&eligible);
            let x_e = batch.x.select_rows(&index);
            let z_e = select(&batch.z, &index);
            let x_improved = self.effort.apply(&self.model, dataset, &x_e)?;

            let bounds = BoxBounds::around(&self.model.parameters(), radius);
            let outcome = solver.run(&self.model, &x_improved, &z_e, &bounds, &self.proxy)?;
            fair_loss = outcome.fairness;
            pga_iterations = outcome.iterations();
            // The perturbation is held fixed, so the gradient at the adversarial
            // parameters is the gradient w.r.t. the primary parameters.
            grads.add_scaled(&outcome.gradient, lamb);
        }

        let loss = (1.0 - lamb) * pred_loss + lamb * fair_loss;
        if !loss.is_finite() || !grads.is_finite() {
            debug!("Skipping batch of {} rows with non-finite loss {}.", batch.y.len(), loss);
            return Ok(BatchOutcome::Skipped { pga_iterations });
        }

        let mut params = self.model.parameters();
        optimizer.step(&mut params, &grads);
        self.model.set_parameters(&params)?;

        Ok(BatchOutcome::Applied {
            loss,
            pred_loss,
            fair_loss,
            pga_iterations,
        })
    }
}
