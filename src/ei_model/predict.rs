use crate::adversarial::PgaSolver;
use crate::data::{mask_to_index, select, FairnessDataset};
use crate::effort::Effort;
use crate::ei_model::config::PredictConfig;
use crate::ei_model::core::EIModel;
use crate::errors::EIError;
use crate::model::Classifier;
use crate::objective::{LogLoss, ObjectiveFunction};
use crate::params::BoxBounds;
use crate::proxy::FairnessProxy;
use log::debug;

/// Output of [`EIModel::predict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Scores of the primary model on every row.
    pub y_hat: Vec<f64>,
    /// Scores of the adversarial model on the effort-improved rows scored below `tau`.
    /// Empty when no row is below `tau`.
    pub y_hat_adv: Vec<f64>,
    /// Binary cross-entropy of `y_hat`.
    pub pred_loss: f64,
    /// Proxy value of `y_hat_adv`, zero when no row is below `tau`.
    pub fair_loss: f64,
}

impl<M, P, E> EIModel<M, P, E>
where
    M: Classifier,
    P: FairnessProxy,
    E: Effort,
{
    /// Evaluate on the whole dataset with an adversary of fixed radius `alpha`,
    /// using the default tolerance and iteration cap.
    pub fn predict(&mut self, dataset: &FairnessDataset, alpha: f64) -> Result<Prediction, EIError> {
        self.predict_with(dataset, &PredictConfig::new(alpha))
    }

    /// Evaluate on the whole dataset.
    ///
    /// Runs one forward pass, then a single projected gradient ascent with
    /// radius `cfg.alpha` on the effort-improved rows below `tau`. The
    /// adversarial model is kept and exposed by [`adversarial_model`](EIModel::adversarial_model).
    pub fn predict_with(&mut self, dataset: &FairnessDataset, cfg: &PredictConfig) -> Result<Prediction, EIError> {
        cfg.validate()?;
        self.check_dataset(dataset)?;

        let y_hat = self.model.forward(dataset.x())?;
        let pred_loss = LogLoss::default().loss(dataset.y(), &y_hat);

        let eligible: Vec<bool> = y_hat.iter().map(|p| *p < self.tau).collect();
        let index = mask_to_index(&eligible);
        if index.is_empty() {
            debug!("No row scored below {}, skipping the adversarial search.", self.tau);
            self.adversarial = Some(self.model.clone());
            return Ok(Prediction {
                y_hat,
                y_hat_adv: Vec::new(),
                pred_loss,
                fair_loss: 0.0,
            });
        }

        let x_e = dataset.x().select_rows(&index);
        let z_e = select(dataset.z(), &index);
        let x_improved = self.effort.apply(&self.model, dataset, &x_e)?;

        let solver = PgaSolver::new(cfg.pga_n_iters, cfg.abstol, cfg.pga_lr);
        let bounds = BoxBounds::around(&self.model.parameters(), cfg.alpha);
        let outcome = solver.run(&self.model, &x_improved, &z_e, &bounds, &self.proxy)?;
        debug!(
            "Adversarial search on {} rows took {} iterations, fairness loss {}.",
            index.len(),
            outcome.iterations(),
            outcome.fairness
        );

        self.adversarial = Some(outcome.model);
        Ok(Prediction {
            y_hat,
            y_hat_adv: outcome.scores,
            pred_loss,
            fair_loss: outcome.fairness,
        })
    }
}
