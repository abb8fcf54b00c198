//! Per epoch diagnostics collected while training. Never read by the trainer.
use crate::ei_model::config::JsonIO;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    /// Adversarial radius used during the epoch.
    pub radius: f64,
    /// Mean combined loss over the batches that took a step.
    pub mean_loss: Option<f64>,
    pub mean_pred_loss: Option<f64>,
    pub mean_fair_loss: Option<f64>,
    /// Distance to the previous epoch's mean loss.
    pub loss_diff: Option<f64>,
    pub batches: usize,
    /// Batches dropped because their loss or gradient was not finite.
    pub skipped: usize,
    /// Inner ascent iterations summed over the epoch.
    pub pga_iterations: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct TrainHistory {
    pub epochs: Vec<EpochRecord>,
    /// Epoch at which the last call to `train` met the convergence tolerance.
    pub converged_at: Option<usize>,
}

impl TrainHistory {
    pub fn push(&mut self, record: EpochRecord) {
        self.epochs.push(record);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.epochs.last()
    }

    /// Mean combined loss of every epoch that recorded one.
    pub fn losses(&self) -> Vec<f64> {
        self.epochs.iter().filter_map(|e| e.mean_loss).collect()
    }
}

impl JsonIO for TrainHistory {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: usize, loss: Option<f64>) -> EpochRecord {
        EpochRecord {
            epoch,
            radius: 0.0,
            mean_loss: loss,
            mean_pred_loss: loss,
            mean_fair_loss: Some(0.0),
            loss_diff: None,
            batches: 1,
            skipped: 0,
            pga_iterations: 0,
        }
    }

    #[test]
    fn test_history() {
        let mut h = TrainHistory::default();
        assert!(h.is_empty());
        h.push(record(0, Some(0.7)));
        h.push(record(1, None));
        h.push(record(2, Some(0.5)));
        assert_eq!(h.len(), 3);
        assert_eq!(h.losses(), vec![0.7, 0.5]);
        assert_eq!(h.last().unwrap().epoch, 2);

        let json = h.json_dump().unwrap();
        assert_eq!(TrainHistory::from_json(&json).unwrap(), h);
    }
}
