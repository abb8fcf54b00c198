//! Synthetic Lending – Equal Improvability Training
//! =================================================
//! Two groups share the same label rule, but group 1 is shifted away from
//! the decision boundary on the first feature. A plain logistic model
//! (`lamb = 0`) is compared with one trained against the worst-case
//! mean-gap proxy (`lamb = 0.5`). For both we report accuracy, the nominal
//! disparity and the disparity of the adversarial model after effort.
//!
//! The fair model is **saved to a JSON file** and loaded back before the
//! final evaluation.
//!
//! ```bash
//! cargo run --release --example synthetic
//! ```

use eifair::ei_model::JsonIO;
use eifair::proxy::{FairnessProxy, Proxy};
use eifair::{EIModel, FairnessDataset, GradientEffort, Matrix, Sequential, TrainConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;

fn make_dataset(n: usize, seed: u64) -> Result<FairnessDataset, Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(n * 2);
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);
    for _ in 0..n {
        let group = if rng.gen_bool(0.5) { 1.0 } else { 0.0 };
        let x0: f64 = rng.gen_range(-2.0..2.0) - 0.8 * group;
        let x1: f64 = rng.gen_range(-1.0..1.0);
        let label = if x0 + 0.5 * x1 + rng.gen_range(-0.3..0.3) > 0.0 { 1.0 } else { 0.0 };
        data.push(x0);
        data.push(x1);
        y.push(label);
        z.push(group);
    }
    Ok(FairnessDataset::new(Matrix::new(data, n, 2)?, y, z)?)
}

fn accuracy(y: &[f64], yhat: &[f64]) -> f64 {
    let hits = y.iter().zip(yhat).filter(|(a, b)| (**b >= 0.5) == (**a == 1.0)).count();
    hits as f64 / y.len() as f64
}

fn main() -> Result<(), Box<dyn Error>> {
    // ------------------------------------------------------------------
    // 1. Data
    // ------------------------------------------------------------------
    let train = make_dataset(4000, 0)?;
    let test = make_dataset(1000, 1)?;
    println!("Train rows: {}, test rows: {}", train.len(), test.len());

    // ------------------------------------------------------------------
    // 2. Train with and without the fairness term
    // ------------------------------------------------------------------
    let alpha = 0.1;
    let delta = 0.5;
    let mut fair_model_path = std::env::temp_dir();
    fair_model_path.push("eifair_synthetic_model.json");

    for lamb in [0.0, 0.5] {
        let cfg = TrainConfig {
            lamb,
            alpha,
            lr: 0.01,
            n_epochs: 50,
            batch_size: 256,
            ..Default::default()
        };
        let effort = GradientEffort::new(delta)?;
        let mut ei = EIModel::new(Sequential::logistic(2, 0), Proxy::MeanGap, effort, 0.5)?;
        ei.train(&train, &cfg)?;

        let out = ei.predict(&test, alpha)?;
        println!(
            "lamb = {:.1}: epochs {}, accuracy {:.4}, BCE {:.4}, nominal gap {:.4}, adversarial gap {:.4}",
            lamb,
            ei.history().len(),
            accuracy(test.y(), &out.y_hat),
            out.pred_loss,
            Proxy::MeanGap.value(test.z(), &out.y_hat),
            out.fair_loss,
        );

        if lamb > 0.0 {
            ei.model.save(&fair_model_path)?;
        }
    }

    // ------------------------------------------------------------------
    // 3. Reload the fair model
    // ------------------------------------------------------------------
    let model = Sequential::load(&fair_model_path)?;
    let mut ei = EIModel::new(model, Proxy::MeanGap, GradientEffort::new(delta)?, 0.5)?;
    let out = ei.predict(&test, alpha)?;
    println!(
        "Reloaded model from {}: accuracy {:.4}, adversarial gap {:.4}",
        fair_model_path.display(),
        accuracy(test.y(), &out.y_hat),
        out.fair_loss
    );

    Ok(())
}
