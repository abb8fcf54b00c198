//! Training Configuration
//!
//! Hyper-parameters of the adversarial fairness trainer and the predictor,
//! with serde defaults and JSON persistence.
use crate::constants::*;
use crate::errors::EIError;
use crate::sampler::SampleMethod;
use crate::utils::{validate_float_parameter, validate_nonzero_parameter, validate_positive_float_parameter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_alpha() -> f64 {
    0.0
}
fn default_lr() -> f64 {
    DEFAULT_LR
}
fn default_n_epochs() -> usize {
    DEFAULT_N_EPOCHS
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_abstol() -> f64 {
    DEFAULT_ABSTOL
}
fn default_pga_n_iters() -> usize {
    DEFAULT_PGA_N_ITERS
}
fn default_pga_lr() -> f64 {
    DEFAULT_PGA_LR
}
fn default_weight_decay() -> f64 {
    DEFAULT_WEIGHT_DECAY
}
fn default_sample_method() -> SampleMethod {
    SampleMethod::Shuffle
}
fn default_log_iterations() -> usize {
    0
}

/// Configuration for [`EIModel::train`](crate::EIModel::train).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Weight λ of the fairness loss, in `[0, 1]`.
    pub lamb: f64,
    /// Maximum adversarial perturbation radius, reached at the last epoch.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Learning rate of the primary model.
    #[serde(default = "default_lr")]
    pub lr: f64,
    #[serde(default = "default_n_epochs")]
    pub n_epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Tolerance of both the epoch convergence check and the inner ascent.
    #[serde(default = "default_abstol")]
    pub abstol: f64,
    /// Iteration cap of the inner ascent.
    #[serde(default = "default_pga_n_iters")]
    pub pga_n_iters: usize,
    /// Learning rate of the inner ascent.
    #[serde(default = "default_pga_lr")]
    pub pga_lr: f64,
    /// L2 penalty of the primary optimizer.
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// Seed of the batch shuffling.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_sample_method")]
    pub sample_method: SampleMethod,
    /// Logging frequency (every N epochs). Zero only logs convergence.
    #[serde(default = "default_log_iterations")]
    pub log_iterations: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            lamb: 0.0,
            alpha: 0.0,
            lr: DEFAULT_LR,
            n_epochs: DEFAULT_N_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            abstol: DEFAULT_ABSTOL,
            pga_n_iters: DEFAULT_PGA_N_ITERS,
            pga_lr: DEFAULT_PGA_LR,
            weight_decay: DEFAULT_WEIGHT_DECAY,
            seed: 0,
            sample_method: SampleMethod::Shuffle,
            log_iterations: 0,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), EIError> {
        validate_float_parameter(self.lamb, 0.0, 1.0, "lamb")?;
        validate_positive_float_parameter(self.alpha, "alpha")?;
        validate_float_parameter(self.lr, f64::MIN_POSITIVE, f64::INFINITY, "lr")?;
        validate_nonzero_parameter(self.n_epochs, "n_epochs")?;
        validate_nonzero_parameter(self.batch_size, "batch_size")?;
        validate_positive_float_parameter(self.abstol, "abstol")?;
        validate_float_parameter(self.pga_lr, f64::MIN_POSITIVE, f64::INFINITY, "pga_lr")?;
        validate_positive_float_parameter(self.weight_decay, "weight_decay")?;
        Ok(())
    }
}

/// Configuration for [`EIModel::predict_with`](crate::EIModel::predict_with).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredictConfig {
    /// Fixed adversarial radius.
    pub alpha: f64,
    #[serde(default = "default_abstol")]
    pub abstol: f64,
    #[serde(default = "default_pga_n_iters")]
    pub pga_n_iters: usize,
    #[serde(default = "default_pga_lr")]
    pub pga_lr: f64,
}

impl PredictConfig {
    pub fn new(alpha: f64) -> Self {
        PredictConfig {
            alpha,
            abstol: DEFAULT_ABSTOL,
            pga_n_iters: DEFAULT_PGA_N_ITERS,
            pga_lr: DEFAULT_PGA_LR,
        }
    }

    pub fn validate(&self) -> Result<(), EIError> {
        validate_positive_float_parameter(self.alpha, "alpha")?;
        validate_positive_float_parameter(self.abstol, "abstol")?;
        validate_float_parameter(self.pga_lr, f64::MIN_POSITIVE, f64::INFINITY, "pga_lr")?;
        Ok(())
    }
}

/// IO
pub trait JsonIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EIError> {
        fs::write(path, self.json_dump()?).map_err(|e| EIError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object
    fn json_dump(&self) -> Result<String, EIError> {
        serde_json::to_string(self).map_err(|e| EIError::UnableToWrite(e.to_string()))
    }

    /// Load from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, EIError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| EIError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, EIError> {
        let json_str = fs::read_to_string(path).map_err(|e| EIError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl JsonIO for TrainConfig {}
impl JsonIO for PredictConfig {}
impl JsonIO for crate::model::Sequential {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sequential;
    use tempfile::tempdir;

    #[test]
    fn test_train_config_default() {
        let config = TrainConfig::default();
        assert_eq!(config.n_epochs, 100);
        assert_eq!(config.batch_size, 1024);
        assert_eq!(config.abstol, 1e-7);
        assert_eq!(config.pga_n_iters, 50);
        assert_eq!(config.sample_method, SampleMethod::Shuffle);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"lamb": 0.5, "alpha": 0.1}"#;
        let config = TrainConfig::from_json(json).unwrap();
        assert_eq!(config.lamb, 0.5);
        assert_eq!(config.alpha, 0.1);
        assert_eq!(config.lr, 1e-3);
        assert_eq!(config.weight_decay, 1e-4);
        assert_eq!(config.seed, 0);
        assert!(TrainConfig::from_json("{}").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_lamb = TrainConfig {
            lamb: 1.5,
            ..Default::default()
        };
        assert!(bad_lamb.validate().is_err());
        let bad_batch = TrainConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(bad_batch.validate().is_err());
        let bad_lr = TrainConfig {
            lr: 0.0,
            ..Default::default()
        };
        assert!(bad_lr.validate().is_err());
        assert!(PredictConfig::new(-0.1).validate().is_err());
    }

    #[test]
    fn test_config_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let config = TrainConfig {
            lamb: 0.3,
            n_epochs: 7,
            ..Default::default()
        };
        config.save(&file_path).unwrap();
        let config2 = TrainConfig::load(&file_path).unwrap();
        assert_eq!(config2.lamb, 0.3);
        assert_eq!(config2.n_epochs, 7);
        assert!(TrainConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_model_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("model.json");
        let model = Sequential::mlp(3, &[2], 9);
        model.save(&file_path).unwrap();
        assert_eq!(Sequential::load(&file_path).unwrap(), model);
    }
}
