//! EI Model
//!
//! The adversarial fairness trainer and predictor.
//!
//! # Submodules
//!
//! * `config`: Training and prediction hyper-parameters, JSON persistence.
//! * `core`: The `EIModel` wrapper and its training loop.
//! * `history`: Per epoch diagnostics.
//! * `predict`: Nominal and adversarial evaluation on a whole dataset.
pub mod config;
pub mod core;
pub mod history;
pub mod predict;


pub use self::config::{JsonIO, PredictConfig, TrainConfig};
pub use self::core::{warmup_radius, EIModel};
pub use self::history::{EpochRecord, TrainHistory};
pub use self::predict::Prediction;
