// Modules
pub mod adversarial;
pub mod constants;
pub mod data;
pub mod effort;
pub mod ei_model;
pub mod errors;
pub mod model;
pub mod objective;
pub mod optim;
pub mod params;
pub mod proxy;
pub mod sampler;
pub mod utils;

// Individual classes, and functions
pub use data::{FairnessDataset, Matrix};
pub use effort::{Effort, GradientEffort, NoEffort};
pub use ei_model::{EIModel, PredictConfig, Prediction, TrainConfig};
pub use model::{Classifier, Sequential};
pub use proxy::{CovarianceProxy, FairnessProxy, MeanGapProxy, Proxy};
