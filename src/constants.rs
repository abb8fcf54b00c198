pub const DEFAULT_TAU: f64 = 0.5;
pub const DEFAULT_LR: f64 = 1e-3;
pub const DEFAULT_PGA_LR: f64 = 1e-3;
pub const DEFAULT_WEIGHT_DECAY: f64 = 1e-4;
pub const DEFAULT_N_EPOCHS: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 1024;
pub const DEFAULT_ABSTOL: f64 = 1e-7;
pub const DEFAULT_PGA_N_ITERS: usize = 50;
pub const ADAM_BETA1: f64 = 0.9;
pub const ADAM_BETA2: f64 = 0.999;
pub const ADAM_EPSILON: f64 = 1e-8;
/// Lower clamp applied to `ln` inside binary cross-entropy.
pub const LOG_CLAMP: f64 = -100.0;
pub const PROB_EPSILON: f64 = 1e-12;
