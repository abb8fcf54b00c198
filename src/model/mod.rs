//! Model
//!
//! The contract the trainer expects from a differentiable binary classifier
//! (`Classifier`), and a small sequential implementation of it.
//!
//! # Submodules
//!
//! * `layer`: Linear and activation layers exposing optional weight / bias handles.
//! * `sequential`: Ordered stack of layers, with logistic and MLP constructors.
pub mod layer;
pub mod sequential;

use crate::data::Matrix;
use crate::errors::EIError;
use crate::params::{BoxBounds, ParamArena};

pub use layer::{Layer, Linear};
pub use sequential::Sequential;

/// Output of a backward pass.
pub struct Gradients {
    /// Gradient w.r.t. every parameter tensor, in the model's slot order.
    pub params: ParamArena,
    /// Gradient w.r.t. the input batch, same shape as the input.
    pub inputs: Matrix,
}

/// Differentiable binary classifier with enumerable weight / bias tensors.
///
/// `Clone` is the deep copy used to create adversarial snapshots; it must not
/// share parameter storage with the model it was copied from.
pub trait Classifier: Clone {
    /// Number of input features.
    fn n_features(&self) -> usize;

    /// Per row scores in `[0, 1]`.
    fn forward(&self, x: &Matrix) -> Result<Vec<f64>, EIError>;

    /// Gradients of `Σ_i grad_scores[i] · score_i` w.r.t. the parameters and the inputs.
    fn backward(&self, x: &Matrix, grad_scores: &[f64]) -> Result<Gradients, EIError>;

    /// Snapshot of every parameter tensor.
    fn parameters(&self) -> ParamArena;

    /// Overwrite every parameter tensor. The layout must match `parameters()`.
    fn set_parameters(&mut self, params: &ParamArena) -> Result<(), EIError>;

    /// Copy of the model with its parameters clamped into `bounds`.
    fn bounded_init(&self, bounds: &BoxBounds) -> Result<Self, EIError> {
        let mut params = self.parameters();
        params.check_layout(&bounds.lower)?;
        bounds.project(&mut params);
        let mut model = self.clone();
        model.set_parameters(&params)?;
        Ok(model)
    }
}
