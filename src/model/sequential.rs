//! Sequential classifier: an ordered stack of layers ending in a single score column.
use crate::data::Matrix;
use crate::errors::EIError;
use crate::model::layer::{Layer, LayerGradients, Linear};
use crate::model::{Classifier, Gradients};
use crate::params::{ParamArena, ParamKind, ParamSlot, ParamTensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
struct SequentialState {
    layers: Vec<Layer>,
}

/// Ordered list of layers.
///
/// The parameter slots (which layer has a weight, which has a bias) are
/// resolved once in [`Sequential::new`] and reused by every snapshot.
/// Layer shapes are checked there too, including when a model is deserialized.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(try_from = "SequentialState", into = "SequentialState")]
pub struct Sequential {
    layers: Vec<Layer>,
    slots: Vec<ParamSlot>,
}

impl TryFrom<SequentialState> for Sequential {
    type Error = EIError;

    fn try_from(state: SequentialState) -> Result<Self, Self::Error> {
        Sequential::new(state.layers)
    }
}

impl From<Sequential> for SequentialState {
    fn from(model: Sequential) -> Self {
        SequentialState { layers: model.layers }
    }
}

/// Check every linear layer's buffers against its declared shape, and the
/// chain of widths from the first input to a single output column.
fn check_shapes(layers: &[Layer]) -> Result<(), EIError> {
    let mut width: Option<usize> = None;
    for (i, layer) in layers.iter().enumerate() {
        if let Layer::Linear(l) = layer {
            if l.weight.len() != l.in_features * l.out_features {
                return Err(EIError::ShapeMismatch(
                    format!("weight of layer {}", i),
                    l.in_features * l.out_features,
                    l.weight.len(),
                ));
            }
            if l.bias.len() != l.out_features {
                return Err(EIError::ShapeMismatch(
                    format!("bias of layer {}", i),
                    l.out_features,
                    l.bias.len(),
                ));
            }
            if let Some(w) = width {
                if w != l.in_features {
                    return Err(EIError::ShapeMismatch(format!("input of layer {}", i), w, l.in_features));
                }
            }
            width = Some(l.out_features);
        }
    }
    match width {
        Some(1) => Ok(()),
        Some(w) => Err(EIError::ShapeMismatch("output columns".to_string(), 1, w)),
        None => Err(EIError::ParameterLayout("no linear layer".to_string())),
    }
}

impl Sequential {
    /// Build a model from its layers.
    ///
    /// Fails when a linear layer's buffers do not match its shape, when two
    /// consecutive linear layers disagree on their shared width, or when the
    /// stack does not end in a single score column.
    pub fn new(layers: Vec<Layer>) -> Result<Self, EIError> {
        check_shapes(&layers)?;
        Ok(Sequential::from_checked(layers))
    }

    fn from_checked(layers: Vec<Layer>) -> Self {
        let mut slots = Vec::new();
        for (i, layer) in layers.iter().enumerate() {
            if layer.weight().is_some() {
                slots.push(ParamSlot {
                    layer: i,
                    kind: ParamKind::Weight,
                });
            }
            if layer.bias().is_some() {
                slots.push(ParamSlot {
                    layer: i,
                    kind: ParamKind::Bias,
                });
            }
        }
        Sequential { layers, slots }
    }

    /// Logistic regression: one linear layer followed by a sigmoid.
    pub fn logistic(n_features: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Sequential::from_checked(vec![Layer::Linear(Linear::new(n_features, 1, &mut rng)), Layer::Sigmoid])
    }

    /// Multilayer perceptron with ReLU hidden layers and a sigmoid output.
    ///
    /// * `n_features` - Number of input columns.
    /// * `hidden` - Width of every hidden layer, in order.
    /// * `seed` - Seed for the weight initialization.
    pub fn mlp(n_features: usize, hidden: &[usize], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::new();
        let mut width = n_features;
        for &h in hidden {
            layers.push(Layer::Linear(Linear::new(width, h, &mut rng)));
            layers.push(Layer::ReLU);
            width = h;
        }
        layers.push(Layer::Linear(Linear::new(width, 1, &mut rng)));
        layers.push(Layer::Sigmoid);
        Sequential::from_checked(layers)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    fn slot_values(&self, slot: &ParamSlot) -> &[f64] {
        let layer = &self.layers[slot.layer];
        let values = match slot.kind {
            ParamKind::Weight => layer.weight(),
            ParamKind::Bias => layer.bias(),
        };
        values.unwrap_or(&[])
    }

    fn check_input(&self, x: &Matrix) -> Result<(), EIError> {
        let n_features = self.n_features();
        if x.cols != n_features {
            return Err(EIError::ShapeMismatch("input features".to_string(), n_features, x.cols));
        }
        Ok(())
    }

    /// Forward pass keeping the input of every layer, plus the final output.
    fn activations(&self, x: &Matrix) -> Result<Vec<Matrix>, EIError> {
        self.check_input(x)?;
        let mut acts = Vec::with_capacity(self.layers.len() + 1);
        let mut current = x.clone();
        for layer in &self.layers {
            let next = layer.forward(&current);
            acts.push(current);
            current = next;
        }
        if current.cols != 1 {
            return Err(EIError::ShapeMismatch("output columns".to_string(), 1, current.cols));
        }
        acts.push(current);
        Ok(acts)
    }
}

impl Classifier for Sequential {
    fn n_features(&self) -> usize {
        self.layers.iter().find_map(|l| l.in_features()).unwrap_or(0)
    }

    fn forward(&self, x: &Matrix) -> Result<Vec<f64>, EIError> {
        let mut acts = self.activations(x)?;
        Ok(acts.pop().map(|m| m.data).unwrap_or_default())
    }

    fn backward(&self, x: &Matrix, grad_scores: &[f64]) -> Result<Gradients, EIError> {
        if grad_scores.len() != x.rows {
            return Err(EIError::ShapeMismatch("score gradient".to_string(), x.rows, grad_scores.len()));
        }
        let acts = self.activations(x)?;
        let mut grad = Matrix::new(grad_scores.to_vec(), x.rows, 1)?;
        let mut per_layer: Vec<Option<LayerGradients>> =
            (0..self.layers.len()).map(|_| None).collect();
        for (k, layer) in self.layers.iter().enumerate().rev() {
            let (grad_in, layer_grads) = layer.backward(&acts[k], &acts[k + 1], &grad);
            per_layer[k] = Some(layer_grads);
            grad = grad_in;
        }

        let mut tensors = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let layer_grads = per_layer[slot.layer].as_mut();
            let values = layer_grads.and_then(|g| match slot.kind {
                ParamKind::Weight => g.weight.take(),
                ParamKind::Bias => g.bias.take(),
            });
            let values = values.ok_or_else(|| EIError::ParameterLayout(format!("no gradient for {:?}", slot)))?;
            tensors.push(ParamTensor { slot: *slot, values });
        }

        Ok(Gradients {
            params: ParamArena::new(tensors),
            inputs: grad,
        })
    }

    fn parameters(&self) -> ParamArena {
        ParamArena::new(
            self.slots
                .iter()
                .map(|slot| ParamTensor {
                    slot: *slot,
                    values: self.slot_values(slot).to_vec(),
                })
                .collect(),
        )
    }

    fn set_parameters(&mut self, params: &ParamArena) -> Result<(), EIError> {
        self.parameters().check_layout(params)?;
        for t in &params.tensors {
            let layer = &mut self.layers[t.slot.layer];
            let target = match t.slot.kind {
                ParamKind::Weight => layer.weight_mut(),
                ParamKind::Bias => layer.bias_mut(),
            };
            if let Some(target) = target {
                target.copy_from_slice(&t.values);
            }
        }
        Ok(())
    }
}
