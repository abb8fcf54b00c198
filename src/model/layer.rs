//! Layers of a sequential classifier, each optionally carrying a weight and a bias.
use crate::data::Matrix;
use crate::utils::sigmoid;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fully connected layer, `out = x · Wᵀ + b`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Linear {
    pub in_features: usize,
    pub out_features: usize,
    /// Row major `out_features × in_features`.
    pub weight: Vec<f64>,
    pub bias: Vec<f64>,
}

impl Linear {
    /// Uniform initialization in `[-1/sqrt(in), 1/sqrt(in)]`.
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (in_features.max(1) as f64).sqrt();
        let weight = (0..in_features * out_features)
            .map(|_| rng.gen_range(-bound..=bound))
            .collect();
        let bias = (0..out_features).map(|_| rng.gen_range(-bound..=bound)).collect();
        Linear {
            in_features,
            out_features,
            weight,
            bias,
        }
    }

    fn forward(&self, input: &Matrix) -> Matrix {
        let mut out = Matrix::zeros(input.rows, self.out_features);
        for r in 0..input.rows {
            let x = input.row(r);
            let o_row = out.row_mut(r);
            for (o, val) in o_row.iter_mut().enumerate() {
                let w = &self.weight[o * self.in_features..(o + 1) * self.in_features];
                *val = self.bias[o] + w.iter().zip(x).map(|(a, b)| a * b).sum::<f64>();
            }
        }
        out
    }

    fn backward(&self, input: &Matrix, grad_out: &Matrix) -> (Matrix, Vec<f64>, Vec<f64>) {
        let mut grad_in = Matrix::zeros(input.rows, self.in_features);
        let mut grad_w = vec![0.0; self.weight.len()];
        let mut grad_b = vec![0.0; self.bias.len()];
        for r in 0..input.rows {
            let x = input.row(r);
            let g = grad_out.row(r);
            let gi = grad_in.row_mut(r);
            for (o, g_o) in g.iter().enumerate() {
                if *g_o == 0.0 {
                    continue;
                }
                grad_b[o] += g_o;
                let start = o * self.in_features;
                for i in 0..self.in_features {
                    grad_w[start + i] += g_o * x[i];
                    gi[i] += g_o * self.weight[start + i];
                }
            }
        }
        (grad_in, grad_w, grad_b)
    }
}

/// A single step of the model.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub enum Layer {
    Linear(Linear),
    ReLU,
    Sigmoid,
}

/// Gradients of one layer's parameters, `None` where the layer has no such handle.
pub struct LayerGradients {
    pub weight: Option<Vec<f64>>,
    pub bias: Option<Vec<f64>>,
}

impl Layer {
    pub fn weight(&self) -> Option<&[f64]> {
        match self {
            Layer::Linear(l) => Some(&l.weight),
            Layer::ReLU | Layer::Sigmoid => None,
        }
    }

    pub fn weight_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Layer::Linear(l) => Some(&mut l.weight),
            Layer::ReLU | Layer::Sigmoid => None,
        }
    }

    pub fn bias(&self) -> Option<&[f64]> {
        match self {
            Layer::Linear(l) => Some(&l.bias),
            Layer::ReLU | Layer::Sigmoid => None,
        }
    }

    pub fn bias_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Layer::Linear(l) => Some(&mut l.bias),
            Layer::ReLU | Layer::Sigmoid => None,
        }
    }

    /// Number of input columns, `None` for shape preserving layers.
    pub fn in_features(&self) -> Option<usize> {
        match self {
            Layer::Linear(l) => Some(l.in_features),
            Layer::ReLU | Layer::Sigmoid => None,
        }
    }

    pub fn forward(&self, input: &Matrix) -> Matrix {
        match self {
            Layer::Linear(l) => l.forward(input),
            Layer::ReLU => Matrix {
                data: input.data.iter().map(|v| v.max(0.0)).collect(),
                rows: input.rows,
                cols: input.cols,
            },
            Layer::Sigmoid => Matrix {
                data: input.data.iter().map(|v| sigmoid(*v)).collect(),
                rows: input.rows,
                cols: input.cols,
            },
        }
    }

    /// Backpropagate `grad_out` through the layer.
    ///
    /// * `input` - What the layer was fed.
    /// * `output` - What the layer returned for `input`.
    /// * `grad_out` - Gradient of the objective w.r.t. `output`.
    ///
    /// Returns the gradient w.r.t. `input` and the parameter gradients.
    pub fn backward(&self, input: &Matrix, output: &Matrix, grad_out: &Matrix) -> (Matrix, LayerGradients) {
        match self {
            Layer::Linear(l) => {
                let (grad_in, grad_w, grad_b) = l.backward(input, grad_out);
                (
                    grad_in,
                    LayerGradients {
                        weight: Some(grad_w),
                        bias: Some(grad_b),
                    },
                )
            }
            Layer::ReLU => {
                let data = input
                    .data
                    .iter()
                    .zip(grad_out.data.iter())
                    .map(|(x, g)| if *x > 0.0 { *g } else { 0.0 })
                    .collect();
                (
                    Matrix {
                        data,
                        rows: input.rows,
                        cols: input.cols,
                    },
                    LayerGradients {
                        weight: None,
                        bias: None,
                    },
                )
            }
            Layer::Sigmoid => {
                let data = output
                    .data
                    .iter()
                    .zip(grad_out.data.iter())
                    .map(|(s, g)| g * s * (1.0 - s))
                    .collect();
                (
                    Matrix {
                        data,
                        rows: input.rows,
                        cols: input.cols,
                    },
                    LayerGradients {
                        weight: None,
                        bias: None,
                    },
                )
            }
        }
    }
}
