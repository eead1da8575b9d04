//! Hand-rolled feed-forward network with Adam optimization.
//!
//! Two fixed architectures are built here: the primary classifier
//! (50 -> 32 relu -> dropout 0.3 -> 16 relu -> 5 softmax) and the smaller
//! fallback (50 -> 10 relu -> 5 softmax) used when the primary cannot be
//! built or trained. Loss is categorical cross-entropy; the output layer is
//! always softmax, so forward passes produce a probability distribution.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{AuthlexError, Result};

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

/// Floor applied to predicted probabilities inside the loss.
const LOSS_EPSILON: f64 = 1e-12;

/// Activation applied to a dense layer's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Softmax,
}

/// One fully-connected layer. Weights are row-major: `weights[out][in]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    activation: Activation,
    /// Dropout rate applied to this layer's output during training.
    dropout: Option<f64>,
}

impl DenseLayer {
    fn new(inputs: usize, outputs: usize, activation: Activation, dropout: Option<f64>) -> Self {
        let mut rng = rand::rng();
        // He-uniform initialization.
        let limit = (6.0 / inputs as f64).sqrt();
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.random_range(-limit..limit)).collect())
            .collect();

        Self {
            weights,
            biases: vec![0.0; outputs],
            activation,
            dropout,
        }
    }

    fn inputs(&self) -> usize {
        self.weights.first().map(|row| row.len()).unwrap_or(0)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }
}

/// A stack of dense layers ending in softmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<DenseLayer>,
}

/// Loss figures for one completed epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochStats {
    pub loss: f64,
    pub val_loss: f64,
}

impl Network {
    /// Build the primary architecture.
    pub fn primary(input: usize, classes: usize) -> Result<Self> {
        Self::build(&[
            LayerSpec::relu(input, 32).dropout(0.3),
            LayerSpec::relu(32, 16),
            LayerSpec::softmax(16, classes),
        ])
    }

    /// Build the reduced fallback architecture.
    pub fn fallback(input: usize, classes: usize) -> Result<Self> {
        Self::build(&[LayerSpec::relu(input, 10), LayerSpec::softmax(10, classes)])
    }

    fn build(specs: &[LayerSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Err(AuthlexError::model_build("network needs at least one layer"));
        }
        let mut layers = Vec::with_capacity(specs.len());
        let mut expected_inputs = specs[0].inputs;
        for spec in specs {
            if spec.inputs == 0 || spec.outputs == 0 {
                return Err(AuthlexError::model_build("layer dimensions must be non-zero"));
            }
            if spec.inputs != expected_inputs {
                return Err(AuthlexError::model_build(format!(
                    "layer expects {} inputs, previous layer produced {}",
                    spec.inputs, expected_inputs
                )));
            }
            layers.push(DenseLayer::new(
                spec.inputs,
                spec.outputs,
                spec.activation,
                spec.dropout,
            ));
            expected_inputs = spec.outputs;
        }
        if layers.last().map(|l| l.activation) != Some(Activation::Softmax) {
            return Err(AuthlexError::model_build("output layer must be softmax"));
        }
        Ok(Self { layers })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.inputs()).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.outputs()).unwrap_or(0)
    }

    /// Inference-mode forward pass: dropout disabled.
    ///
    /// The output is a softmax distribution over classes.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut activation = input.to_vec();
        for layer in &self.layers {
            activation = apply_layer(layer, &activation);
        }
        activation
    }

    /// Run one training epoch and return the epoch's loss figures.
    ///
    /// Batches are shuffled each epoch; gradients are averaged per batch and
    /// applied with the shared Adam state. Dropout masks are sampled per
    /// example on layers that carry a rate.
    pub fn run_epoch(
        &mut self,
        adam: &mut AdamState,
        train: &[(Vec<f64>, Vec<f64>)],
        validation: &[(Vec<f64>, Vec<f64>)],
        batch_size: usize,
    ) -> EpochStats {
        let mut rng = rand::rng();
        let mut order: Vec<usize> = (0..train.len()).collect();
        order.shuffle(&mut rng);

        for batch in order.chunks(batch_size.max(1)) {
            let mut grads = Gradients::zeroed(self);
            for &idx in batch {
                let (input, target) = &train[idx];
                self.accumulate_example(&mut grads, input, target, &mut rng);
            }
            grads.scale(1.0 / batch.len() as f64);
            adam.apply(self, &grads);
        }

        EpochStats {
            loss: self.mean_loss(train),
            val_loss: self.mean_loss(validation),
        }
    }

    /// Mean categorical cross-entropy over a dataset.
    pub fn mean_loss(&self, data: &[(Vec<f64>, Vec<f64>)]) -> f64 {
        if data.is_empty() {
            return 0.0;
        }
        let total: f64 = data
            .iter()
            .map(|(input, target)| cross_entropy(&self.forward(input), target))
            .sum();
        total / data.len() as f64
    }

    /// Forward with caches and dropout, then backpropagate one example.
    fn accumulate_example(
        &self,
        grads: &mut Gradients,
        input: &[f64],
        target: &[f64],
        rng: &mut impl Rng,
    ) {
        // Forward pass, keeping each layer's input and post-dropout output.
        let mut layer_inputs: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
        let mut masks: Vec<Option<Vec<f64>>> = Vec::with_capacity(self.layers.len());
        let mut current = input.to_vec();

        for layer in &self.layers {
            layer_inputs.push(current.clone());
            current = apply_layer(layer, &current);

            // Inverted dropout: zero with probability p, scale survivors.
            let mask = layer.dropout.map(|rate| {
                let keep = 1.0 - rate;
                current
                    .iter_mut()
                    .map(|value| {
                        if rng.random::<f64>() < rate {
                            *value = 0.0;
                            0.0
                        } else {
                            *value /= keep;
                            1.0 / keep
                        }
                    })
                    .collect()
            });
            masks.push(mask);
        }

        // Softmax + cross-entropy collapse to (probs - target) at the output.
        let mut delta: Vec<f64> = current
            .iter()
            .zip(target.iter())
            .map(|(p, t)| p - t)
            .collect();

        for (idx, layer) in self.layers.iter().enumerate().rev() {
            // Hidden layers: apply the dropout mask and the relu derivative.
            if layer.activation == Activation::Relu {
                if let Some(mask) = &masks[idx] {
                    for (d, m) in delta.iter_mut().zip(mask.iter()) {
                        *d *= m;
                    }
                }
                let pre_dropout = apply_layer(layer, &layer_inputs[idx]);
                for (d, out) in delta.iter_mut().zip(pre_dropout.iter()) {
                    if *out <= 0.0 {
                        *d = 0.0;
                    }
                }
            }

            let layer_input = &layer_inputs[idx];
            for (o, d) in delta.iter().enumerate() {
                grads.biases[idx][o] += d;
                for (i, x) in layer_input.iter().enumerate() {
                    grads.weights[idx][o][i] += d * x;
                }
            }

            if idx > 0 {
                let mut prev = vec![0.0; layer.inputs()];
                for (o, d) in delta.iter().enumerate() {
                    for (i, slot) in prev.iter_mut().enumerate() {
                        *slot += layer.weights[o][i] * d;
                    }
                }
                delta = prev;
            }
        }
    }
}

/// Declarative layer description used by the builders.
#[derive(Debug, Clone, Copy)]
struct LayerSpec {
    inputs: usize,
    outputs: usize,
    activation: Activation,
    dropout: Option<f64>,
}

impl LayerSpec {
    fn relu(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            activation: Activation::Relu,
            dropout: None,
        }
    }

    fn softmax(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            activation: Activation::Softmax,
            dropout: None,
        }
    }

    fn dropout(mut self, rate: f64) -> Self {
        self.dropout = Some(rate);
        self
    }
}

fn apply_layer(layer: &DenseLayer, input: &[f64]) -> Vec<f64> {
    let mut output: Vec<f64> = layer
        .weights
        .iter()
        .zip(layer.biases.iter())
        .map(|(row, bias)| {
            row.iter().zip(input.iter()).map(|(w, x)| w * x).sum::<f64>() + bias
        })
        .collect();

    match layer.activation {
        Activation::Relu => {
            for value in &mut output {
                if *value < 0.0 {
                    *value = 0.0;
                }
            }
        }
        Activation::Softmax => softmax_in_place(&mut output),
    }
    output
}

/// Numerically stable softmax.
fn softmax_in_place(values: &mut [f64]) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for value in values.iter_mut() {
        *value = (*value - max).exp();
        sum += *value;
    }
    for value in values.iter_mut() {
        *value /= sum;
    }
}

/// Categorical cross-entropy for one example.
fn cross_entropy(probs: &[f64], target: &[f64]) -> f64 {
    probs
        .iter()
        .zip(target.iter())
        .map(|(p, t)| -t * p.max(LOSS_EPSILON).ln())
        .sum()
}

/// Per-parameter gradient accumulator, same shape as the network.
struct Gradients {
    weights: Vec<Vec<Vec<f64>>>,
    biases: Vec<Vec<f64>>,
}

impl Gradients {
    fn zeroed(network: &Network) -> Self {
        Self {
            weights: network
                .layers
                .iter()
                .map(|l| vec![vec![0.0; l.inputs()]; l.outputs()])
                .collect(),
            biases: network.layers.iter().map(|l| vec![0.0; l.outputs()]).collect(),
        }
    }

    fn scale(&mut self, factor: f64) {
        for layer in &mut self.weights {
            for row in layer {
                for value in row {
                    *value *= factor;
                }
            }
        }
        for layer in &mut self.biases {
            for value in layer {
                *value *= factor;
            }
        }
    }
}

/// Adam optimizer state (first and second moments per parameter).
pub struct AdamState {
    learning_rate: f64,
    step: u64,
    weight_m: Vec<Vec<Vec<f64>>>,
    weight_v: Vec<Vec<Vec<f64>>>,
    bias_m: Vec<Vec<f64>>,
    bias_v: Vec<Vec<f64>>,
}

impl AdamState {
    /// Create optimizer state shaped for `network`.
    pub fn new(network: &Network, learning_rate: f64) -> Self {
        let weight_shape: Vec<Vec<Vec<f64>>> = network
            .layers
            .iter()
            .map(|l| vec![vec![0.0; l.inputs()]; l.outputs()])
            .collect();
        let bias_shape: Vec<Vec<f64>> =
            network.layers.iter().map(|l| vec![0.0; l.outputs()]).collect();

        Self {
            learning_rate,
            step: 0,
            weight_m: weight_shape.clone(),
            weight_v: weight_shape,
            bias_m: bias_shape.clone(),
            bias_v: bias_shape,
        }
    }

    fn apply(&mut self, network: &mut Network, grads: &Gradients) {
        self.step += 1;
        let correction1 = 1.0 - ADAM_BETA1.powi(self.step as i32);
        let correction2 = 1.0 - ADAM_BETA2.powi(self.step as i32);

        for (idx, layer) in network.layers.iter_mut().enumerate() {
            for o in 0..layer.weights.len() {
                for i in 0..layer.weights[o].len() {
                    let g = grads.weights[idx][o][i];
                    let m = &mut self.weight_m[idx][o][i];
                    let v = &mut self.weight_v[idx][o][i];
                    *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                    *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    layer.weights[o][i] -= self.learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
                }
            }
            for o in 0..layer.biases.len() {
                let g = grads.biases[idx][o];
                let m = &mut self.bias_m[idx][o];
                let v = &mut self.bias_v[idx][o];
                *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                layer.biases[o] -= self.learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
            }
        }
    }
}
