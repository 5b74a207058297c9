//! Mini-batch training for [`DenseNetwork`] binary classifiers.
//!
//! ReLU hidden layers feed a single sigmoid unit trained on (optionally
//! class-weighted) binary cross-entropy with Adam. Training stops once the
//! validation loss has not improved by `min_delta` for `patience` epochs,
//! and the best-scoring weights are restored.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::dense::{Activation, DenseLayer, DenseNetwork};
use super::{class_weights, log_loss_term};
use crate::config::MlpConfig;
use crate::data::N_FEATURES;
use crate::error::{DiabriskError, Result};
use crate::pipeline::scale::ScaledPartition;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

/// How a training run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpTrainingSummary {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_validation_loss: f64,
    pub stopped_early: bool,
}

/// Network plus training summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpModel {
    pub network: DenseNetwork,
    pub params: MlpConfig,
    pub seed: u64,
    pub summary: MlpTrainingSummary,
}

impl MlpModel {
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        self.network.forward_scalar(features)
    }
}

/// He-uniform hidden layers, Glorot-uniform output, zero biases.
pub fn init_network(hidden: &[usize], rng: &mut ChaCha8Rng) -> DenseNetwork {
    let mut layers = Vec::with_capacity(hidden.len() + 1);
    let mut fan_in = N_FEATURES;
    for &width in hidden {
        let limit = (6.0 / fan_in as f64).sqrt();
        layers.push(random_layer(fan_in, width, limit, Activation::Relu, rng));
        fan_in = width;
    }
    let limit = (6.0 / (fan_in + 1) as f64).sqrt();
    layers.push(random_layer(fan_in, 1, limit, Activation::Sigmoid, rng));
    DenseNetwork {
        input_dim: N_FEATURES,
        layers,
    }
}

fn random_layer(
    in_dim: usize,
    out_dim: usize,
    limit: f64,
    activation: Activation,
    rng: &mut ChaCha8Rng,
) -> DenseLayer {
    let weights = (0..out_dim)
        .map(|_| (0..in_dim).map(|_| rng.gen_range(-limit..limit)).collect())
        .collect();
    DenseLayer {
        weights,
        bias: vec![0.0; out_dim],
        activation,
    }
}

/// Mean unweighted binary cross-entropy.
pub fn mean_log_loss(network: &DenseNetwork, data: &ScaledPartition) -> Result<f64> {
    if data.is_empty() {
        return Err(DiabriskError::Validation(
            "cannot compute loss on an empty partition".to_string(),
        ));
    }
    let mut total = 0.0;
    for (row, &y) in data.rows.iter().zip(&data.targets) {
        total += log_loss_term(network.forward_scalar(row)?, y);
    }
    Ok(total / data.len() as f64)
}

struct Adam {
    m: Vec<DenseLayer>,
    v: Vec<DenseLayer>,
    t: i32,
    learning_rate: f64,
}

impl Adam {
    fn new(network: &DenseNetwork, learning_rate: f64) -> Self {
        let zeros: Vec<DenseLayer> = network.layers.iter().map(|l| l.zeros_like()).collect();
        Self {
            m: zeros.clone(),
            v: zeros,
            t: 0,
            learning_rate,
        }
    }

    fn step(&mut self, network: &mut DenseNetwork, grads: &[DenseLayer], scale: f64) {
        self.t += 1;
        let bc1 = 1.0 - ADAM_BETA1.powi(self.t);
        let bc2 = 1.0 - ADAM_BETA2.powi(self.t);
        let lr = self.learning_rate;
        let update = |p: &mut f64, g: f64, m: &mut f64, v: &mut f64| {
            let g = g * scale;
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            *p -= lr * (*m / bc1) / ((*v / bc2).sqrt() + ADAM_EPS);
        };

        for (((layer, grad), m), v) in network
            .layers
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            for o in 0..layer.out_dim() {
                for i in 0..layer.weights[o].len() {
                    update(
                        &mut layer.weights[o][i],
                        grad.weights[o][i],
                        &mut m.weights[o][i],
                        &mut v.weights[o][i],
                    );
                }
                update(&mut layer.bias[o], grad.bias[o], &mut m.bias[o], &mut v.bias[o]);
            }
        }
    }
}

/// Accumulate the gradient of one weighted sample into `grads`.
fn backprop(
    network: &DenseNetwork,
    row: &[f64],
    target: f64,
    weight: f64,
    grads: &mut [DenseLayer],
) -> Result<()> {
    let trace = network.forward_trace(row)?;
    let p = trace[trace.len() - 1][0];
    // Sigmoid output with cross-entropy collapses to (p - y).
    let mut delta = vec![weight * (p - target)];

    for l in (0..network.layers.len()).rev() {
        let layer = &network.layers[l];
        let input = &trace[l];
        let grad = &mut grads[l];
        for (o, d) in delta.iter().enumerate() {
            grad.bias[o] += d;
            for (g, x) in grad.weights[o].iter_mut().zip(input) {
                *g += d * x;
            }
        }
        if l == 0 {
            break;
        }
        let below = network.layers[l - 1].activation;
        delta = (0..layer.in_dim())
            .map(|i| {
                let back: f64 = delta
                    .iter()
                    .enumerate()
                    .map(|(o, d)| layer.weights[o][i] * d)
                    .sum();
                back * below.derivative_from_output(input[i])
            })
            .collect();
    }
    Ok(())
}

/// Train on `train`, early-stopping on `validation` loss.
pub fn fit_mlp(
    train: &ScaledPartition,
    validation: &ScaledPartition,
    params: &MlpConfig,
    seed: u64,
) -> Result<MlpModel> {
    if train.is_empty() || validation.is_empty() {
        return Err(DiabriskError::Validation(
            "mlp needs non-empty train and validation partitions".to_string(),
        ));
    }
    if params.batch_size == 0 || params.max_epochs == 0 {
        return Err(DiabriskError::Validation(
            "mlp batch_size and max_epochs must be positive".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut network = init_network(&params.hidden_layers, &mut rng);
    let mut adam = Adam::new(&network, params.learning_rate);
    let weights = class_weights(&train.targets, params.class_weight);

    let mut order: Vec<usize> = (0..train.len()).collect();
    let mut best = network.clone();
    let mut best_loss = mean_log_loss(&network, validation)?;
    let mut best_epoch = 0;
    let mut wait = 0;
    let mut epochs_run = 0;
    let mut stopped_early = false;

    for epoch in 1..=params.max_epochs {
        order.shuffle(&mut rng);
        for batch in order.chunks(params.batch_size) {
            let mut grads: Vec<DenseLayer> =
                network.layers.iter().map(|l| l.zeros_like()).collect();
            for &i in batch {
                let y = train.targets[i];
                backprop(&network, &train.rows[i], y, weights.for_target(y), &mut grads)?;
            }
            adam.step(&mut network, &grads, 1.0 / batch.len() as f64);
        }
        epochs_run = epoch;

        let val_loss = mean_log_loss(&network, validation)?;
        if !val_loss.is_finite() {
            return Err(DiabriskError::Validation(format!(
                "mlp validation loss became non-finite at epoch {epoch}"
            )));
        }
        if val_loss < best_loss - params.min_delta {
            best_loss = val_loss;
            best = network.clone();
            best_epoch = epoch;
            wait = 0;
        } else {
            wait += 1;
            if wait >= params.patience {
                stopped_early = true;
                break;
            }
        }
        if epoch % 50 == 0 {
            debug!(epoch, val_loss, best_loss, "mlp progress");
        }
    }

    info!(
        epochs_run,
        best_epoch,
        best_validation_loss = best_loss,
        stopped_early,
        "mlp training finished"
    );
    best.validate().map_err(DiabriskError::Validation)?;

    Ok(MlpModel {
        network: best,
        params: params.clone(),
        seed,
        summary: MlpTrainingSummary {
            epochs_run,
            best_epoch,
            best_validation_loss: best_loss,
            stopped_early,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::split::Partition;

    fn partition(partition: Partition, n: usize, offset: usize) -> ScaledPartition {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for k in 0..n {
            let i = k + offset;
            let a = ((i * 37) % 100) as f64 / 50.0 - 1.0;
            let b = ((i * 61) % 100) as f64 / 50.0 - 1.0;
            let mut row = [0.0; N_FEATURES];
            row[0] = a;
            row[1] = b;
            rows.push(row);
            targets.push(if a + b > 0.0 { 1.0 } else { 0.0 });
        }
        ScaledPartition {
            partition,
            rows,
            targets,
            scaler_fingerprint: "test".to_string(),
        }
    }

    fn params() -> MlpConfig {
        MlpConfig {
            hidden_layers: vec![8],
            learning_rate: 0.01,
            batch_size: 16,
            max_epochs: 200,
            patience: 15,
            ..MlpConfig::default()
        }
    }

    #[test]
    fn learns_a_linear_boundary() {
        let train = partition(Partition::Train, 200, 0);
        let val = partition(Partition::Validation, 60, 1000);
        let model = fit_mlp(&train, &val, &params(), 7).unwrap();

        let correct = val
            .rows
            .iter()
            .zip(&val.targets)
            .filter(|(row, y)| {
                let p = model.predict_proba(row.as_slice()).unwrap();
                (p >= 0.5) == (**y >= 0.5)
            })
            .count();
        assert!(correct as f64 / val.len() as f64 > 0.85, "accuracy {correct}/60");
        assert!(model.summary.best_epoch >= 1);
    }

    #[test]
    fn same_seed_same_weights() {
        let train = partition(Partition::Train, 80, 0);
        let val = partition(Partition::Validation, 20, 500);
        let p = MlpConfig {
            max_epochs: 20,
            ..params()
        };
        let a = fit_mlp(&train, &val, &p, 11).unwrap();
        let b = fit_mlp(&train, &val, &p, 11).unwrap();
        assert_eq!(a, b);
        let c = fit_mlp(&train, &val, &p, 12).unwrap();
        assert_ne!(a.network, c.network);
    }

    #[test]
    fn early_stopping_restores_best_epoch() {
        let train = partition(Partition::Train, 80, 0);
        let val = partition(Partition::Validation, 20, 500);
        let p = MlpConfig {
            patience: 1,
            min_delta: 10.0,
            ..params()
        };
        // No epoch can beat the initial loss by 10 nats.
        let model = fit_mlp(&train, &val, &p, 3).unwrap();
        assert!(model.summary.stopped_early);
        assert_eq!(model.summary.epochs_run, 1);
        assert_eq!(model.summary.best_epoch, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(model.network, init_network(&p.hidden_layers, &mut rng));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let net = init_network(&[4], &mut rng);
        let row = [0.3, -0.2, 0.5, 0.1, -0.4, 0.2, 0.0, 0.7];
        let y = 1.0;
        let mut grads: Vec<DenseLayer> = net.layers.iter().map(|l| l.zeros_like()).collect();
        backprop(&net, &row, y, 1.0, &mut grads).unwrap();

        let h = 1e-6;
        let loss = |n: &DenseNetwork| log_loss_term(n.forward_scalar(&row).unwrap(), y);
        for (l, o, i) in [(0, 1, 2), (0, 3, 7), (1, 0, 2)] {
            let mut plus = net.clone();
            plus.layers[l].weights[o][i] += h;
            let mut minus = net.clone();
            minus.layers[l].weights[o][i] -= h;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
            let analytic = grads[l].weights[o][i];
            assert!((numeric - analytic).abs() < 1e-5, "({l},{o},{i}) {numeric} vs {analytic}");
        }
    }
}
