//! Logistic regression trained by full-batch gradient descent.
//!
//! Weights start at zero and every pass visits the rows in order, so a fit
//! is fully determined by its inputs and hyperparameters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dense::sigmoid;
use super::{class_weights, log_loss_term};
use crate::config::LogisticConfig;
use crate::data::N_FEATURES;
use crate::error::{DiabriskError, Result};
use crate::pipeline::scale::ScaledPartition;

/// Fitted linear model: `p = sigmoid(intercept + w · x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Hyperparameters the model was fitted with
    pub params: LogisticConfig,
    /// Gradient steps actually taken
    pub iterations: usize,
}

impl LogisticModel {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.coefficients.len() != N_FEATURES {
            return Err(format!(
                "expected {N_FEATURES} coefficients, got {}",
                self.coefficients.len()
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("coefficients must be finite".to_string());
        }
        Ok(())
    }

    pub fn logit(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(DiabriskError::Validation(format!(
                "LogisticModel input dim mismatch: got {}, expected {}",
                features.len(),
                self.coefficients.len()
            )));
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>())
    }

    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        Ok(sigmoid(self.logit(features)?))
    }
}

/// Fit a logistic model on scaled training rows.
pub fn fit_logistic(train: &ScaledPartition, params: &LogisticConfig) -> Result<LogisticModel> {
    if train.is_empty() {
        return Err(DiabriskError::Validation(
            "cannot fit logistic regression on no rows".to_string(),
        ));
    }
    let weights = class_weights(&train.targets, params.class_weight);
    let total_weight: f64 = train
        .targets
        .iter()
        .map(|t| weights.for_target(*t))
        .sum();

    let mut intercept = 0.0;
    let mut coef = vec![0.0_f64; N_FEATURES];
    let mut prev_loss = f64::INFINITY;
    let mut iterations = 0;

    for iter in 0..params.max_iter {
        let mut grad_b = 0.0;
        let mut grad_w = vec![0.0_f64; N_FEATURES];
        let mut loss = 0.0;

        for (row, &target) in train.rows.iter().zip(&train.targets) {
            let z = intercept + coef.iter().zip(row).map(|(w, x)| w * x).sum::<f64>();
            let p = sigmoid(z);
            let w = weights.for_target(target);
            let err = w * (p - target);
            grad_b += err;
            for (g, x) in grad_w.iter_mut().zip(row) {
                *g += err * x;
            }
            loss += w * log_loss_term(p, target);
        }

        loss /= total_weight;
        loss += 0.5 * params.l2 * coef.iter().map(|w| w * w).sum::<f64>();

        intercept -= params.learning_rate * grad_b / total_weight;
        for (w, g) in coef.iter_mut().zip(&grad_w) {
            *w -= params.learning_rate * (g / total_weight + params.l2 * *w);
        }
        iterations = iter + 1;

        if !loss.is_finite() {
            return Err(DiabriskError::Validation(
                "logistic regression diverged".to_string(),
            ));
        }
        if (prev_loss - loss).abs() < params.tolerance {
            debug!(iterations, loss, "logistic regression converged");
            break;
        }
        prev_loss = loss;
    }

    let model = LogisticModel {
        intercept,
        coefficients: coef,
        params: params.clone(),
        iterations,
    };
    model.validate().map_err(DiabriskError::Validation)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassWeight;
    use crate::pipeline::split::Partition;

    /// Positive iff feature 1 is large; other columns are noise-free zeros.
    fn separable() -> ScaledPartition {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..40 {
            let x = (i as f64 - 20.0) / 10.0;
            let mut row = [0.0; N_FEATURES];
            row[1] = x;
            row[7] = (i % 5) as f64 / 5.0;
            rows.push(row);
            targets.push(if x > 0.3 { 1.0 } else { 0.0 });
        }
        ScaledPartition {
            partition: Partition::Train,
            rows,
            targets,
            scaler_fingerprint: "test".to_string(),
        }
    }

    #[test]
    fn learns_a_monotone_boundary() {
        let train = separable();
        let model = fit_logistic(&train, &LogisticConfig::default()).unwrap();
        assert!(model.coefficients[1] > 0.0);
        let mut low = [0.0; N_FEATURES];
        low[1] = -1.5;
        let mut high = [0.0; N_FEATURES];
        high[1] = 1.5;
        assert!(model.predict_proba(&low).unwrap() < 0.2);
        assert!(model.predict_proba(&high).unwrap() > 0.8);
    }

    /// One positive in four, with a nearly uninformative feature.
    fn imbalanced() -> ScaledPartition {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..40 {
            let mut row = [0.0; N_FEATURES];
            row[1] = ((i * 7) % 10) as f64 / 10.0 - 0.45;
            rows.push(row);
            targets.push(if i % 4 == 0 { 1.0 } else { 0.0 });
        }
        ScaledPartition {
            partition: Partition::Train,
            rows,
            targets,
            scaler_fingerprint: "test".to_string(),
        }
    }

    #[test]
    fn balanced_weighting_raises_minority_probability() {
        let train = imbalanced();
        let plain = fit_logistic(&train, &LogisticConfig::default()).unwrap();
        let balanced = fit_logistic(
            &train,
            &LogisticConfig {
                class_weight: ClassWeight::Balanced,
                ..LogisticConfig::default()
            },
        )
        .unwrap();
        let origin = [0.0; N_FEATURES];
        let p_plain = plain.predict_proba(&origin).unwrap();
        let p_balanced = balanced.predict_proba(&origin).unwrap();
        assert!(p_plain < 0.4, "plain {p_plain}");
        assert!(p_balanced > p_plain + 0.1, "balanced {p_balanced} plain {p_plain}");
    }

    #[test]
    fn fitting_is_deterministic() {
        let train = separable();
        let a = fit_logistic(&train, &LogisticConfig::default()).unwrap();
        let b = fit_logistic(&train, &LogisticConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn l2_shrinks_coefficients() {
        let train = separable();
        let free = fit_logistic(&train, &LogisticConfig::default()).unwrap();
        let shrunk = fit_logistic(
            &train,
            &LogisticConfig {
                l2: 1.0,
                ..LogisticConfig::default()
            },
        )
        .unwrap();
        assert!(shrunk.coefficients[1].abs() < free.coefficients[1].abs());
    }

    #[test]
    fn rejects_wrong_input_width() {
        let model = fit_logistic(&separable(), &LogisticConfig::default()).unwrap();
        assert!(model.predict_proba(&[1.0, 2.0]).is_err());
    }
}
