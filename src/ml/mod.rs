//! Candidate classifiers, metrics and model selection.
//!
//! Everything here is CPU-only and dependency-light; fitted models are
//! plain serde structs so they can be persisted next to the scaler.

pub mod candidate;
pub mod dense;
pub mod logistic;
pub mod metrics;
pub mod mlp;
pub mod selection;

pub use candidate::{build_candidates, Candidate, LogisticCandidate, MlpCandidate, Model, TrainedModel};
pub use dense::{Activation, DenseLayer, DenseNetwork};
pub use logistic::LogisticModel;
pub use metrics::{ConfusionCounts, EvaluationRecord, Metric};
pub use mlp::MlpModel;
pub use selection::select;

use crate::config::ClassWeight;

/// Per-class loss weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ClassWeights {
    pub negative: f64,
    pub positive: f64,
}

impl ClassWeights {
    pub fn for_target(&self, target: f64) -> f64 {
        if target >= 0.5 {
            self.positive
        } else {
            self.negative
        }
    }
}

/// `n / (2 * n_class)` for balanced weighting, 1.0 otherwise.
pub(crate) fn class_weights(targets: &[f64], mode: ClassWeight) -> ClassWeights {
    let unit = ClassWeights {
        negative: 1.0,
        positive: 1.0,
    };
    match mode {
        ClassWeight::None => unit,
        ClassWeight::Balanced => {
            let n = targets.len() as f64;
            let pos = targets.iter().filter(|t| **t >= 0.5).count() as f64;
            let neg = n - pos;
            if pos == 0.0 || neg == 0.0 {
                return unit;
            }
            ClassWeights {
                negative: n / (2.0 * neg),
                positive: n / (2.0 * pos),
            }
        }
    }
}

/// Binary cross-entropy of one prediction, clamped away from log(0).
pub(crate) fn log_loss_term(p: f64, target: f64) -> f64 {
    let p = p.clamp(1e-15, 1.0 - 1e-15);
    -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_weights_equalize_class_mass() {
        let targets = [1.0, 0.0, 0.0, 0.0];
        let w = class_weights(&targets, ClassWeight::Balanced);
        assert!((w.positive - 2.0).abs() < 1e-12);
        assert!((w.negative - 4.0 / 6.0).abs() < 1e-12);
        assert!((w.positive * 1.0 - w.negative * 3.0).abs() < 1e-12);
        assert_eq!(class_weights(&targets, ClassWeight::None).positive, 1.0);
    }

    #[test]
    fn log_loss_is_finite_at_extremes() {
        assert!(log_loss_term(0.0, 1.0).is_finite());
        assert!(log_loss_term(1.0, 0.0).is_finite());
        assert!((log_loss_term(0.5, 1.0) - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
