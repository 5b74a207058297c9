//! Uniform candidate abstraction.
//!
//! A candidate knows how to fit itself on the training partition; scoring
//! is shared. Fitted models carry the fingerprint of the scaler whose output
//! they were trained on and refuse features from any other scaler.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::logistic::{fit_logistic, LogisticModel};
use super::metrics::EvaluationRecord;
use super::mlp::{fit_mlp, MlpModel};
use crate::config::{CandidateConfig, LogisticConfig, MlpConfig, TrainingConfig};
use crate::error::{DiabriskError, Result};
use crate::pipeline::scale::ScaledPartition;
use crate::pipeline::split::Partition;

/// Fitted parameters of one model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    Logistic(LogisticModel),
    Mlp(MlpModel),
}

/// A fitted candidate bound to its scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub candidate: String,
    pub scaler_fingerprint: String,
    pub model: Model,
}

impl TrainedModel {
    pub fn validate(&self) -> Result<()> {
        let check = match &self.model {
            Model::Logistic(m) => m.validate(),
            Model::Mlp(m) => m.network.validate().and_then(|_| {
                if m.network.output_dim() == 1 {
                    Ok(())
                } else {
                    Err(format!("mlp output_dim {} != 1", m.network.output_dim()))
                }
            }),
        };
        check.map_err(|e| DiabriskError::Validation(format!("{}: {e}", self.candidate)))
    }

    /// Probability of the positive class for one scaled row.
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        match &self.model {
            Model::Logistic(m) => m.predict_proba(features),
            Model::Mlp(m) => m.predict_proba(features),
        }
    }

    pub fn ensure_scaler(&self, fingerprint: &str) -> Result<()> {
        if self.scaler_fingerprint != fingerprint {
            return Err(DiabriskError::ScalerMismatch {
                expected: self.scaler_fingerprint.clone(),
                actual: fingerprint.to_string(),
            });
        }
        Ok(())
    }

    pub fn predict_partition(&self, data: &ScaledPartition) -> Result<Vec<f64>> {
        self.ensure_scaler(&data.scaler_fingerprint)?;
        data.rows
            .iter()
            .map(|row| self.predict_proba(row))
            .collect()
    }

    /// Score on `data`, using only that partition's rows.
    pub fn evaluate(&self, data: &ScaledPartition, threshold: f64) -> Result<EvaluationRecord> {
        let probabilities = self.predict_partition(data)?;
        EvaluationRecord::compute(
            &self.candidate,
            data.partition,
            &data.targets,
            &probabilities,
            threshold,
        )
    }
}

pub trait Candidate {
    fn name(&self) -> &str;

    /// Fit on `train`. `validation` may only drive early stopping.
    fn fit(&self, train: &ScaledPartition, validation: &ScaledPartition) -> Result<TrainedModel>;

    fn score(
        &self,
        model: &TrainedModel,
        data: &ScaledPartition,
        threshold: f64,
    ) -> Result<EvaluationRecord> {
        model.evaluate(data, threshold)
    }
}

fn check_inputs(name: &str, train: &ScaledPartition, validation: &ScaledPartition) -> Result<()> {
    if train.partition != Partition::Train {
        return Err(DiabriskError::Validation(format!(
            "{name} must be fitted on the train partition, got {}",
            train.partition
        )));
    }
    if validation.partition != Partition::Validation {
        return Err(DiabriskError::Validation(format!(
            "{name} early stopping needs the validation partition, got {}",
            validation.partition
        )));
    }
    if train.scaler_fingerprint != validation.scaler_fingerprint {
        return Err(DiabriskError::ScalerMismatch {
            expected: train.scaler_fingerprint.clone(),
            actual: validation.scaler_fingerprint.clone(),
        });
    }
    Ok(())
}

pub struct LogisticCandidate {
    name: String,
    params: LogisticConfig,
}

impl LogisticCandidate {
    pub fn new(name: impl Into<String>, params: LogisticConfig) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl Candidate for LogisticCandidate {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&self, train: &ScaledPartition, validation: &ScaledPartition) -> Result<TrainedModel> {
        check_inputs(&self.name, train, validation)?;
        let model = fit_logistic(train, &self.params)?;
        info!(
            candidate = %self.name,
            iterations = model.iterations,
            class_weight = ?self.params.class_weight,
            "fitted logistic regression"
        );
        Ok(TrainedModel {
            candidate: self.name.clone(),
            scaler_fingerprint: train.scaler_fingerprint.clone(),
            model: Model::Logistic(model),
        })
    }
}

pub struct MlpCandidate {
    name: String,
    params: MlpConfig,
    seed: u64,
}

impl MlpCandidate {
    pub fn new(name: impl Into<String>, params: MlpConfig, default_seed: u64) -> Self {
        let seed = params.seed.unwrap_or(default_seed);
        Self {
            name: name.into(),
            params,
            seed,
        }
    }
}

impl Candidate for MlpCandidate {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&self, train: &ScaledPartition, validation: &ScaledPartition) -> Result<TrainedModel> {
        check_inputs(&self.name, train, validation)?;
        let model = fit_mlp(train, validation, &self.params, self.seed)?;
        Ok(TrainedModel {
            candidate: self.name.clone(),
            scaler_fingerprint: train.scaler_fingerprint.clone(),
            model: Model::Mlp(model),
        })
    }
}

/// Instantiate every configured candidate, in configuration order.
pub fn build_candidates(cfg: &TrainingConfig) -> Vec<Box<dyn Candidate>> {
    cfg.candidates
        .iter()
        .map(|c| -> Box<dyn Candidate> {
            match c {
                CandidateConfig::Logistic { name, params } => {
                    Box::new(LogisticCandidate::new(name.clone(), params.clone()))
                }
                CandidateConfig::Mlp { name, params } => {
                    Box::new(MlpCandidate::new(name.clone(), params.clone(), cfg.seed))
                }
            }
        })
        .collect()
}
