//! Standardization fitted on the training partition.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::split::{Partition, SplitAssignment};
use crate::data::{Dataset, Feature, N_FEATURES};
use crate::error::{DiabriskError, Result};

/// What to do with a column whose training variance is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVariancePolicy {
    /// Abort with [`DiabriskError::DegenerateColumn`].
    #[default]
    Fail,
    /// Center the column but leave it unscaled.
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub feature: Feature,
    pub mean: f64,
    /// Population standard deviation; 1.0 for passed-through columns.
    pub std: f64,
}

/// Per-column mean/std fitted once and applied by transform only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<ColumnScale>,
    pub fingerprint: String,
}

impl StandardScaler {
    /// Fit on the given rows.
    pub fn fit(rows: &[[f64; N_FEATURES]], policy: ZeroVariancePolicy) -> Result<Self> {
        if rows.is_empty() {
            return Err(DiabriskError::Validation(
                "cannot fit scaler on an empty partition".to_string(),
            ));
        }
        let n = rows.len() as f64;

        let mut columns = Vec::with_capacity(N_FEATURES);
        for feature in Feature::ALL {
            let idx = feature.index();
            let mean = rows.iter().map(|r| r[idx]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[idx] - mean).powi(2)).sum::<f64>() / n;
            let mut std = var.sqrt();
            if !(std > f64::EPSILON * mean.abs().max(1.0)) {
                match policy {
                    ZeroVariancePolicy::Fail => {
                        return Err(DiabriskError::DegenerateColumn {
                            column: feature.column_name().to_string(),
                        })
                    }
                    ZeroVariancePolicy::PassThrough => {
                        warn!(column = %feature, "zero variance; column left unscaled");
                        std = 1.0;
                    }
                }
            }
            columns.push(ColumnScale { feature, mean, std });
        }

        let fingerprint = fingerprint(&columns);
        Ok(Self {
            columns,
            fingerprint,
        })
    }

    /// Fit on the training partition of `dataset`.
    pub fn fit_partition(
        dataset: &Dataset,
        split: &SplitAssignment,
        policy: ZeroVariancePolicy,
    ) -> Result<Self> {
        let rows: Vec<[f64; N_FEATURES]> = split
            .indices(Partition::Train)
            .into_iter()
            .map(|i| dataset.records()[i].values)
            .collect();
        let scaler = Self::fit(&rows, policy)?;
        info!(rows = rows.len(), fingerprint = %scaler.fingerprint, "fitted scaler");
        Ok(scaler)
    }

    /// Validate deserialized parameters.
    pub fn validate(&self) -> Result<()> {
        if self.columns.len() != N_FEATURES {
            return Err(DiabriskError::Validation(format!(
                "scaler has {} columns, expected {N_FEATURES}",
                self.columns.len()
            )));
        }
        for (col, feature) in self.columns.iter().zip(Feature::ALL) {
            if col.feature != feature {
                return Err(DiabriskError::Validation(format!(
                    "scaler column {} out of order, expected {feature}",
                    col.feature
                )));
            }
            if !col.mean.is_finite() || !col.std.is_finite() || col.std <= 0.0 {
                return Err(DiabriskError::Validation(format!(
                    "scaler column {feature} has invalid parameters"
                )));
            }
        }
        if fingerprint(&self.columns) != self.fingerprint {
            return Err(DiabriskError::Validation(
                "scaler fingerprint does not match its parameters".to_string(),
            ));
        }
        Ok(())
    }

    pub fn transform_row(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = *row;
        for (x, col) in out.iter_mut().zip(&self.columns) {
            *x = (*x - col.mean) / col.std;
        }
        out
    }

    /// Scale one partition into a model-ready matrix.
    pub fn transform_partition(
        &self,
        dataset: &Dataset,
        split: &SplitAssignment,
        partition: Partition,
    ) -> ScaledPartition {
        let indices = split.indices(partition);
        let rows = indices
            .iter()
            .map(|&i| self.transform_row(&dataset.records()[i].values))
            .collect();
        let targets = indices
            .iter()
            .map(|&i| dataset.records()[i].outcome.as_target())
            .collect();
        ScaledPartition {
            partition,
            rows,
            targets,
            scaler_fingerprint: self.fingerprint.clone(),
        }
    }
}

fn fingerprint(columns: &[ColumnScale]) -> String {
    let mut hasher = Sha256::new();
    for col in columns {
        hasher.update(col.mean.to_le_bytes());
        hasher.update(col.std.to_le_bytes());
    }
    hex::encode(&hasher.finalize()[..8])
}

/// Scaled features and 0/1 targets of one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledPartition {
    pub partition: Partition,
    pub rows: Vec<[f64; N_FEATURES]>,
    pub targets: Vec<f64>,
    /// Fingerprint of the scaler that produced `rows`.
    pub scaler_fingerprint: String,
}

impl ScaledPartition {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
