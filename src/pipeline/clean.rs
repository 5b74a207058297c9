//! Zero-as-missing detection and training-median imputation.
//!
//! Medians are fitted on training rows only and then applied to every
//! partition, so validation and test values never influence the imputed
//! statistic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::split::{Partition, SplitAssignment};
use crate::data::{Dataset, Feature, Record, N_FEATURES};
use crate::error::{DiabriskError, Result};

/// A measurement after zero-as-missing marking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Observed(f64),
    Missing,
}

/// Record with designated zeros replaced by [`Measurement::Missing`].
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedRecord {
    pub values: [Measurement; N_FEATURES],
    pub source: Record,
}

/// Fitted per-column medians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    medians: BTreeMap<Feature, f64>,
}

impl Imputer {
    pub fn medians(&self) -> &BTreeMap<Feature, f64> {
        &self.medians
    }

    pub fn median(&self, feature: Feature) -> Option<f64> {
        self.medians.get(&feature).copied()
    }

    /// Replace designated zeros in one raw row with the fitted medians.
    pub fn impute_row(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut values = *row;
        for (feature, median) in &self.medians {
            if values[feature.index()] == 0.0 {
                values[feature.index()] = *median;
            }
        }
        values
    }

    /// Fill every missing marker with the column median.
    pub fn transform(&self, marked: &[MarkedRecord]) -> Result<Dataset> {
        marked
            .iter()
            .map(|m| {
                let mut values = m.source.values;
                for feature in Feature::ALL {
                    if let Measurement::Missing = m.values[feature.index()] {
                        values[feature.index()] = self.median(feature).ok_or_else(|| {
                            DiabriskError::insufficient_data(
                                feature.column_name(),
                                "no fitted median for missing value",
                            )
                        })?;
                    }
                }
                Ok(Record::new(values, m.source.outcome))
            })
            .collect::<Result<Vec<_>>>()
            .map(Dataset::new)
    }
}

/// Replaces impossible zeros and imputes them from training statistics.
#[derive(Debug, Clone)]
pub struct Cleaner {
    zero_as_missing: Vec<Feature>,
}

impl Cleaner {
    pub fn new(zero_as_missing: Vec<Feature>) -> Self {
        Self { zero_as_missing }
    }

    /// Mark designated zeros as missing. Zero stays a value elsewhere.
    pub fn mark_missing(&self, dataset: &Dataset) -> Vec<MarkedRecord> {
        dataset
            .records()
            .iter()
            .map(|record| {
                let mut values = record.values.map(Measurement::Observed);
                for &feature in &self.zero_as_missing {
                    if record.get(feature) == 0.0 {
                        values[feature.index()] = Measurement::Missing;
                    }
                }
                MarkedRecord {
                    values,
                    source: record.clone(),
                }
            })
            .collect()
    }

    /// Fit medians over training rows that carry an observed value.
    pub fn fit(&self, marked: &[MarkedRecord], split: &SplitAssignment) -> Result<Imputer> {
        if split.len() != marked.len() {
            return Err(DiabriskError::Validation(format!(
                "split covers {} records, dataset has {}",
                split.len(),
                marked.len()
            )));
        }
        let train = split.indices(Partition::Train);

        let mut medians = BTreeMap::new();
        for &feature in &self.zero_as_missing {
            let mut observed: Vec<f64> = train
                .iter()
                .filter_map(|&i| match marked[i].values[feature.index()] {
                    Measurement::Observed(v) => Some(v),
                    Measurement::Missing => None,
                })
                .collect();
            let median = median(&mut observed).ok_or_else(|| {
                DiabriskError::insufficient_data(
                    feature.column_name(),
                    "no non-zero values in training partition",
                )
            })?;
            let missing = marked
                .iter()
                .filter(|m| m.values[feature.index()] == Measurement::Missing)
                .count();
            debug!(column = %feature, median, missing, "fitted imputation median");
            medians.insert(feature, median);
        }
        Ok(Imputer { medians })
    }

    /// Mark, fit on training rows, and impute across all partitions.
    pub fn clean(&self, dataset: &Dataset, split: &SplitAssignment) -> Result<(Dataset, Imputer)> {
        let marked = self.mark_missing(dataset);
        let imputer = self.fit(&marked, split)?;
        let cleaned = imputer.transform(&marked)?;
        info!(
            columns = self.zero_as_missing.len(),
            imputed = marked
                .iter()
                .flat_map(|m| m.values.iter())
                .filter(|v| **v == Measurement::Missing)
                .count(),
            "cleaned dataset"
        );
        Ok((cleaned, imputer))
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(Feature::ZERO_AS_MISSING.to_vec())
    }
}

/// Median of `values`; the mean of the middle pair for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
