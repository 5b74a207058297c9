//! Seeded stratified train/validation/test assignment.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::SplitConfig;
use crate::data::{Dataset, Outcome};
use crate::error::{DiabriskError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Train,
    Validation,
    Test,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Validation, Partition::Test];
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Partition::Train => "train",
            Partition::Validation => "validation",
            Partition::Test => "test",
        };
        f.write_str(name)
    }
}

/// Partition label for every record, aligned with dataset order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAssignment {
    labels: Vec<Partition>,
}

impl SplitAssignment {
    /// Build from explicit labels. Used when the caller controls the split.
    pub fn from_labels(labels: Vec<Partition>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Record indices in `partition`, ascending.
    pub fn indices(&self, partition: Partition) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == partition)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count(&self, partition: Partition) -> usize {
        self.labels.iter().filter(|p| **p == partition).count()
    }
}

/// Size and class balance of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub partition: Partition,
    pub rows: usize,
    pub positives: usize,
    pub positive_ratio: f64,
}

pub fn summarize(dataset: &Dataset, split: &SplitAssignment, partition: Partition) -> PartitionSummary {
    let indices = split.indices(partition);
    let positives = indices
        .iter()
        .filter(|&&i| dataset.records()[i].outcome.is_positive())
        .count();
    let positive_ratio = if indices.is_empty() {
        0.0
    } else {
        positives as f64 / indices.len() as f64
    };
    PartitionSummary {
        partition,
        rows: indices.len(),
        positives,
        positive_ratio,
    }
}

/// Stratified splitter driven by [`SplitConfig`].
#[derive(Debug, Clone)]
pub struct Splitter {
    cfg: SplitConfig,
}

impl Splitter {
    pub fn new(cfg: SplitConfig) -> Self {
        Self { cfg }
    }

    pub fn split(&self, dataset: &Dataset) -> Result<SplitAssignment> {
        self.check_fractions()?;

        let (positives, negatives): (Vec<usize>, Vec<usize>) = (0..dataset.len())
            .partition(|&i| dataset.records()[i].outcome == Outcome::Positive);

        for (name, members) in [("positive", &positives), ("negative", &negatives)] {
            if members.len() < 2 {
                return Err(DiabriskError::Stratification(format!(
                    "need at least 2 {name} examples, found {}",
                    members.len()
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.cfg.seed);
        let mut labels = vec![Partition::Train; dataset.len()];
        for mut members in [positives, negatives] {
            members.shuffle(&mut rng);
            let (n_val, n_test) = self.class_allocation(members.len());
            for &i in &members[..n_val] {
                labels[i] = Partition::Validation;
            }
            for &i in &members[n_val..n_val + n_test] {
                labels[i] = Partition::Test;
            }
        }

        let assignment = SplitAssignment { labels };
        self.check_balance(dataset, &assignment)?;

        info!(
            seed = self.cfg.seed,
            train = assignment.count(Partition::Train),
            validation = assignment.count(Partition::Validation),
            test = assignment.count(Partition::Test),
            "stratified split"
        );
        Ok(assignment)
    }

    fn check_fractions(&self) -> Result<()> {
        let SplitConfig {
            train_fraction,
            validation_fraction,
            test_fraction,
            ..
        } = self.cfg;
        let all = [train_fraction, validation_fraction, test_fraction];
        if all.iter().any(|f| !f.is_finite() || *f <= 0.0 || *f >= 1.0) {
            return Err(DiabriskError::Stratification(format!(
                "fractions must lie in (0, 1): {all:?}"
            )));
        }
        if (all.iter().sum::<f64>() - 1.0).abs() > 1e-6 {
            return Err(DiabriskError::Stratification(format!(
                "fractions must sum to 1: {all:?}"
            )));
        }
        Ok(())
    }

    /// Validation and test counts for a class of `n` members.
    fn class_allocation(&self, n: usize) -> (usize, usize) {
        let mut n_val = (n as f64 * self.cfg.validation_fraction).round() as usize;
        let mut n_test = (n as f64 * self.cfg.test_fraction).round() as usize;
        // Each class keeps at least one training example.
        while n_val + n_test >= n {
            if n_test >= n_val && n_test > 0 {
                n_test -= 1;
            } else if n_val > 0 {
                n_val -= 1;
            } else {
                break;
            }
        }
        (n_val, n_test)
    }

    fn check_balance(&self, dataset: &Dataset, split: &SplitAssignment) -> Result<()> {
        let overall = dataset.positive_ratio();
        for partition in Partition::ALL {
            let summary = summarize(dataset, split, partition);
            if summary.rows == 0 {
                return Err(DiabriskError::Stratification(format!(
                    "{partition} partition is empty ({} rows total)",
                    dataset.len()
                )));
            }
            let deviation = (summary.positive_ratio - overall).abs();
            debug!(
                %partition,
                rows = summary.rows,
                ratio = summary.positive_ratio,
                deviation,
                "partition balance"
            );
            if deviation > self.cfg.tolerance {
                return Err(DiabriskError::Stratification(format!(
                    "{partition} positive ratio {:.4} deviates from {:.4} by more than {}",
                    summary.positive_ratio, overall, self.cfg.tolerance
                )));
            }
        }
        Ok(())
    }
}
