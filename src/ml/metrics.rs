//! Binary classification metrics.
//!
//! Precision, recall and F1 follow the zero-division-is-zero convention.
//! ROC-AUC is the Mann-Whitney statistic with ties counted as one half and
//! is undefined (`None`) when only one class is present.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DiabriskError, Result};
use crate::pipeline::split::Partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    Precision,
    Recall,
    F1,
    RocAuc,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::F1 => "f1",
            Metric::RocAuc => "roc_auc",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    pub fn from_predictions(targets: &[f64], predicted: &[bool]) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in targets.iter().zip(predicted) {
            match (t >= 0.5, p) {
                (true, true) => counts.true_positives += 1,
                (false, true) => counts.false_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (true, false) => counts.false_negatives += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve; `None` when a class is absent.
pub fn roc_auc(targets: &[f64], scores: &[f64]) -> Option<f64> {
    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .zip(targets)
        .map(|(&s, &t)| (s, t >= 0.5))
        .collect();
    let n_pos = pairs.iter().filter(|(_, y)| *y).count();
    let n_neg = pairs.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Sum of positive ranks with average ranks for ties.
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < pairs.len() {
        let mut j = i;
        while j + 1 < pairs.len() && pairs[j + 1].0 == pairs[i].0 {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        let tied_pos = pairs[i..=j].iter().filter(|(_, y)| *y).count();
        rank_sum += avg_rank * tied_pos as f64;
        i = j + 1;
    }

    let n_pos_f = n_pos as f64;
    Some((rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64))
}

/// Metrics of one model on one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub candidate: String,
    pub partition: Partition,
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: Option<f64>,
    pub confusion: ConfusionCounts,
}

impl EvaluationRecord {
    /// Score probabilities against 0/1 targets at `threshold`.
    pub fn compute(
        candidate: &str,
        partition: Partition,
        targets: &[f64],
        probabilities: &[f64],
        threshold: f64,
    ) -> Result<Self> {
        if targets.len() != probabilities.len() {
            return Err(DiabriskError::Validation(format!(
                "{} targets but {} probabilities",
                targets.len(),
                probabilities.len()
            )));
        }
        if targets.is_empty() {
            return Err(DiabriskError::Validation(format!(
                "cannot evaluate {candidate} on empty {partition} partition"
            )));
        }
        let predicted: Vec<bool> = probabilities.iter().map(|p| *p >= threshold).collect();
        let confusion = ConfusionCounts::from_predictions(targets, &predicted);
        Ok(Self {
            candidate: candidate.to_string(),
            partition,
            samples: targets.len(),
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            roc_auc: roc_auc(targets, probabilities),
            confusion,
        })
    }

    /// Value of `metric`; undefined ROC-AUC reads as negative infinity.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.accuracy,
            Metric::Precision => self.precision,
            Metric::Recall => self.recall,
            Metric::F1 => self.f1,
            Metric::RocAuc => self.roc_auc.unwrap_or(f64::NEG_INFINITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confusion_metrics() {
        let targets = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let predicted = [true, true, false, true, false, false, false, false];
        let c = ConfusionCounts::from_predictions(&targets, &predicted);
        assert_eq!(c.true_positives, 2);
        assert_eq!(c.false_negatives, 2);
        assert_eq!(c.false_positives, 1);
        assert_eq!(c.true_negatives, 3);
        assert!((c.accuracy() - 5.0 / 8.0).abs() < 1e-12);
        assert!((c.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((c.recall() - 0.5).abs() < 1e-12);
        assert!((c.f1() - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn zero_division_reads_as_zero() {
        let c = ConfusionCounts::from_predictions(&[0.0, 1.0], &[false, false]);
        assert_eq!(c.precision(), 0.0);
        assert_eq!(c.recall(), 0.0);
        assert_eq!(c.f1(), 0.0);
    }

    #[test]
    fn auc_perfect_inverted_and_tied() {
        let targets = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&targets, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&targets, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
        assert_eq!(roc_auc(&targets, &[0.5, 0.5, 0.5, 0.5]), Some(0.5));
        // One of four positive/negative pairs is misordered.
        let auc = roc_auc(&targets, &[0.1, 0.4, 0.35, 0.8]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn auc_undefined_for_single_class() {
        assert_eq!(roc_auc(&[1.0, 1.0], &[0.2, 0.9]), None);
        let rec = EvaluationRecord::compute("m", Partition::Test, &[1.0], &[0.9], 0.5).unwrap();
        assert_eq!(rec.roc_auc, None);
        assert_eq!(rec.value(Metric::RocAuc), f64::NEG_INFINITY);
    }

    #[test]
    fn compute_applies_threshold() {
        let rec = EvaluationRecord::compute(
            "m",
            Partition::Validation,
            &[1.0, 0.0, 1.0, 0.0],
            &[0.5, 0.49, 0.3, 0.7],
            0.5,
        )
        .unwrap();
        assert_eq!(rec.samples, 4);
        assert_eq!(rec.confusion.true_positives, 1);
        assert_eq!(rec.confusion.false_positives, 1);
        assert_eq!(rec.value(Metric::Recall), 0.5);
    }

    #[test]
    fn compute_rejects_mismatched_lengths() {
        assert!(EvaluationRecord::compute("m", Partition::Test, &[1.0], &[], 0.5).is_err());
        assert!(EvaluationRecord::compute("m", Partition::Test, &[], &[], 0.5).is_err());
    }
}
