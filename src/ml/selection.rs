//! Metric-driven candidate selection.
//!
//! Accuracy is a poor default on this label distribution, so selection
//! ranks by a configurable priority metric (recall unless configured) and
//! breaks ties with a second metric. Remaining ties go to the candidate
//! listed first.

use tracing::info;

use super::metrics::EvaluationRecord;
use crate::config::SelectionConfig;
use crate::error::{DiabriskError, Result};

/// Index of the winning record in `records`.
pub fn select(records: &[EvaluationRecord], cfg: &SelectionConfig) -> Result<usize> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (idx, record) in records.iter().enumerate() {
        let primary = record.value(cfg.priority);
        let secondary = record.value(cfg.tie_break);
        let better = match best {
            None => true,
            Some((_, bp, bs)) => primary > bp || (primary == bp && secondary > bs),
        };
        if better {
            best = Some((idx, primary, secondary));
        }
    }

    let (idx, primary, secondary) = best.ok_or_else(|| {
        DiabriskError::Validation("no candidate evaluations to select from".to_string())
    })?;
    info!(
        candidate = %records[idx].candidate,
        priority = %cfg.priority,
        primary,
        tie_break = %cfg.tie_break,
        secondary,
        "selected candidate"
    );
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::metrics::{ConfusionCounts, Metric};
    use crate::pipeline::split::Partition;

    fn record(name: &str, accuracy: f64, recall: f64, f1: f64) -> EvaluationRecord {
        EvaluationRecord {
            candidate: name.to_string(),
            partition: Partition::Validation,
            samples: 100,
            accuracy,
            precision: 0.5,
            recall,
            f1,
            roc_auc: Some(0.8),
            confusion: ConfusionCounts::default(),
        }
    }

    #[test]
    fn recall_beats_accuracy() {
        // Accuracy favours the unweighted model, recall the balanced one.
        let records = vec![
            record("logistic_regression", 0.7130, 0.5750, 0.6133),
            record("logistic_regression_balanced", 0.7043, 0.7250, 0.6517),
        ];
        let idx = select(&records, &SelectionConfig::default()).unwrap();
        assert_eq!(records[idx].candidate, "logistic_regression_balanced");

        let by_accuracy = SelectionConfig {
            priority: Metric::Accuracy,
            tie_break: Metric::F1,
        };
        assert_eq!(select(&records, &by_accuracy).unwrap(), 0);
    }

    #[test]
    fn tie_break_then_order() {
        let records = vec![
            record("a", 0.7, 0.6, 0.50),
            record("b", 0.7, 0.6, 0.55),
            record("c", 0.7, 0.6, 0.55),
        ];
        assert_eq!(select(&records, &SelectionConfig::default()).unwrap(), 1);
    }

    #[test]
    fn empty_is_an_error() {
        assert!(select(&[], &SelectionConfig::default()).is_err());
    }
}
