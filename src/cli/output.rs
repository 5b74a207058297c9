//! Output formatting for `diabrisk` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::ml::EvaluationRecord;
use crate::pipeline::PartitionSummary;

pub const DISCLAIMER: &str =
    "This is a screening estimate for education and decision support, not medical advice.";

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
    }
    Ok(())
}

pub fn print_json<T: Serialize>(item: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

pub fn print_section(title: &str) {
    println!("\n\x1b[36m{title}\x1b[0m");
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

/// Print a warning message.
pub fn print_warn(msg: &str) {
    println!("\x1b[33m{msg}\x1b[0m");
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m{msg}\x1b[0m");
}

fn fmt_metric(value: f64) -> String {
    format!("{value:.4}")
}

#[derive(Debug, Tabled, Serialize)]
pub struct MetricRow {
    pub candidate: String,
    pub partition: String,
    pub samples: usize,
    pub accuracy: String,
    pub precision: String,
    pub recall: String,
    pub f1: String,
    pub roc_auc: String,
    #[tabled(rename = "tp/fp/tn/fn")]
    pub confusion: String,
}

impl From<&EvaluationRecord> for MetricRow {
    fn from(r: &EvaluationRecord) -> Self {
        Self {
            candidate: r.candidate.clone(),
            partition: r.partition.to_string(),
            samples: r.samples,
            accuracy: fmt_metric(r.accuracy),
            precision: fmt_metric(r.precision),
            recall: fmt_metric(r.recall),
            f1: fmt_metric(r.f1),
            roc_auc: r.roc_auc.map(fmt_metric).unwrap_or_else(|| "n/a".to_string()),
            confusion: format!(
                "{}/{}/{}/{}",
                r.confusion.true_positives,
                r.confusion.false_positives,
                r.confusion.true_negatives,
                r.confusion.false_negatives
            ),
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
pub struct PartitionRow {
    pub partition: String,
    pub rows: usize,
    pub positives: usize,
    pub positive_ratio: String,
}

impl From<&PartitionSummary> for PartitionRow {
    fn from(s: &PartitionSummary) -> Self {
        Self {
            partition: s.partition.to_string(),
            rows: s.rows,
            positives: s.positives,
            positive_ratio: fmt_metric(s.positive_ratio),
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
pub struct FieldRow {
    pub field: String,
    pub value: String,
}

impl FieldRow {
    pub fn new(field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ConfusionCounts;
    use crate::pipeline::Partition;

    #[test]
    fn metric_row_formats_missing_auc() {
        let record = EvaluationRecord {
            candidate: "mlp".to_string(),
            partition: Partition::Test,
            samples: 4,
            accuracy: 0.75,
            precision: 1.0,
            recall: 0.5,
            f1: 2.0 / 3.0,
            roc_auc: None,
            confusion: ConfusionCounts {
                true_positives: 1,
                false_positives: 0,
                true_negatives: 2,
                false_negatives: 1,
            },
        };
        let row = MetricRow::from(&record);
        assert_eq!(row.partition, "test");
        assert_eq!(row.f1, "0.6667");
        assert_eq!(row.roc_auc, "n/a");
        assert_eq!(row.confusion, "1/0/2/1");
    }
}
