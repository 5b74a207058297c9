//! CSV loading with up-front schema validation.
//!
//! The header must name exactly the eight measurement columns plus
//! `Outcome`, in any order. Every malformed row is rejected here rather
//! than surfacing later in the pipeline.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::dataset::{Dataset, Outcome, Record};
use super::schema::{Feature, LABEL_COLUMN, N_FEATURES};
use crate::error::{DiabriskError, Result};

/// Maps header positions to schema slots.
#[derive(Debug)]
struct ColumnLayout {
    feature_idx: [usize; N_FEATURES],
    label_idx: usize,
    width: usize,
}

impl ColumnLayout {
    fn from_header(header: &str) -> Result<Self> {
        let columns: Vec<&str> = header.split(',').map(|s| s.trim()).collect();

        let mut feature_idx = [usize::MAX; N_FEATURES];
        let mut label_idx = None;

        for (pos, name) in columns.iter().enumerate() {
            if *name == LABEL_COLUMN {
                if label_idx.replace(pos).is_some() {
                    return Err(schema_err(format!("duplicate column {LABEL_COLUMN}")));
                }
                continue;
            }
            let feature = Feature::from_column_name(name)
                .ok_or_else(|| schema_err(format!("unexpected column {name:?}")))?;
            let slot = &mut feature_idx[feature.index()];
            if *slot != usize::MAX {
                return Err(schema_err(format!("duplicate column {name}")));
            }
            *slot = pos;
        }

        let missing: Vec<&str> = Feature::ALL
            .iter()
            .filter(|f| feature_idx[f.index()] == usize::MAX)
            .map(|f| f.column_name())
            .collect();
        if !missing.is_empty() {
            return Err(schema_err(format!("missing columns: {}", missing.join(", "))));
        }
        let label_idx =
            label_idx.ok_or_else(|| schema_err(format!("missing column {LABEL_COLUMN}")))?;

        Ok(Self {
            feature_idx,
            label_idx,
            width: columns.len(),
        })
    }

    fn parse_row(&self, line_no: usize, line: &str) -> Result<Record> {
        let fields: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if fields.len() != self.width {
            return Err(schema_err(format!(
                "line {line_no}: expected {} fields, got {}",
                self.width,
                fields.len()
            )));
        }

        let mut values = [0.0_f64; N_FEATURES];
        for feature in Feature::ALL {
            let raw = fields[self.feature_idx[feature.index()]];
            let value: f64 = raw.parse().map_err(|_| {
                schema_err(format!("line {line_no}: {feature} is not a number: {raw:?}"))
            })?;
            if !value.is_finite() {
                return Err(schema_err(format!(
                    "line {line_no}: {feature} must be finite, got {raw}"
                )));
            }
            values[feature.index()] = value;
        }

        let raw_label = fields[self.label_idx];
        let outcome = raw_label
            .parse::<u8>()
            .ok()
            .and_then(Outcome::from_code)
            .ok_or_else(|| {
                schema_err(format!(
                    "line {line_no}: {LABEL_COLUMN} must be 0 or 1, got {raw_label:?}"
                ))
            })?;

        Ok(Record::new(values, outcome))
    }
}

fn schema_err(msg: String) -> DiabriskError {
    DiabriskError::SchemaMismatch(msg)
}

/// Load a dataset from a CSV file.
pub fn load_csv<P: AsRef<Path>>(path: P, expected_rows: Option<usize>) -> Result<Dataset> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let dataset = parse_csv(&content, expected_rows)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        positives = dataset.positives(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Parse CSV content. Blank lines are skipped.
pub fn parse_csv(content: &str, expected_rows: Option<usize>) -> Result<Dataset> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| schema_err("empty file: no header".to_string()))?;
    let layout = ColumnLayout::from_header(header.trim_start_matches('\u{feff}'))?;
    debug!(?layout, "resolved column layout");

    let records = lines
        .map(|(line_no, line)| layout.parse_row(line_no, line))
        .collect::<Result<Vec<_>>>()?;

    if records.is_empty() {
        return Err(schema_err("no data rows".to_string()));
    }
    if let Some(expected) = expected_rows {
        if records.len() != expected {
            return Err(schema_err(format!(
                "expected {expected} rows, got {}",
                records.len()
            )));
        }
    }

    Ok(Dataset::new(records))
}
