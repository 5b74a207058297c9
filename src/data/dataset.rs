use serde::{Deserialize, Serialize};

use super::schema::{Feature, N_FEATURES};

/// Binary diagnosis label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Negative,
    Positive,
}

impl Outcome {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Outcome::Negative),
            1 => Some(Outcome::Positive),
            _ => None,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Outcome::Positive)
    }

    /// Label as a regression target (0.0 / 1.0).
    pub fn as_target(self) -> f64 {
        if self.is_positive() {
            1.0
        } else {
            0.0
        }
    }
}

/// One dataset row: 8 measurements plus the label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: [f64; N_FEATURES],
    pub outcome: Outcome,
}

impl Record {
    pub fn new(values: [f64; N_FEATURES], outcome: Outcome) -> Self {
        Self { values, outcome }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }
}

/// Ordered collection of records sharing the fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome.is_positive())
            .count()
    }

    /// Fraction of records labelled positive (0.0 for an empty dataset).
    pub fn positive_ratio(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.positives() as f64 / self.records.len() as f64
    }

    pub fn column(&self, feature: Feature) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(move |r| r.get(feature))
    }
}
