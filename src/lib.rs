pub mod artifacts;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod ml;
pub mod pipeline;

pub use artifacts::ArtifactStore;
pub use config::AppConfig;
pub use data::{load_csv, parse_csv, Dataset, Feature, Outcome, Record};
pub use error::{DiabriskError, Result};
pub use inference::{PatientMeasurements, RiskAssessment, RiskLevel, RiskPredictor, RiskThresholds};
pub use pipeline::{Partition, Pipeline, PipelineOutcome, PipelineReport, SplitAssignment};
