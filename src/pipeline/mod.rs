//! Offline batch pipeline: split, clean, scale, train and select.
//!
//! Stages run strictly in sequence and each one fully consumes its input.
//! The split assignment only looks at labels, so it is drawn first and the
//! cleaner fits its medians on the training rows it names.

pub mod clean;
pub mod run;
pub mod scale;
pub mod split;

pub use clean::{Cleaner, Imputer};
pub use run::{Pipeline, PipelineOutcome, PipelineReport};
pub use scale::{ScaledPartition, StandardScaler, ZeroVariancePolicy};
pub use split::{Partition, PartitionSummary, SplitAssignment, Splitter};
