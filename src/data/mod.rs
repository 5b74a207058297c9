//! Dataset schema, records and the CSV loader.

pub mod dataset;
pub mod loader;
pub mod schema;

pub use dataset::{Dataset, Outcome, Record};
pub use loader::{load_csv, parse_csv};
pub use schema::{Feature, LABEL_COLUMN, N_FEATURES};
