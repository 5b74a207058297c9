use thiserror::Error;

/// Main error type for the risk pipeline
#[derive(Error, Debug)]
pub enum DiabriskError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Dataset errors
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Insufficient data in column {column}: {reason}")]
    InsufficientData { column: String, reason: String },

    // Split errors
    #[error("Stratification error: {0}")]
    Stratification(String),

    // Scaling errors
    #[error("Degenerate column {column}: zero variance in training partition")]
    DegenerateColumn { column: String },

    #[error("Scaler mismatch: model expects {expected}, features scaled with {actual}")]
    ScalerMismatch { expected: String, actual: String },

    // Artifact errors
    #[error("Artifact already exists: {0}")]
    ArtifactExists(String),

    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DiabriskError {
    pub fn insufficient_data(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that mean the input data cannot support a run.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch(_)
                | Self::InsufficientData { .. }
                | Self::Stratification(_)
                | Self::DegenerateColumn { .. }
        )
    }
}

/// Result type alias for DiabriskError
pub type Result<T> = std::result::Result<T, DiabriskError>;
