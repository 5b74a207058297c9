//! Write-once persistence of the imputer, scaler, selected model and run
//! report.
//!
//! Artifacts are pretty-printed JSON. serde_json is built with
//! `float_roundtrip`, so every f64 reads back bit-for-bit and a reloaded
//! imputer/scaler/model set reproduces the original outputs exactly.
//!
//! A save stages every file as `<name>.tmp` first. Nothing is renamed into
//! place until all staged writes succeed, and a failed write removes the
//! files staged so far.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{DiabriskError, Result};
use crate::ml::TrainedModel;
use crate::pipeline::{Imputer, PipelineOutcome, PipelineReport, StandardScaler};

pub const IMPUTER_FILE: &str = "imputer.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const REPORT_FILE: &str = "report.json";

const ARTIFACT_FILES: [&str; 4] = [IMPUTER_FILE, SCALER_FILE, MODEL_FILE, REPORT_FILE];

/// Directory holding one run's artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// True when any artifact from a previous run is present.
    pub fn exists(&self) -> bool {
        ARTIFACT_FILES.iter().any(|f| self.path(f).exists())
    }

    /// Persist a run. Existing artifacts are only replaced with `overwrite`.
    pub fn save(&self, outcome: &PipelineOutcome, overwrite: bool) -> Result<()> {
        if self.exists() {
            if !overwrite {
                return Err(DiabriskError::ArtifactExists(self.dir.display().to_string()));
            }
            warn!(dir = %self.dir.display(), "overwriting existing artifacts");
        }
        if outcome.model.scaler_fingerprint != outcome.scaler.fingerprint {
            return Err(DiabriskError::ScalerMismatch {
                expected: outcome.model.scaler_fingerprint.clone(),
                actual: outcome.scaler.fingerprint.clone(),
            });
        }

        let contents = [
            (IMPUTER_FILE, serde_json::to_string_pretty(&outcome.imputer)?),
            (SCALER_FILE, serde_json::to_string_pretty(&outcome.scaler)?),
            (MODEL_FILE, serde_json::to_string_pretty(&outcome.model)?),
            (REPORT_FILE, serde_json::to_string_pretty(&outcome.report)?),
        ];

        fs::create_dir_all(&self.dir)?;
        let mut staged = Vec::with_capacity(contents.len());
        for (file, body) in &contents {
            let tmp = self.tmp_path(file);
            if let Err(e) = fs::write(&tmp, body) {
                warn!(
                    file = %tmp.display(),
                    error = %e,
                    "artifact write failed, discarding staged files"
                );
                discard(&staged);
                return Err(e.into());
            }
            staged.push(tmp);
        }
        for ((file, _), tmp) in contents.iter().zip(&staged) {
            fs::rename(tmp, self.path(file))?;
        }
        info!(
            dir = %self.dir.display(),
            candidate = %outcome.model.candidate,
            "saved artifacts"
        );
        Ok(())
    }

    pub fn load_imputer(&self) -> Result<Imputer> {
        self.read_json(IMPUTER_FILE)
    }

    pub fn load_scaler(&self) -> Result<StandardScaler> {
        let scaler: StandardScaler = self.read_json(SCALER_FILE)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn load_model(&self) -> Result<TrainedModel> {
        let model: TrainedModel = self.read_json(MODEL_FILE)?;
        model.validate()?;
        Ok(model)
    }

    pub fn load_report(&self) -> Result<PipelineReport> {
        self.read_json(REPORT_FILE)
    }

    fn tmp_path(&self, file: &str) -> PathBuf {
        self.dir.join(format!("{file}.tmp"))
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.path(file);
        if !path.exists() {
            return Err(DiabriskError::ArtifactMissing(path.display().to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn discard(staged: &[PathBuf]) {
    for tmp in staged {
        if let Err(e) = fs::remove_file(tmp) {
            warn!(file = %tmp.display(), error = %e, "failed to remove staged artifact");
        }
    }
}
