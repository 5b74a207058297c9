//! `diabrisk report`

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::output::{self, OutputMode};
use super::train::print_report;
use crate::artifacts::ArtifactStore;
use crate::config::AppConfig;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Artifact directory (defaults to artifacts.dir)
    #[arg(short, long)]
    pub artifacts: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    pub fn run(self, cfg: AppConfig) -> Result<()> {
        let dir = self.artifacts.unwrap_or(cfg.artifacts.dir);
        let report = ArtifactStore::new(&dir)
            .load_report()
            .with_context(|| format!("reading report from {}", dir.display()))?;
        match OutputMode::from_json_flag(self.json) {
            OutputMode::Json => output::print_json(&report),
            OutputMode::Table => print_report(&report),
        }
    }
}
