//! `diabrisk train`

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use super::output::{self, FieldRow, MetricRow, OutputMode, PartitionRow};
use crate::artifacts::ArtifactStore;
use crate::config::AppConfig;
use crate::pipeline::{Pipeline, PipelineReport};

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset CSV (defaults to data.path)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Seed for both the split and model initialization
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Artifact directory (defaults to artifacts.dir)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Replace artifacts from a previous run
    #[arg(short, long)]
    pub force: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl TrainArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(data) = &self.data {
            cfg.data.path = data.clone();
        }
        if let Some(seed) = self.seed {
            cfg.split.seed = seed;
            cfg.training.seed = seed;
        }
        if let Some(out) = &self.out {
            cfg.artifacts.dir = out.clone();
        }
        if self.force {
            cfg.artifacts.overwrite = true;
        }
    }

    pub fn run(self, mut cfg: AppConfig) -> Result<()> {
        self.apply(&mut cfg);
        let store = ArtifactStore::new(&cfg.artifacts.dir);
        if store.exists() && !cfg.artifacts.overwrite {
            anyhow::bail!(
                "artifacts already exist in {}; pass --force to replace them",
                store.dir().display()
            );
        }

        info!(data = %cfg.data.path.display(), "starting training run");
        let data_path = cfg.data.path.clone();
        let overwrite = cfg.artifacts.overwrite;
        let outcome = Pipeline::new(cfg)
            .run_file(&data_path)
            .with_context(|| format!("training on {} failed", data_path.display()))?;
        store.save(&outcome, overwrite)?;

        let mode = OutputMode::from_json_flag(self.json);
        match mode {
            OutputMode::Json => output::print_json(&outcome.report)?,
            OutputMode::Table => {
                print_report(&outcome.report)?;
                output::print_success(&format!(
                    "Saved {} to {}",
                    outcome.report.selected,
                    store.dir().display()
                ));
            }
        }
        Ok(())
    }
}

/// Table rendering shared with `diabrisk report`.
pub fn print_report(report: &PipelineReport) -> Result<()> {
    let mode = OutputMode::Table;

    output::print_section("Run");
    let run = vec![
        FieldRow::new("run_id", report.run_id),
        FieldRow::new("trained_at", report.trained_at.to_rfc3339()),
        FieldRow::new("rows", report.dataset_rows),
        FieldRow::new("split_seed", report.split_seed),
        FieldRow::new("training_seed", report.training_seed),
        FieldRow::new("scaler", &report.scaler_fingerprint),
        FieldRow::new(
            "selection",
            format!("{} then {}", report.selection.priority, report.selection.tie_break),
        ),
        FieldRow::new("decision_threshold", report.decision_threshold),
    ];
    output::print_items(&run, mode)?;

    output::print_section("Partitions");
    let partitions: Vec<PartitionRow> = report.partitions.iter().map(PartitionRow::from).collect();
    output::print_items(&partitions, mode)?;

    output::print_section("Imputation medians (training rows)");
    let medians: Vec<FieldRow> = report
        .imputation_medians
        .iter()
        .map(|(feature, median)| FieldRow::new(feature.column_name(), median))
        .collect();
    output::print_items(&medians, mode)?;

    output::print_section("Validation");
    let validation: Vec<MetricRow> = report.validation.iter().map(MetricRow::from).collect();
    output::print_items(&validation, mode)?;

    output::print_section(&format!("Test ({})", report.selected));
    output::print_items(&[MetricRow::from(&report.test)], mode)?;
    Ok(())
}
