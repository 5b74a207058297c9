use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, info_span};
use uuid::Uuid;

use super::clean::{Cleaner, Imputer};
use super::scale::StandardScaler;
use super::split::{summarize, Partition, PartitionSummary, SplitAssignment, Splitter};
use crate::config::{AppConfig, SelectionConfig};
use crate::data::{load_csv, Dataset, Feature};
use crate::error::{DiabriskError, Result};
use crate::ml::{build_candidates, select, EvaluationRecord, TrainedModel};

/// Summary of one training run, persisted as `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub dataset_rows: usize,
    pub split_seed: u64,
    pub training_seed: u64,
    pub partitions: Vec<PartitionSummary>,
    pub imputation_medians: BTreeMap<Feature, f64>,
    pub scaler_fingerprint: String,
    pub selection: SelectionConfig,
    pub decision_threshold: f64,
    /// One record per candidate, in configuration order
    pub validation: Vec<EvaluationRecord>,
    pub selected: String,
    /// Held-out evaluation of the selected candidate only
    pub test: EvaluationRecord,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub split: SplitAssignment,
    pub imputer: Imputer,
    pub scaler: StandardScaler,
    pub model: TrainedModel,
    pub report: PipelineReport,
}

/// Load → split → clean → scale → train/select, in one forward pass.
#[derive(Debug, Clone)]
pub struct Pipeline {
    cfg: AppConfig,
}

impl Pipeline {
    pub fn new(cfg: AppConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<PipelineOutcome> {
        let dataset = load_csv(path, self.cfg.data.expected_rows)?;
        self.run(&dataset)
    }

    pub fn run(&self, dataset: &Dataset) -> Result<PipelineOutcome> {
        let split = Splitter::new(self.cfg.split).split(dataset)?;
        self.run_with_split(dataset, split)
    }

    /// Run every stage after splitting, with a caller-provided assignment.
    pub fn run_with_split(
        &self,
        dataset: &Dataset,
        split: SplitAssignment,
    ) -> Result<PipelineOutcome> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let _span = info_span!("pipeline", %run_id).entered();

        if split.len() != dataset.len() {
            return Err(DiabriskError::Validation(format!(
                "split covers {} records, dataset has {}",
                split.len(),
                dataset.len()
            )));
        }
        let partitions: Vec<PartitionSummary> = Partition::ALL
            .iter()
            .map(|p| summarize(dataset, &split, *p))
            .collect();

        let cleaner = Cleaner::new(self.cfg.cleaning.zero_as_missing.clone());
        let (cleaned, imputer) = cleaner.clean(dataset, &split)?;

        let scaler =
            StandardScaler::fit_partition(&cleaned, &split, self.cfg.scaling.zero_variance)?;
        let train = scaler.transform_partition(&cleaned, &split, Partition::Train);
        let validation = scaler.transform_partition(&cleaned, &split, Partition::Validation);
        let test = scaler.transform_partition(&cleaned, &split, Partition::Test);

        let threshold = self.cfg.training.decision_threshold;
        let candidates = build_candidates(&self.cfg.training);
        if candidates.is_empty() {
            return Err(DiabriskError::Validation(
                "no candidates configured".to_string(),
            ));
        }

        let mut models = Vec::with_capacity(candidates.len());
        let mut records = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let model = candidate.fit(&train, &validation)?;
            let record = candidate.score(&model, &validation, threshold)?;
            info!(
                candidate = candidate.name(),
                accuracy = record.accuracy,
                precision = record.precision,
                recall = record.recall,
                f1 = record.f1,
                roc_auc = ?record.roc_auc,
                "validation metrics"
            );
            models.push(model);
            records.push(record);
        }

        let idx = select(&records, &self.cfg.selection)?;
        let test_record = candidates[idx].score(&models[idx], &test, threshold)?;
        info!(
            candidate = %test_record.candidate,
            recall = test_record.recall,
            f1 = test_record.f1,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "test evaluation"
        );

        let model = models.swap_remove(idx);
        let report = PipelineReport {
            run_id,
            trained_at: Utc::now(),
            dataset_rows: dataset.len(),
            split_seed: self.cfg.split.seed,
            training_seed: self.cfg.training.seed,
            partitions,
            imputation_medians: imputer.medians().clone(),
            scaler_fingerprint: scaler.fingerprint.clone(),
            selection: self.cfg.selection,
            decision_threshold: threshold,
            validation: records,
            selected: model.candidate.clone(),
            test: test_record,
        };

        Ok(PipelineOutcome {
            split,
            imputer,
            scaler,
            model,
            report,
        })
    }
}
