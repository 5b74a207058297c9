//! `diabrisk predict`

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::output::{self, FieldRow, OutputMode};
use crate::artifacts::ArtifactStore;
use crate::config::AppConfig;
use crate::data::Feature;
use crate::inference::{PatientMeasurements, RiskAssessment, RiskPredictor};

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Number of pregnancies
    #[arg(long)]
    pub pregnancies: f64,

    /// Plasma glucose concentration (mg/dL)
    #[arg(long)]
    pub glucose: f64,

    /// Diastolic blood pressure (mm Hg)
    #[arg(long)]
    pub blood_pressure: f64,

    /// Triceps skin fold thickness (mm)
    #[arg(long)]
    pub skin_thickness: f64,

    /// 2-hour serum insulin (mu U/ml)
    #[arg(long)]
    pub insulin: f64,

    /// Body mass index
    #[arg(long)]
    pub bmi: f64,

    /// Diabetes pedigree function
    #[arg(long, visible_alias = "dpf")]
    pub diabetes_pedigree_function: f64,

    /// Age in years
    #[arg(long)]
    pub age: f64,

    /// Artifact directory (defaults to artifacts.dir)
    #[arg(short, long)]
    pub artifacts: Option<PathBuf>,

    /// Also print the measurements that were scored
    #[arg(long)]
    pub show_input: bool,

    /// Print the assessment as JSON
    #[arg(long)]
    pub json: bool,
}

impl PredictArgs {
    pub fn measurements(&self) -> PatientMeasurements {
        PatientMeasurements {
            pregnancies: self.pregnancies,
            glucose: self.glucose,
            blood_pressure: self.blood_pressure,
            skin_thickness: self.skin_thickness,
            insulin: self.insulin,
            bmi: self.bmi,
            diabetes_pedigree_function: self.diabetes_pedigree_function,
            age: self.age,
        }
    }

    pub fn run(self, cfg: AppConfig) -> Result<()> {
        let dir = self.artifacts.clone().unwrap_or(cfg.artifacts.dir);
        let store = ArtifactStore::new(&dir);
        let predictor =
            RiskPredictor::from_store(&store, cfg.risk, cfg.training.decision_threshold)
                .with_context(|| format!("loading artifacts from {}", dir.display()))?;
        let assessment = predictor.assess(&self.measurements())?;

        match OutputMode::from_json_flag(self.json) {
            OutputMode::Json => output::print_json(&assessment)?,
            OutputMode::Table => print_assessment(&assessment, self.show_input)?,
        }
        Ok(())
    }
}

fn print_assessment(assessment: &RiskAssessment, show_input: bool) -> Result<()> {
    if show_input {
        output::print_section("Input");
        let values = assessment.input.to_array();
        let rows: Vec<FieldRow> = Feature::ALL
            .iter()
            .map(|f| FieldRow::new(f.column_name(), values[f.index()]))
            .collect();
        output::print_items(&rows, OutputMode::Table)?;
    }

    output::print_section("Assessment");
    let rows = vec![
        FieldRow::new("model", &assessment.candidate),
        FieldRow::new(
            "probability",
            format!("{:.1}%", assessment.probability * 100.0),
        ),
        FieldRow::new(
            "predicted",
            if assessment.predicted_positive {
                "diabetes likely"
            } else {
                "diabetes unlikely"
            },
        ),
        FieldRow::new("risk_level", assessment.risk_level),
    ];
    output::print_items(&rows, OutputMode::Table)?;

    println!("\n{}", assessment.risk_level.guidance());
    output::print_warn(output::DISCLAIMER);
    Ok(())
}
