//! Inference over persisted artifacts.
//!
//! A [`RiskPredictor`] owns the training-median imputer, the scaler and the
//! model trained on its output. It holds no global state: load the set once
//! and call `assess` as often as needed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::artifacts::ArtifactStore;
use crate::data::{Feature, N_FEATURES};
use crate::error::{DiabriskError, Result};
use crate::ml::TrainedModel;
use crate::pipeline::{Imputer, StandardScaler};

/// Raw clinical measurements for one patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatientMeasurements {
    pub pregnancies: f64,
    pub glucose: f64,
    pub blood_pressure: f64,
    pub skin_thickness: f64,
    pub insulin: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    pub diabetes_pedigree_function: f64,
    pub age: f64,
}

impl PatientMeasurements {
    /// Values in schema order.
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        let mut values = [0.0; N_FEATURES];
        values[Feature::Pregnancies.index()] = self.pregnancies;
        values[Feature::Glucose.index()] = self.glucose;
        values[Feature::BloodPressure.index()] = self.blood_pressure;
        values[Feature::SkinThickness.index()] = self.skin_thickness;
        values[Feature::Insulin.index()] = self.insulin;
        values[Feature::Bmi.index()] = self.bmi;
        values[Feature::DiabetesPedigreeFunction.index()] = self.diabetes_pedigree_function;
        values[Feature::Age.index()] = self.age;
        values
    }

    pub fn validate(&self) -> Result<()> {
        for (feature, value) in Feature::ALL.iter().zip(self.to_array()) {
            if !value.is_finite() || value < 0.0 {
                return Err(DiabriskError::Validation(format!(
                    "{feature} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn guidance(self) -> &'static str {
        match self {
            RiskLevel::Low => {
                "Risk appears low based on the inputs. Keep healthy habits and schedule regular checkups."
            }
            RiskLevel::Medium => {
                "Risk appears moderate based on the inputs. Consider lifestyle improvements and consult a clinician if concerned."
            }
            RiskLevel::High => {
                "Risk appears high based on the inputs. It may be worth discussing screening/testing with a medical professional."
            }
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(name)
    }
}

/// Probability cut points for risk banding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Probabilities at or above this are at least Medium
    pub medium: f64,
    /// Probabilities at or above this are High
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.33,
            high: 0.66,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0 < self.medium && self.medium < self.high && self.high < 1.0) {
            return Err(format!(
                "risk thresholds must satisfy 0 < medium < high < 1, got {} / {}",
                self.medium, self.high
            ));
        }
        Ok(())
    }

    pub fn level(&self, probability: f64) -> RiskLevel {
        if probability < self.medium {
            RiskLevel::Low
        } else if probability < self.high {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub probability: f64,
    pub predicted_positive: bool,
    pub risk_level: RiskLevel,
    pub candidate: String,
    pub input: PatientMeasurements,
}

#[derive(Debug, Clone)]
pub struct RiskPredictor {
    imputer: Imputer,
    scaler: StandardScaler,
    model: TrainedModel,
    thresholds: RiskThresholds,
    decision_threshold: f64,
}

impl RiskPredictor {
    pub fn new(
        imputer: Imputer,
        scaler: StandardScaler,
        model: TrainedModel,
        thresholds: RiskThresholds,
        decision_threshold: f64,
    ) -> Result<Self> {
        model.ensure_scaler(&scaler.fingerprint)?;
        thresholds.validate().map_err(DiabriskError::Validation)?;
        Ok(Self {
            imputer,
            scaler,
            model,
            thresholds,
            decision_threshold,
        })
    }

    pub fn from_store(
        store: &ArtifactStore,
        thresholds: RiskThresholds,
        decision_threshold: f64,
    ) -> Result<Self> {
        Self::new(
            store.load_imputer()?,
            store.load_scaler()?,
            store.load_model()?,
            thresholds,
            decision_threshold,
        )
    }

    pub fn candidate(&self) -> &str {
        &self.model.candidate
    }

    /// Probability for raw measurements. Zeros in the imputed columns are
    /// treated as missing, exactly as during training.
    pub fn probability(&self, input: &PatientMeasurements) -> Result<f64> {
        input.validate()?;
        let imputed = self.imputer.impute_row(&input.to_array());
        let scaled = self.scaler.transform_row(&imputed);
        self.model.predict_proba(&scaled)
    }

    pub fn assess(&self, input: &PatientMeasurements) -> Result<RiskAssessment> {
        let probability = self.probability(input)?;
        Ok(RiskAssessment {
            probability,
            predicted_positive: probability >= self.decision_threshold,
            risk_level: self.thresholds.level(probability),
            candidate: self.model.candidate.clone(),
            input: *input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogisticConfig;
    use crate::data::{Dataset, Outcome, Record};
    use crate::ml::{LogisticModel, Model};
    use crate::pipeline::split::{Partition, SplitAssignment};
    use crate::pipeline::{Cleaner, ZeroVariancePolicy};

    fn patient(glucose: f64) -> PatientMeasurements {
        PatientMeasurements {
            pregnancies: 0.0,
            glucose,
            blood_pressure: 70.0,
            skin_thickness: 20.0,
            insulin: 120.0,
            bmi: 32.0,
            diabetes_pedigree_function: 0.5,
            age: 30.0,
        }
    }

    fn predictor() -> RiskPredictor {
        // Every column varies; glucose spans 80..=179.
        let rows: Vec<[f64; N_FEATURES]> = (0..10)
            .map(|i| {
                let mut row = patient(80.0 + 10.0 * i as f64).to_array();
                for v in row.iter_mut() {
                    *v += i as f64;
                }
                row
            })
            .collect();
        let dataset = Dataset::new(
            rows.iter()
                .map(|r| Record::new(*r, Outcome::Negative))
                .collect(),
        );
        let split = SplitAssignment::from_labels(vec![Partition::Train; rows.len()]);
        let (_, imputer) = Cleaner::default().clean(&dataset, &split).unwrap();
        let scaler = StandardScaler::fit(&rows, ZeroVariancePolicy::Fail).unwrap();
        let mut coefficients = vec![0.0; N_FEATURES];
        coefficients[Feature::Glucose.index()] = 2.0;
        let model = TrainedModel {
            candidate: "logistic_regression_balanced".to_string(),
            scaler_fingerprint: scaler.fingerprint.clone(),
            model: Model::Logistic(LogisticModel {
                intercept: 0.0,
                coefficients,
                params: LogisticConfig::default(),
                iterations: 1,
            }),
        };
        RiskPredictor::new(imputer, scaler, model, RiskThresholds::default(), 0.5).unwrap()
    }

    #[test]
    fn banding_uses_half_open_intervals() {
        let t = RiskThresholds::default();
        assert_eq!(t.level(0.0), RiskLevel::Low);
        assert_eq!(t.level(0.3299), RiskLevel::Low);
        assert_eq!(t.level(0.33), RiskLevel::Medium);
        assert_eq!(t.level(0.6599), RiskLevel::Medium);
        assert_eq!(t.level(0.66), RiskLevel::High);
        assert_eq!(t.level(1.0), RiskLevel::High);
    }

    #[test]
    fn thresholds_must_be_ordered() {
        assert!(RiskThresholds { medium: 0.7, high: 0.3 }.validate().is_err());
        assert!(RiskThresholds { medium: 0.0, high: 0.5 }.validate().is_err());
        assert!(RiskThresholds::default().validate().is_ok());
    }

    #[test]
    fn higher_glucose_means_higher_risk() {
        let p = predictor();
        let low = p.assess(&patient(70.0)).unwrap();
        let high = p.assess(&patient(200.0)).unwrap();
        assert!(high.probability > low.probability);
        assert_eq!(low.risk_level, RiskLevel::Low);
        assert_eq!(high.risk_level, RiskLevel::High);
        assert!(high.predicted_positive);
        assert!(!low.predicted_positive);
        assert_eq!(high.candidate, "logistic_regression_balanced");
    }

    #[test]
    fn assessment_is_repeatable() {
        let p = predictor();
        let a = p.assess(&patient(130.0)).unwrap();
        let b = p.assess(&patient(130.0)).unwrap();
        assert_eq!(a.probability.to_bits(), b.probability.to_bits());
    }

    #[test]
    fn rejects_invalid_input_and_foreign_model() {
        let p = predictor();
        assert!(p.assess(&patient(f64::NAN)).is_err());
        assert!(p.assess(&patient(-1.0)).is_err());

        let mut model = p.model.clone();
        model.scaler_fingerprint = "other".to_string();
        let err = RiskPredictor::new(
            p.imputer.clone(),
            p.scaler.clone(),
            model,
            RiskThresholds::default(),
            0.5,
        )
        .unwrap_err();
        assert!(matches!(err, DiabriskError::ScalerMismatch { .. }));
    }

    #[test]
    fn unmeasured_zeros_score_as_training_medians() {
        let p = predictor();
        let median = p.imputer.median(Feature::Glucose).unwrap();
        let missing = p.assess(&patient(0.0)).unwrap();
        let imputed = p.assess(&patient(median)).unwrap();
        assert_eq!(missing.probability.to_bits(), imputed.probability.to_bits());
        assert_eq!(missing.input.glucose, 0.0);

        let mut blank = patient(0.0);
        blank.blood_pressure = 0.0;
        blank.skin_thickness = 0.0;
        blank.insulin = 0.0;
        blank.bmi = 0.0;
        assert_ne!(p.assess(&blank).unwrap().risk_level, RiskLevel::Low);
    }

    #[test]
    fn measurements_use_dataset_column_names() {
        let json = serde_json::to_value(patient(120.0)).unwrap();
        assert_eq!(json["Glucose"], 120.0);
        assert_eq!(json["BMI"], 32.0);
        assert_eq!(json["DiabetesPedigreeFunction"], 0.5);
    }
}
