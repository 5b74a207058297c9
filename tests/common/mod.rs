#![allow(dead_code)]

use std::path::PathBuf;

use diabrisk::config::{CandidateConfig, ClassWeight, LogisticConfig, MlpConfig};
use diabrisk::data::{Feature, N_FEATURES};
use diabrisk::{AppConfig, Dataset, Outcome, Record};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const HEADER: &str = "Pregnancies,Glucose,BloodPressure,SkinThickness,Insulin,BMI,DiabetesPedigreeFunction,Age,Outcome";

/// Pima-shaped CSV: about a third positive, with the usual zero
/// placeholders in BloodPressure, SkinThickness and Insulin.
pub fn synthetic_csv(rows: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = String::from(HEADER);
    out.push('\n');
    for _ in 0..rows {
        let positive = rng.gen_bool(0.35);
        let shift = if positive { 1.0 } else { 0.0 };
        let pregnancies = rng.gen_range(0..8) + if positive { 2 } else { 0 };
        let glucose = rng.gen_range(75.0..150.0) + 35.0 * shift;
        let blood_pressure = if rng.gen_bool(0.05) {
            0.0
        } else {
            rng.gen_range(55.0..90.0)
        };
        let skin = if rng.gen_bool(0.25) {
            0.0
        } else {
            rng.gen_range(10.0..45.0) + 4.0 * shift
        };
        let insulin = if rng.gen_bool(0.4) {
            0.0
        } else {
            rng.gen_range(30.0..250.0) + 60.0 * shift
        };
        let bmi = rng.gen_range(20.0..38.0) + 5.0 * shift;
        let dpf = rng.gen_range(0.08..1.2) + 0.15 * shift;
        let age = rng.gen_range(21..55) + if positive { 8 } else { 0 };
        out.push_str(&format!(
            "{pregnancies},{glucose:.0},{blood_pressure:.0},{skin:.0},{insulin:.0},{bmi:.1},{dpf:.3},{age},{}\n",
            u8::from(positive)
        ));
    }
    out
}

pub fn synthetic_dataset(rows: usize, seed: u64) -> Dataset {
    diabrisk::parse_csv(&synthetic_csv(rows, seed), Some(rows)).unwrap()
}

/// Fresh directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("diabrisk-{label}-{}", uuid::Uuid::new_v4()))
}

/// Default candidates with a shorter MLP schedule.
pub fn quick_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.training.candidates = vec![
        CandidateConfig::Logistic {
            name: "logistic_regression".to_string(),
            params: LogisticConfig::default(),
        },
        CandidateConfig::Logistic {
            name: "logistic_regression_balanced".to_string(),
            params: LogisticConfig {
                class_weight: ClassWeight::Balanced,
                ..LogisticConfig::default()
            },
        },
        CandidateConfig::Mlp {
            name: "mlp".to_string(),
            params: MlpConfig {
                hidden_layers: vec![8],
                learning_rate: 0.01,
                max_epochs: 60,
                patience: 10,
                ..MlpConfig::default()
            },
        },
    ];
    cfg
}

/// Build a record from named values; unspecified columns get `fill`.
pub fn record(values: &[(Feature, f64)], fill: f64, outcome: Outcome) -> Record {
    let mut row = [fill; N_FEATURES];
    for (feature, value) in values {
        row[feature.index()] = *value;
    }
    Record::new(row, outcome)
}
