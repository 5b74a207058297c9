use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::Feature;
use crate::inference::RiskThresholds;
use crate::ml::metrics::Metric;
use crate::pipeline::scale::ZeroVariancePolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub scaling: ScalingConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub risk: RiskThresholds,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with the eight measurements and `Outcome`
    pub path: PathBuf,
    /// Reject the file unless it has exactly this many data rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_rows: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/diabetes.csv"),
            expected_rows: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Columns where zero means "not measured"
    #[serde(default = "default_zero_as_missing")]
    pub zero_as_missing: Vec<Feature>,
}

fn default_zero_as_missing() -> Vec<Feature> {
    Feature::ZERO_AS_MISSING.to_vec()
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            zero_as_missing: default_zero_as_missing(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_fraction: f64,
    pub validation_fraction: f64,
    pub test_fraction: f64,
    /// Seed for the stratified shuffle
    pub seed: u64,
    /// Max allowed |partition positive ratio - overall ratio|
    pub tolerance: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.70,
            validation_fraction: 0.15,
            test_fraction: 0.15,
            seed: 42,
            tolerance: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScalingConfig {
    #[serde(default)]
    pub zero_variance: ZeroVariancePolicy,
}

/// Class weighting applied to the training loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    #[default]
    None,
    /// `n / (2 * n_class)` per class
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    pub learning_rate: f64,
    pub max_iter: usize,
    /// L2 penalty strength (0 disables)
    pub l2: f64,
    /// Stop when the loss improves by less than this
    pub tolerance: f64,
    #[serde(default)]
    pub class_weight: ClassWeight,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 5000,
            l2: 0.0,
            tolerance: 1e-9,
            class_weight: ClassWeight::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    /// Epochs without validation-loss improvement before stopping
    pub patience: usize,
    /// Minimum validation-loss decrease that counts as improvement
    pub min_delta: f64,
    #[serde(default)]
    pub class_weight: ClassWeight,
    /// Seed for weight init and batch shuffling; falls back to `training.seed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![16, 8],
            learning_rate: 0.001,
            batch_size: 32,
            max_epochs: 500,
            patience: 20,
            min_delta: 1e-4,
            class_weight: ClassWeight::None,
            seed: None,
        }
    }
}

/// One entry in the candidate list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateConfig {
    Logistic {
        name: String,
        #[serde(flatten)]
        params: LogisticConfig,
    },
    Mlp {
        name: String,
        #[serde(flatten)]
        params: MlpConfig,
    },
}

impl CandidateConfig {
    pub fn name(&self) -> &str {
        match self {
            CandidateConfig::Logistic { name, .. } | CandidateConfig::Mlp { name, .. } => name,
        }
    }
}

fn default_candidates() -> Vec<CandidateConfig> {
    vec![
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
            params: MlpConfig::default(),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed shared by stochastic candidates
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Probability at or above which a prediction is positive
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    #[serde(default = "default_candidates")]
    pub candidates: Vec<CandidateConfig>,
}

fn default_seed() -> u64 {
    42
}

fn default_decision_threshold() -> f64 {
    0.5
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            decision_threshold: default_decision_threshold(),
            candidates: default_candidates(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub priority: Metric,
    pub tie_break: Metric,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            priority: Metric::Recall,
            tie_break: Metric::F1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    /// Replace artifacts from a previous run
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("DIABRISK_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (DIABRISK_SPLIT__SEED, etc.)
            .add_source(
                Environment::with_prefix("DIABRISK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let s = &self.split;
        let fractions = [s.train_fraction, s.validation_fraction, s.test_fraction];
        if fractions.iter().any(|f| *f <= 0.0 || *f >= 1.0) {
            errors.push("split fractions must be between 0 and 1".to_string());
        }
        if (fractions.iter().sum::<f64>() - 1.0).abs() > 1e-6 {
            errors.push(format!(
                "split fractions must sum to 1, got {}",
                fractions.iter().sum::<f64>()
            ));
        }
        if s.tolerance <= 0.0 || s.tolerance >= 1.0 {
            errors.push("split.tolerance must be between 0 and 1".to_string());
        }

        let mut seen = std::collections::BTreeSet::new();
        for feature in &self.cleaning.zero_as_missing {
            if !seen.insert(*feature) {
                errors.push(format!("cleaning.zero_as_missing lists {feature} twice"));
            }
        }

        let t = &self.training;
        if t.decision_threshold <= 0.0 || t.decision_threshold >= 1.0 {
            errors.push("training.decision_threshold must be between 0 and 1".to_string());
        }
        if t.candidates.is_empty() {
            errors.push("training.candidates must not be empty".to_string());
        }
        let mut names = std::collections::BTreeSet::new();
        for candidate in &t.candidates {
            let name = candidate.name();
            if name.is_empty() {
                errors.push("candidate name must not be empty".to_string());
            }
            if !names.insert(name.to_string()) {
                errors.push(format!("duplicate candidate name {name}"));
            }
            match candidate {
                CandidateConfig::Logistic { params, .. } => {
                    if params.learning_rate <= 0.0 || params.max_iter == 0 || params.l2 < 0.0 {
                        errors.push(format!(
                            "{name}: learning_rate and max_iter must be positive, l2 non-negative"
                        ));
                    }
                }
                CandidateConfig::Mlp { params, .. } => {
                    if params.hidden_layers.iter().any(|w| *w == 0) {
                        errors.push(format!("{name}: hidden layer widths must be positive"));
                    }
                    if params.learning_rate <= 0.0
                        || params.batch_size == 0
                        || params.max_epochs == 0
                    {
                        errors.push(format!(
                            "{name}: learning_rate, batch_size and max_epochs must be positive"
                        ));
                    }
                }
            }
        }

        if let Err(e) = self.risk.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
