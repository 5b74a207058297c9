//! diabrisk CLI
//!
//! Commands:
//! - `diabrisk train` - Run the training pipeline and persist artifacts
//! - `diabrisk predict` - Score one patient against persisted artifacts
//! - `diabrisk report` - Show the report of the persisted run
//! - `diabrisk config` - Configuration management

pub mod config;
pub mod output;
pub mod predict;
pub mod report;
pub mod train;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Diabetes risk screening pipeline
#[derive(Parser, Debug)]
#[command(name = "diabrisk")]
#[command(author, version, about = "Diabetes risk screening: train, select and score")]
pub struct Cli {
    /// Configuration directory (default.toml, then <DIABRISK_ENV>.toml)
    #[arg(short, long, global = true, env = "DIABRISK_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train every candidate, select one and save artifacts
    Train(train::TrainArgs),

    /// Estimate diabetes risk for one patient
    Predict(predict::PredictArgs),

    /// Show metrics of the saved run
    Report(report::ReportArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_train_overrides() {
        let cli = Cli::try_parse_from([
            "diabrisk", "train", "--data", "pima.csv", "--seed", "7", "--force", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Train(args) => {
                assert_eq!(args.data, Some(PathBuf::from("pima.csv")));
                assert_eq!(args.seed, Some(7));
                assert!(args.force);
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn predict_requires_every_measurement() {
        let missing_age = Cli::try_parse_from([
            "diabrisk",
            "predict",
            "--pregnancies",
            "2",
            "--glucose",
            "140",
            "--blood-pressure",
            "70",
            "--skin-thickness",
            "30",
            "--insulin",
            "100",
            "--bmi",
            "33.1",
            "--diabetes-pedigree-function",
            "0.5",
        ]);
        assert!(missing_age.is_err());
    }
}
