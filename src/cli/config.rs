//! Configuration management commands
//!
//! diabrisk config show     - Print the effective configuration as TOML
//! diabrisk config validate - Validate the effective configuration

use anyhow::Result;
use clap::Subcommand;

use super::output;
use crate::config::AppConfig;

/// Configuration-related commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (files + environment)
    Show,

    /// Validate the effective configuration
    Validate,
}

impl ConfigCommands {
    pub fn run(self, cfg: &AppConfig) -> Result<()> {
        match self {
            Self::Show => {
                println!("{}", cfg.to_toml()?);
                Ok(())
            }
            Self::Validate => match cfg.validate() {
                Ok(()) => {
                    output::print_success("Configuration is valid");
                    Ok(())
                }
                Err(errors) => {
                    for e in &errors {
                        output::print_error(&format!("  - {e}"));
                    }
                    anyhow::bail!("{} configuration problem(s)", errors.len())
                }
            },
        }
    }
}
