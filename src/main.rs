use anyhow::{Context, Result};
use clap::Parser;
use diabrisk::cli::{output, Cli, Commands};
use diabrisk::config::{AppConfig, LoggingConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        output::print_error(&format!("Error: {e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load_from(&cli.config_dir).with_context(|| {
        format!("loading configuration from {}", cli.config_dir.display())
    })?;
    init_logging(&cfg.logging);
    debug!(config_dir = %cli.config_dir.display(), "configuration loaded");

    // `config validate` reports problems itself
    if !matches!(cli.command, Commands::Config(_)) {
        if let Err(errors) = cfg.validate() {
            for e in &errors {
                output::print_error(&format!("  - {e}"));
            }
            anyhow::bail!("invalid configuration ({} problem(s))", errors.len());
        }
    }

    match cli.command {
        Commands::Train(args) => args.run(cfg),
        Commands::Predict(args) => args.run(cfg),
        Commands::Report(args) => args.run(cfg),
        Commands::Config(cmd) => cmd.run(&cfg),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&logging.level)));

    // Logs go to stderr so `--json` output on stdout stays machine-readable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn default_filter(level: &str) -> String {
    match level {
        "info" => "info,diabrisk=debug".to_string(),
        other => other.to_string(),
    }
}
