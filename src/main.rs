use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use vkregistry::cli::{Cli, VerbosityLevel};
use vkregistry::config::ConfigManager;
use vkregistry::{Analyzer, Output};

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let config = ConfigManager::load_config(&cli).context("failed to load configuration")?;
    init_tracing(config.verbosity());

    let report = Analyzer::from_config(&config)
        .run()
        .with_context(|| format!("failed to analyze {}", config.input.registry.display()))?;

    let output = Output::new(config.output.format.into(), config.verbosity());
    let rendered = output
        .format_report(&report)
        .context("failed to serialize the model")?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }

    Ok(())
}
