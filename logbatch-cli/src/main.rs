//! logbatch -- batch stdin lines through the message buffer into a sink.

mod cli;
mod commands;
mod error;
mod logging;
mod metrics_server;
mod output;

use std::path::{Path, PathBuf};

use clap::Parser;

use logbatch_core::config::LogbatchConfig;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG_PATH};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            e.exit_code()
        }
    };

    // stdin 읽기 스레드가 남아 있어도 즉시 종료
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Run(args) => {
            let config = load_run_config(cli.config.as_deref()).await?;
            init_logging(&config, cli.log_level.as_deref())?;

            if config.metrics.enabled {
                metrics_server::install_metrics_recorder(&config.metrics)
                    .map_err(|e| CliError::Command(e.to_string()))?;
            }

            commands::run::execute(args, config, &writer).await
        }
        Commands::Config(args) => {
            init_logging(&LogbatchConfig::default(), cli.log_level.as_deref().or(Some("warn")))?;
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            commands::config::execute(args, &path, &writer).await
        }
    }
}

/// Load the configuration for `run`.
///
/// An explicit `--config` must exist. Without it, `logbatch.toml` is used when
/// present, otherwise defaults with env overrides.
async fn load_run_config(path: Option<&Path>) -> Result<LogbatchConfig, CliError> {
    if let Some(path) = path {
        return Ok(LogbatchConfig::load(path).await?);
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return Ok(LogbatchConfig::load(default_path).await?);
    }

    let mut config = LogbatchConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &LogbatchConfig, level_override: Option<&str>) -> Result<(), CliError> {
    logging::init_tracing(&config.general, level_override)
        .map_err(|e| CliError::Config(e.to_string()))
}
