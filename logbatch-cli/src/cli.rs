//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file, used only when it exists and `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "logbatch.toml";

/// logbatch -- batch log lines and flush them to a sink.
///
/// Use `logbatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logbatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logbatch.toml configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read lines from stdin and flush them in batches.
    Run(RunArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Flush strategy selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Flush at a fixed interval.
    Periodic,
    /// Flush when the size threshold is exceeded or the interval elapses.
    SizeOrTimeout,
}

impl StrategyArg {
    /// Name used in the `[buffer]` configuration section.
    pub fn as_config_str(&self) -> &'static str {
        match self {
            Self::Periodic => "periodic",
            Self::SizeOrTimeout => "size_or_timeout",
        }
    }
}

/// Batch stdin lines until EOF or Ctrl-C.
///
/// Flags override the `[buffer]` and `[sink]` sections of the configuration.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Flush strategy.
    #[arg(long)]
    pub strategy: Option<StrategyArg>,

    /// Flush interval in seconds.
    #[arg(long)]
    pub interval: Option<f64>,

    /// Size threshold in bytes (size-or-timeout only).
    #[arg(long)]
    pub max_size: Option<usize>,

    /// Prefix each line with the time it was read.
    #[arg(long)]
    pub timestamp: bool,

    /// strftime format for `--timestamp`.
    #[arg(long, requires = "timestamp")]
    pub timestamp_format: Option<String>,

    /// Write batches to this file instead of the configured sink.
    #[arg(long)]
    pub sink_file: Option<PathBuf>,
}

// ---- config ----

/// Manage logbatch configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, buffer, sink, metrics).
        section: Option<String>,
    },
}
