//! Diagnostics output for `logbatch`.
//!
//! Batches may be written to stdout, so every diagnostic line goes to
//! stderr. The level filter is taken from `RUST_LOG` first, then
//! `--log-level`, then `[general] log_level`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logbatch_core::config::GeneralConfig;

/// Diagnostic line layout selected by `[general] log_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// One JSON object per event, for log shippers.
    Json,
    /// Multi-line human-readable events.
    Pretty,
}

impl LogFormat {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }
}

fn level_filter(config: &GeneralConfig, level_override: Option<&str>) -> EnvFilter {
    let level = level_override.unwrap_or(&config.log_level);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the process-wide subscriber that writes diagnostics to stderr.
///
/// Fails on an unknown `log_format` or when a subscriber is already set.
pub fn init_tracing(config: &GeneralConfig, level_override: Option<&str>) -> Result<()> {
    let format = LogFormat::parse(&config.log_format)?;
    let registry = tracing_subscriber::registry().with(level_filter(config, level_override));

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| {
        anyhow::anyhow!(
            "failed to install {} log subscriber: {}",
            format.as_str(),
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn unknown_format_fails_before_install() {
        let config = GeneralConfig {
            log_format: "xml".to_owned(),
            ..Default::default()
        };
        let err = init_tracing(&config, None).unwrap_err();
        assert!(err.to_string().contains("'xml'"));
    }
}
