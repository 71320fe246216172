//! `logbatch config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logbatch_buffer::BufferConfig;
use logbatch_core::config::LogbatchConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show`.
const SECTIONS: [&str; 4] = ["general", "buffer", "sink", "metrics"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load, validate and check that the `[buffer]` section yields a usable buffer config.
///
/// Returns `CliError::Config` if validation fails.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let errors = match LogbatchConfig::load(config_path).await {
        Ok(config) => match BufferConfig::from_core(&config.buffer) {
            Ok(_) => Vec::new(),
            Err(e) => vec![e.to_string()],
        },
        Err(e) => vec![e.to_string()],
    };

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
///
/// Returns `CliError::Command` if the section name is unknown.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = LogbatchConfig::load(config_path).await?;
    let report = build_report(&config, config_path, section)?;
    writer.render(&report)?;

    Ok(())
}

/// Serialize the whole config or a single section.
fn build_report(
    config: &LogbatchConfig,
    config_path: &Path,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let rendered = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("buffer") => toml::to_string_pretty(&config.buffer),
        Some("sink") => toml::to_string_pretty(&config.sink),
        Some("metrics") => toml::to_string_pretty(&config.metrics),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config_toml: rendered.unwrap_or_else(|e| format!("(serialization error: {})", e)),
    })
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match &self.section {
            Some(section) => {
                writeln!(w, "Configuration [{}] (source: {})", section, self.source)?
            }
            None => writeln!(w, "Configuration (source: {})", self.source)?,
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Config Validation: {}", self.source)?;

        if self.valid {
            writeln!(w, "  Result: VALID")?;
        } else {
            writeln!(w, "  Result: INVALID")?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(report: &impl Render) -> String {
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_build_report_full_config() {
        let config = LogbatchConfig::default();
        let report = build_report(&config, Path::new("logbatch.toml"), None).unwrap();
        assert!(report.section.is_none());
        assert!(report.config_toml.contains("[buffer]"));
        assert!(report.config_toml.contains("[sink]"));
    }

    #[test]
    fn test_build_report_single_section() {
        let config = LogbatchConfig::default();
        let report =
            build_report(&config, Path::new("logbatch.toml"), Some("buffer".to_owned())).unwrap();
        assert_eq!(report.section.as_deref(), Some("buffer"));
        assert!(report.config_toml.contains("strategy"));
        assert!(!report.config_toml.contains("log_level"));
    }

    #[test]
    fn test_build_report_unknown_section() {
        let config = LogbatchConfig::default();
        let err = build_report(&config, Path::new("logbatch.toml"), Some("ebpf".to_owned()))
            .err()
            .expect("unknown section should fail");
        assert!(matches!(err, CliError::Command(_)));
        assert!(err.to_string().contains("general, buffer, sink, metrics"));
    }

    #[test]
    fn test_config_report_render_text_section() {
        let report = ConfigReport {
            source: "/etc/logbatch.toml".to_owned(),
            section: Some("sink".to_owned()),
            config_toml: "kind = \"stdout\"".to_owned(),
        };
        let output = render(&report);
        assert!(output.contains("[sink]"));
        assert!(output.contains("kind"));
    }

    #[test]
    fn test_config_report_json_skips_toml() {
        let report = ConfigReport {
            source: "test.toml".to_owned(),
            section: Some("buffer".to_owned()),
            config_toml: "strategy = \"periodic\"".to_owned(),
        };
        let json = serde_json::to_string(&report).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");
        assert_eq!(parsed["section"].as_str(), Some("buffer"));
        assert!(parsed.get("config_toml").is_none());
    }

    #[test]
    fn test_validation_report_valid() {
        let report = ConfigValidationReport {
            source: "logbatch.toml".to_owned(),
            valid: true,
            errors: Vec::new(),
        };
        let output = render(&report);
        assert!(output.contains("VALID"));
        assert!(!output.contains("Error:"));
    }

    #[test]
    fn test_validation_report_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec![
                "buffer.max_size_bytes: must be at least 1".to_owned(),
                "sink.kind: unknown".to_owned(),
            ],
        };
        let output = render(&report);
        assert!(output.contains("INVALID"));
        assert!(output.contains("max_size_bytes"));
        assert!(output.contains("sink.kind"));
    }

    #[tokio::test]
    async fn test_validate_missing_file_is_config_error() {
        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        let err = execute_validate(Path::new("/nonexistent/logbatch.toml"), &writer)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
