//! Integration tests for `logbatch config` and the config-to-buffer path used by `run`.
//!
//! Tests config validation and conversion with real TOML files.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use logbatch_buffer::{BufferConfig, FlushTrigger};
use logbatch_core::config::LogbatchConfig;

#[tokio::test]
#[serial_test::serial]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("logbatch.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "json"

[buffer]
strategy = "periodic"
flush_interval_secs = 0.5

[sink]
kind = "stderr"
"#;

    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let config = LogbatchConfig::load(&config_path)
        .await
        .expect("valid config should load successfully");

    // Then: The buffer section converts to a periodic trigger
    let buffer = BufferConfig::from_core(&config.buffer).expect("buffer section should convert");
    assert_eq!(
        buffer.trigger,
        FlushTrigger::Periodic {
            interval: Duration::from_millis(500)
        }
    );
    assert_eq!(config.sink.kind, "stderr");
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(&config_path, "[buffer\nstrategy = \"periodic\"\n").expect("should write config");

    let result = LogbatchConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_validate_missing_file() {
    let result = LogbatchConfig::load("/nonexistent/logbatch.toml").await;
    let err = result.expect_err("missing file should fail to load");
    assert!(err.to_string().contains("/nonexistent/logbatch.toml"));
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_validate_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").expect("should write empty file");

    let config = LogbatchConfig::load(&config_path)
        .await
        .expect("empty config should use defaults");

    let buffer = BufferConfig::from_core(&config.buffer).expect("defaults should convert");
    assert_eq!(buffer.trigger, FlushTrigger::size_or_timeout());
    assert!(!buffer.timestamp);
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_rejects_invalid_buffer_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("invalid.toml");

    for (body, field) in [
        ("[buffer]\nstrategy = \"sometimes\"\n", "buffer.strategy"),
        ("[buffer]\nflush_interval_secs = 0.0\n", "buffer.flush_interval_secs"),
        ("[buffer]\nflush_interval_secs = 7200.0\n", "buffer.flush_interval_secs"),
        ("[buffer]\nmax_size_bytes = 0\n", "buffer.max_size_bytes"),
        ("[sink]\nkind = \"file\"\n", "sink.path"),
    ] {
        fs::write(&config_path, body).expect("should write config");
        let err = LogbatchConfig::load(&config_path)
            .await
            .expect_err("invalid config should fail");
        assert!(
            err.to_string().contains(field),
            "error for {body:?} should mention {field}: {err}"
        );
    }
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_invalid_timestamp_format_caught_by_buffer_config() {
    // 형식 문자열 검증은 버퍼 설정 변환 단계에서 수행됨
    let config = LogbatchConfig::parse(
        r#"
[buffer]
timestamp = true
timestamp_format = "%Q"
"#,
    )
    .expect("should parse");
    config.validate().expect("core validation does not parse strftime");

    let err = BufferConfig::from_core(&config.buffer).expect_err("invalid strftime should fail");
    assert!(err.to_string().contains("timestamp_format"));
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_env_override_applies_to_buffer() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("logbatch.toml");
    fs::write(&config_path, "[buffer]\nstrategy = \"periodic\"\n").expect("should write config");

    // SAFETY: serial 테스트에서만 환경변수를 변경
    unsafe {
        std::env::set_var("LOGBATCH_BUFFER_STRATEGY", "size_or_timeout");
        std::env::set_var("LOGBATCH_BUFFER_MAX_SIZE_BYTES", "2048");
    }

    let result = LogbatchConfig::load(&config_path).await;

    unsafe {
        std::env::remove_var("LOGBATCH_BUFFER_STRATEGY");
        std::env::remove_var("LOGBATCH_BUFFER_MAX_SIZE_BYTES");
    }

    let config = result.expect("config should load");
    let buffer = BufferConfig::from_core(&config.buffer).expect("should convert");
    assert_eq!(buffer.trigger.max_size_bytes(), Some(2048));
    assert_eq!(buffer.trigger.interval(), Duration::from_millis(200));
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_show_roundtrips_through_toml() {
    let config = LogbatchConfig::default();
    let rendered = toml::to_string_pretty(&config).expect("default config should serialize");
    let reparsed = LogbatchConfig::parse(&rendered).expect("rendered config should parse");
    assert_eq!(reparsed.buffer.strategy, config.buffer.strategy);
    assert_eq!(reparsed.sink.kind, config.sink.kind);
    assert_eq!(reparsed.metrics.port, config.metrics.port);
}
