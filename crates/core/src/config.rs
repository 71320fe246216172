//! 설정 관리 -- logbatch.toml 파싱 및 런타임 설정
//!
//! [`LogbatchConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGBATCH_BUFFER_MAX_SIZE_BYTES=4096` 형식)
//! 3. 설정 파일 (`logbatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logbatch_core::error::LogbatchError> {
//! use logbatch_core::config::LogbatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogbatchConfig::load("logbatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogbatchConfig::parse("[buffer]\nstrategy = \"periodic\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogbatchError};

/// 시간 기반 전략의 기본 플러시 간격 (초)
pub const DEFAULT_PERIODIC_INTERVAL_SECS: f64 = 0.1;

/// 시간-또는-크기 전략의 기본 플러시 간격 (초)
pub const DEFAULT_SIZE_OR_TIMEOUT_INTERVAL_SECS: f64 = 0.2;

/// 크기 임계값 기본값 (바이트)
pub const DEFAULT_MAX_SIZE_BYTES: usize = 120;

/// 기본 타임스탬프 형식 (chrono strftime)
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 플러시 간격 상한 (초)
pub const MAX_FLUSH_INTERVAL_SECS: f64 = 3600.0;

/// logbatch 통합 설정
///
/// `logbatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogbatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 버퍼/플러시 설정
    #[serde(default)]
    pub buffer: BufferSection,
    /// 싱크 설정
    #[serde(default)]
    pub sink: SinkSection,
    /// 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogbatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogbatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogbatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogbatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogbatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogbatchError> {
        toml::from_str(toml_str).map_err(|e| {
            LogbatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGBATCH_{SECTION}_{FIELD}`
    /// 예: `LOGBATCH_BUFFER_STRATEGY=periodic`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGBATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGBATCH_GENERAL_LOG_FORMAT");

        // Buffer
        override_string(&mut self.buffer.strategy, "LOGBATCH_BUFFER_STRATEGY");
        override_opt_f64(
            &mut self.buffer.flush_interval_secs,
            "LOGBATCH_BUFFER_FLUSH_INTERVAL_SECS",
        );
        override_usize(
            &mut self.buffer.max_size_bytes,
            "LOGBATCH_BUFFER_MAX_SIZE_BYTES",
        );
        override_bool(&mut self.buffer.timestamp, "LOGBATCH_BUFFER_TIMESTAMP");
        override_string(
            &mut self.buffer.timestamp_format,
            "LOGBATCH_BUFFER_TIMESTAMP_FORMAT",
        );

        // Sink
        override_string(&mut self.sink.kind, "LOGBATCH_SINK_KIND");
        override_string(&mut self.sink.path, "LOGBATCH_SINK_PATH");
        override_bool(&mut self.sink.append, "LOGBATCH_SINK_APPEND");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGBATCH_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGBATCH_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGBATCH_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogbatchError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.buffer.validate()?;

        // sink 검증
        let valid_kinds = ["stdout", "stderr", "file"];
        if !valid_kinds.contains(&self.sink.kind.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "sink.kind".to_owned(),
                reason: format!("must be one of: {}", valid_kinds.join(", ")),
            }
            .into());
        }
        if self.sink.kind == "file" && self.sink.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sink.path".to_owned(),
                reason: "path must not be empty when sink kind is 'file'".to_owned(),
            }
            .into());
        }

        if self.metrics.enabled && self.metrics.endpoint != "/metrics" {
            return Err(ConfigError::InvalidValue {
                field: "metrics.endpoint".to_owned(),
                reason: "only '/metrics' is supported".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 버퍼/플러시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSection {
    /// 플러시 전략 (periodic, size_or_timeout)
    pub strategy: String,
    /// 플러시 간격 (초). 미지정 시 전략별 기본값 사용
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_interval_secs: Option<f64>,
    /// 크기 임계값 (바이트, size_or_timeout 전략 전용)
    pub max_size_bytes: usize,
    /// 타임스탬프 포매터 사용 여부
    pub timestamp: bool,
    /// 타임스탬프 형식 (chrono strftime)
    pub timestamp_format: String,
}

impl Default for BufferSection {
    fn default() -> Self {
        Self {
            strategy: "size_or_timeout".to_owned(),
            flush_interval_secs: None,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            timestamp: false,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
        }
    }
}

impl BufferSection {
    /// 전략별 기본값을 반영한 실제 플러시 간격(초)을 반환합니다.
    pub fn effective_interval_secs(&self) -> f64 {
        self.flush_interval_secs
            .unwrap_or(match self.strategy.as_str() {
                "periodic" => DEFAULT_PERIODIC_INTERVAL_SECS,
                _ => DEFAULT_SIZE_OR_TIMEOUT_INTERVAL_SECS,
            })
    }

    /// 버퍼 섹션의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_strategies = ["periodic", "size_or_timeout"];
        if !valid_strategies.contains(&self.strategy.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "buffer.strategy".to_owned(),
                reason: format!("must be one of: {}", valid_strategies.join(", ")),
            });
        }

        let interval = self.effective_interval_secs();
        if !interval.is_finite() || interval <= 0.0 || interval > MAX_FLUSH_INTERVAL_SECS {
            return Err(ConfigError::InvalidValue {
                field: "buffer.flush_interval_secs".to_owned(),
                reason: format!("must be greater than 0 and at most {MAX_FLUSH_INTERVAL_SECS}"),
            });
        }

        if self.max_size_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "buffer.max_size_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.timestamp && self.timestamp_format.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "buffer.timestamp_format".to_owned(),
                reason: "must not be empty when timestamp is enabled".to_owned(),
            });
        }

        Ok(())
    }
}

/// 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    /// 싱크 종류 (stdout, stderr, file)
    pub kind: String,
    /// 파일 경로 (kind = "file"일 때 필수)
    pub path: String,
    /// 기존 파일에 이어 쓰기 여부
    pub append: bool,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            kind: "stdout".to_owned(),
            path: String::new(),
            append: true,
        }
    }
}

/// 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_opt_f64(target: &mut Option<f64>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = Some(parsed),
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = LogbatchConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.buffer.strategy, "size_or_timeout");
        assert_eq!(config.buffer.max_size_bytes, 120);
        assert_eq!(config.sink.kind, "stdout");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        LogbatchConfig::default().validate().unwrap();
    }

    #[test]
    fn interval_default_depends_on_strategy() {
        let mut section = BufferSection::default();
        assert_eq!(section.effective_interval_secs(), 0.2);

        section.strategy = "periodic".to_owned();
        assert_eq!(section.effective_interval_secs(), 0.1);

        section.flush_interval_secs = Some(1.5);
        assert_eq!(section.effective_interval_secs(), 1.5);
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = LogbatchConfig::parse("").unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert!(config.buffer.flush_interval_secs.is_none());
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[buffer]
strategy = "periodic"
flush_interval_secs = 0.5
"#;
        let config = LogbatchConfig::parse(toml).unwrap();
        assert_eq!(config.buffer.strategy, "periodic");
        assert_eq!(config.buffer.flush_interval_secs, Some(0.5));
        // max_size_bytes는 기본값 유지
        assert_eq!(config.buffer.max_size_bytes, 120);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = LogbatchConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            LogbatchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_strategy() {
        let mut config = LogbatchConfig::default();
        config.buffer.strategy = "adaptive".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("strategy"));
    }

    #[test]
    fn validate_rejects_non_positive_interval() {
        let mut config = LogbatchConfig::default();
        config.buffer.flush_interval_secs = Some(0.0);
        assert!(config.validate().is_err());

        config.buffer.flush_interval_secs = Some(f64::NAN);
        assert!(config.validate().is_err());

        config.buffer.flush_interval_secs = Some(7200.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_size() {
        let mut config = LogbatchConfig::default();
        config.buffer.max_size_bytes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_size_bytes"));
    }

    #[test]
    fn validate_rejects_file_sink_without_path() {
        let mut config = LogbatchConfig::default();
        config.sink.kind = "file".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sink.path"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = LogbatchConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트 고유 키만 조작하므로 다른 테스트와 충돌하지 않습니다.
        unsafe { std::env::set_var("TEST_LOGBATCH_STR", "overridden") };
        override_string(&mut val, "TEST_LOGBATCH_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_LOGBATCH_STR") };
    }

    #[test]
    fn env_override_f64_invalid_keeps_original() {
        let mut val = Some(0.3);
        // SAFETY: 테스트 고유 키만 조작하므로 다른 테스트와 충돌하지 않습니다.
        unsafe { std::env::set_var("TEST_LOGBATCH_F64_BAD", "fast") };
        override_opt_f64(&mut val, "TEST_LOGBATCH_F64_BAD");
        assert_eq!(val, Some(0.3)); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_LOGBATCH_F64_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 42usize;
        override_usize(&mut val, "TEST_LOGBATCH_NONEXISTENT_12345");
        assert_eq!(val, 42);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = LogbatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LogbatchConfig::parse(&toml_str).unwrap();
        assert_eq!(config.buffer.strategy, parsed.buffer.strategy);
        assert_eq!(config.metrics.port, parsed.metrics.port);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = LogbatchConfig::from_file("/nonexistent/path/logbatch.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LogbatchError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
