//! 버퍼 설정
//!
//! [`BufferConfig`]는 core의 [`BufferSection`](logbatch_core::config::BufferSection)을
//! 기반으로 버퍼 생성 시 고정되는 설정을 제공합니다.
//! 플러시 전략은 [`FlushTrigger`] 값 하나로 선택합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logbatch_core::config::LogbatchConfig;
//! use logbatch_buffer::config::BufferConfig;
//!
//! let core_config = LogbatchConfig::default();
//! let config = BufferConfig::from_core(&core_config.buffer)?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use logbatch_core::config::{
    BufferSection, DEFAULT_MAX_SIZE_BYTES, DEFAULT_PERIODIC_INTERVAL_SECS,
    DEFAULT_SIZE_OR_TIMEOUT_INTERVAL_SECS, DEFAULT_TIMESTAMP_FORMAT, MAX_FLUSH_INTERVAL_SECS,
};

use crate::error::BufferError;
use crate::format::validate_time_format;

/// 플러시 트리거 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FlushTrigger {
    /// 고정 간격마다 무조건 플러시
    Periodic {
        /// 플러시 간격
        interval: Duration,
    },
    /// 크기 임계값 초과 신호와 타임아웃 중 먼저 오는 쪽에서 플러시
    SizeOrTimeout {
        /// 최대 대기 시간
        interval: Duration,
        /// 이 값을 초과하면 크기 초과 신호가 켜짐 (UTF-8 바이트)
        max_size_bytes: usize,
    },
}

impl FlushTrigger {
    /// 기본 간격(0.1초)의 시간 기반 트리거를 생성합니다.
    pub fn periodic() -> Self {
        Self::Periodic {
            interval: Duration::from_secs_f64(DEFAULT_PERIODIC_INTERVAL_SECS),
        }
    }

    /// 기본 간격(0.2초)과 기본 임계값(120바이트)의 크기/시간 트리거를 생성합니다.
    pub fn size_or_timeout() -> Self {
        Self::SizeOrTimeout {
            interval: Duration::from_secs_f64(DEFAULT_SIZE_OR_TIMEOUT_INTERVAL_SECS),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }

    /// 플러시 간격을 반환합니다.
    pub fn interval(&self) -> Duration {
        match *self {
            Self::Periodic { interval } | Self::SizeOrTimeout { interval, .. } => interval,
        }
    }

    /// 크기 임계값을 반환합니다. 시간 기반 트리거는 `None`.
    pub fn max_size_bytes(&self) -> Option<usize> {
        match *self {
            Self::Periodic { .. } => None,
            Self::SizeOrTimeout { max_size_bytes, .. } => Some(max_size_bytes),
        }
    }

    /// 전략 이름 (로그/설정 표시용)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Periodic { .. } => "periodic",
            Self::SizeOrTimeout { .. } => "size_or_timeout",
        }
    }
}

impl Default for FlushTrigger {
    fn default() -> Self {
        Self::size_or_timeout()
    }
}

/// 버퍼 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// 플러시 전략
    pub trigger: FlushTrigger,
    /// 타임스탬프 포매터 사용 여부
    pub timestamp: bool,
    /// 타임스탬프 형식 (chrono strftime)
    pub timestamp_format: String,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            trigger: FlushTrigger::default(),
            timestamp: false,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
        }
    }
}

impl BufferConfig {
    /// 주어진 트리거로 설정을 생성합니다 (나머지는 기본값).
    pub fn with_trigger(trigger: FlushTrigger) -> Self {
        Self {
            trigger,
            ..Self::default()
        }
    }

    /// core의 `BufferSection`에서 버퍼 설정을 생성합니다.
    pub fn from_core(section: &BufferSection) -> Result<Self, BufferError> {
        section.validate().map_err(|e| BufferError::Config {
            field: "buffer".to_owned(),
            reason: e.to_string(),
        })?;

        let interval = Duration::from_secs_f64(section.effective_interval_secs());
        let trigger = match section.strategy.as_str() {
            "periodic" => FlushTrigger::Periodic { interval },
            _ => FlushTrigger::SizeOrTimeout {
                interval,
                max_size_bytes: section.max_size_bytes,
            },
        };

        let config = Self {
            trigger,
            timestamp: section.timestamp,
            timestamp_format: section.timestamp_format.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), BufferError> {
        let interval = self.trigger.interval();
        if interval.is_zero() || interval.as_secs_f64() > MAX_FLUSH_INTERVAL_SECS {
            return Err(BufferError::Config {
                field: "interval".to_owned(),
                reason: format!("must be greater than 0 and at most {MAX_FLUSH_INTERVAL_SECS}s"),
            });
        }

        if self.trigger.max_size_bytes() == Some(0) {
            return Err(BufferError::Config {
                field: "max_size_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.timestamp {
            if self.timestamp_format.is_empty() {
                return Err(BufferError::Config {
                    field: "timestamp_format".to_owned(),
                    reason: "must not be empty when timestamp is enabled".to_owned(),
                });
            }
            validate_time_format(&self.timestamp_format)?;
        }

        Ok(())
    }
}

/// 버퍼 설정 빌더
#[derive(Default)]
pub struct BufferConfigBuilder {
    config: BufferConfig,
}

impl BufferConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 플러시 트리거를 설정합니다.
    pub fn trigger(mut self, trigger: FlushTrigger) -> Self {
        self.config.trigger = trigger;
        self
    }

    /// 시간 기반 전략으로 설정합니다.
    pub fn periodic(mut self, interval: Duration) -> Self {
        self.config.trigger = FlushTrigger::Periodic { interval };
        self
    }

    /// 크기/시간 전략으로 설정합니다.
    pub fn size_or_timeout(mut self, interval: Duration, max_size_bytes: usize) -> Self {
        self.config.trigger = FlushTrigger::SizeOrTimeout {
            interval,
            max_size_bytes,
        };
        self
    }

    /// 타임스탬프 포매터를 켭니다.
    pub fn timestamp(mut self, format: impl Into<String>) -> Self {
        self.config.timestamp = true;
        self.config.timestamp_format = format.into();
        self
    }

    /// 설정을 검증하고 `BufferConfig`를 생성합니다.
    pub fn build(self) -> Result<BufferConfig, BufferError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
