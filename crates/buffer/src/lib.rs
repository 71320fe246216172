#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`buffer`]: 배치 버퍼 코어 (append / flush / close)
//! - [`driver`]: 전략별 플러시 드라이버
//! - [`scope`]: 드라이버 수명과 닫기를 묶는 스코프 실행
//! - [`format`]: 포매터 파이프라인
//! - [`sink`]: 내장 싱크
//! - [`config`]: 버퍼 설정 (core 설정 변환)
//! - [`error`]: 도메인 에러 타입

pub mod buffer;
pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod scope;
pub mod sink;

// --- 주요 타입 re-export ---

// 버퍼
pub use buffer::{BatchBuffer, BufferStats, FlushOutcome};

// 드라이버
pub use driver::{
    DriverHandle, DriverReport, DriverState, FlushCause, FlushDriver, SIZE_EXCEEDED_MARKER,
    TIME_EXCEEDED_MARKER,
};

// 스코프
pub use scope::{ScopeOutcome, scoped};

// 설정
pub use config::{BufferConfig, BufferConfigBuilder, FlushTrigger};

// 에러
pub use error::BufferError;

// 포매터
pub use format::{FnFormatter, IdentityFormatter, RawMessage, TimestampFormatter, format_message};

// 싱크
pub use sink::{ChannelSink, FnSink, WriterSink};
