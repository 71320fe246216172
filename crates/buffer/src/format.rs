//! 포매터 파이프라인 -- 원시 입력을 포매팅된 메시지로 변환
//!
//! [`format_message`]는 텍스트 또는 원시 바이트([`RawMessage`])를 받아
//! UTF-8로 디코딩하고, 개행 기준으로 나눈 각 줄에 [`LineFormatter`]를 적용한 뒤
//! 다시 개행으로 이어 붙입니다. 포매터는 메시지가 들어오는 시점에 적용되므로
//! 타임스탬프 포매터는 플러시 시각이 아니라 이벤트 발생 시각을 기록합니다.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use logbatch_core::pipeline::LineFormatter;

use crate::error::BufferError;

/// 포매팅 전 원시 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawMessage {
    /// 이미 디코딩된 텍스트
    Text(String),
    /// UTF-8로 디코딩해야 하는 바이트
    Bytes(Bytes),
}

impl RawMessage {
    /// 텍스트로 디코딩합니다.
    pub fn into_text(self) -> Result<String, BufferError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Bytes(bytes) => Ok(std::str::from_utf8(&bytes)?.to_owned()),
        }
    }
}

impl From<String> for RawMessage {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RawMessage {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Bytes> for RawMessage {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for RawMessage {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

/// 메시지를 줄 단위로 포매팅합니다.
///
/// 바이트 입력은 UTF-8로 디코딩하며, 실패 시 [`BufferError::InvalidUtf8`]를 반환합니다.
pub fn format_message(
    raw: impl Into<RawMessage>,
    formatter: &dyn LineFormatter,
) -> Result<String, BufferError> {
    let text = raw.into().into_text()?;
    let lines: Vec<String> = text.split('\n').map(|line| formatter.format_line(line)).collect();
    Ok(lines.join("\n"))
}

/// 변환하지 않는 포매터 (기본값)
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFormatter;

impl LineFormatter for IdentityFormatter {
    fn format_line(&self, line: &str) -> String {
        line.to_owned()
    }
}

/// 클로저를 [`LineFormatter`]로 감싸는 어댑터
pub struct FnFormatter<F> {
    f: F,
}

impl<F> FnFormatter<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    /// 새 클로저 포매터를 생성합니다.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> LineFormatter for FnFormatter<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn format_line(&self, line: &str) -> String {
        (self.f)(line)
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// 각 줄 앞에 `[<시각>]: `를 붙이는 포매터
///
/// 시각 형식은 chrono strftime 문법을 따르며 기본값은 `%Y-%m-%d %H:%M:%S`입니다.
#[derive(Clone)]
pub struct TimestampFormatter {
    format: String,
    clock: Clock,
}

impl TimestampFormatter {
    /// 로컬 시계를 사용하는 타임스탬프 포매터를 생성합니다.
    ///
    /// 형식 문자열에 알 수 없는 지정자가 있으면 에러를 반환합니다.
    pub fn new(format: impl Into<String>) -> Result<Self, BufferError> {
        let format = format.into();
        validate_time_format(&format)?;
        Ok(Self {
            format,
            clock: Arc::new(Local::now),
        })
    }

    /// 시계 함수를 교체합니다.
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self {
            format: logbatch_core::config::DEFAULT_TIMESTAMP_FORMAT.to_owned(),
            clock: Arc::new(Local::now),
        }
    }
}

/// strftime 형식 문자열을 검증합니다.
pub fn validate_time_format(format: &str) -> Result<(), BufferError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(BufferError::Config {
            field: "timestamp_format".to_owned(),
            reason: format!("invalid strftime format '{format}'"),
        });
    }
    Ok(())
}

impl fmt::Debug for TimestampFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampFormatter")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl LineFormatter for TimestampFormatter {
    fn format_line(&self, line: &str) -> String {
        format!("[{}]: {}", (self.clock)().format(&self.format), line)
    }
}
