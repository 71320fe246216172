//! 버퍼 에러 타입
//!
//! [`BufferError`]는 버퍼 코어, 플러시 드라이버, 포매터 파이프라인에서 발생하는
//! 모든 에러를 표현합니다. `From<BufferError> for LogbatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 운영자가 "더 이상 받지 않음"([`BufferError::Closed`])과
//! "하위 출력이 고장남"([`BufferError::Sink`])을 구분할 수 있도록 별도 variant로 둡니다.

use logbatch_core::error::{BufferFault, LogbatchError, SinkError};

/// 버퍼 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// 닫힌 버퍼에 쓰기 시도 (호출자가 생산을 멈추거나 다른 곳으로 돌려야 함)
    #[error("trying to write to a closed buffer")]
    Closed,

    /// 플러시되지 않은 메시지를 가진 채 버퍼가 폐기됨 (생명주기 버그)
    #[error("buffer disposed with {pending} message(s) not yet flushed")]
    UnflushedOnDispose {
        /// 남아 있던 메시지 수
        pending: usize,
    },

    /// 싱크 호출 실패 (버퍼는 재시도하지 않고 전파만 함)
    #[error("sink invocation failed: {0}")]
    Sink(#[from] SinkError),

    /// 바이트 입력이 UTF-8이 아님
    #[error("message is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 플러시 드라이버 태스크 실패 (panic 또는 취소)
    #[error("flush driver failed: {0}")]
    Driver(String),
}

impl BufferError {
    /// 닫힌 버퍼 쓰기 거부인지 확인합니다.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// 싱크 실패인지 확인합니다.
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, Self::Sink(_))
    }
}

impl From<BufferError> for LogbatchError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Closed => LogbatchError::Buffer(BufferFault::Closed),
            BufferError::UnflushedOnDispose { pending } => {
                LogbatchError::Buffer(BufferFault::Unflushed { pending })
            }
            BufferError::Sink(e) => LogbatchError::Sink(e),
            other => LogbatchError::Buffer(BufferFault::Other(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_and_sink_are_distinguishable() {
        let closed = BufferError::Closed;
        let sink = BufferError::Sink(SinkError::Failed("disk full".to_owned()));

        assert!(closed.is_closed());
        assert!(!closed.is_sink_failure());
        assert!(sink.is_sink_failure());
        assert!(!sink.is_closed());
    }

    #[test]
    fn unflushed_display_contains_count() {
        let err = BufferError::UnflushedOnDispose { pending: 1 };
        assert_eq!(
            err.to_string(),
            "buffer disposed with 1 message(s) not yet flushed"
        );
    }

    #[test]
    fn converts_to_logbatch_error() {
        let err: LogbatchError = BufferError::Closed.into();
        assert!(matches!(err, LogbatchError::Buffer(BufferFault::Closed)));

        let err: LogbatchError = BufferError::Sink(SinkError::Closed("rx".to_owned())).into();
        assert!(matches!(err, LogbatchError::Sink(_)));

        let err: LogbatchError = BufferError::Driver("panicked".to_owned()).into();
        assert!(matches!(err, LogbatchError::Buffer(BufferFault::Other(_))));
    }
}
