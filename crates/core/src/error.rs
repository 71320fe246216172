//! 에러 타입 -- 도메인별 에러 정의

/// logbatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogbatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 싱크 호출 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// 버퍼 처리 에러
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferFault),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 싱크 호출 에러
///
/// 버퍼는 이 에러를 생성하지 않고 그대로 전파만 합니다.
/// 재시도 여부는 플러시를 호출한 쪽(플러시 드라이버)이 결정합니다.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 출력 대상 I/O 실패
    #[error("sink io failed: {0}")]
    Io(#[from] std::io::Error),

    /// 출력 대상이 이미 닫힘 (채널 수신측 drop 등)
    #[error("sink closed: {0}")]
    Closed(String),

    /// 기타 싱크 실패
    #[error("sink failed: {0}")]
    Failed(String),
}

/// 버퍼 생명주기 에러 (상위 레이어 전파용 요약)
#[derive(Debug, thiserror::Error)]
pub enum BufferFault {
    /// 닫힌 버퍼에 쓰기 시도
    #[error("write to closed buffer")]
    Closed,

    /// 플러시되지 않은 메시지를 가진 채 버퍼가 폐기됨
    #[error("buffer disposed with {pending} unflushed messages")]
    Unflushed { pending: usize },

    /// 기타 버퍼 처리 실패
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: SinkError = io.into();
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn config_error_converts_to_top_level() {
        let err: LogbatchError = ConfigError::InvalidValue {
            field: "buffer.max_size_bytes".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, LogbatchError::Config(_)));
        assert!(err.to_string().contains("max_size_bytes"));
    }

    #[test]
    fn unflushed_fault_reports_count() {
        let err = BufferFault::Unflushed { pending: 3 };
        assert_eq!(err.to_string(), "buffer disposed with 3 unflushed messages");
    }
}
