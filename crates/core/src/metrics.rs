//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 버퍼와 드라이버는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logbatch_`
//! - 구성 요소: `buffer_`, `driver_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logbatch_core::metrics::BUFFER_MESSAGES_APPENDED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 플러시 원인 레이블 키 (periodic, size, time)
pub const LABEL_TRIGGER: &str = "trigger";

/// 싱크 이름 레이블 키
pub const LABEL_SINK: &str = "sink";

// ─── Buffer 메트릭 ─────────────────────────────────────────────────

/// Buffer: 수락된 메시지 수 (counter)
pub const BUFFER_MESSAGES_APPENDED_TOTAL: &str = "logbatch_buffer_messages_appended_total";

/// Buffer: 닫힌 버퍼라서 거부된 메시지 수 (counter)
pub const BUFFER_MESSAGES_REJECTED_TOTAL: &str = "logbatch_buffer_messages_rejected_total";

/// Buffer: 싱크로 전달된 배치 수 (counter, label: sink)
pub const BUFFER_FLUSHES_TOTAL: &str = "logbatch_buffer_flushes_total";

/// Buffer: 싱크로 전달된 바이트 수 (counter)
pub const BUFFER_FLUSHED_BYTES_TOTAL: &str = "logbatch_buffer_flushed_bytes_total";

/// Buffer: 싱크 호출 실패 수 (counter, label: sink)
pub const BUFFER_SINK_ERRORS_TOTAL: &str = "logbatch_buffer_sink_errors_total";

/// Buffer: 전달하지 못하고 버려진 메시지 수 (counter)
pub const BUFFER_MESSAGES_DISCARDED_TOTAL: &str = "logbatch_buffer_messages_discarded_total";

/// Buffer: 대기 중인 메시지 수 (gauge)
pub const BUFFER_PENDING_MESSAGES: &str = "logbatch_buffer_pending_messages";

/// Buffer: 싱크 호출 소요 시간 (histogram, 초)
pub const BUFFER_FLUSH_DURATION_SECONDS: &str = "logbatch_buffer_flush_duration_seconds";

// ─── Driver 메트릭 ─────────────────────────────────────────────────

/// Driver: 원인별 플러시 시도 수 (counter, label: trigger)
pub const DRIVER_FLUSH_TRIGGERS_TOTAL: &str = "logbatch_driver_flush_triggers_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        BUFFER_MESSAGES_APPENDED_TOTAL,
        "Total number of messages accepted into a buffer"
    );
    describe_counter!(
        BUFFER_MESSAGES_REJECTED_TOTAL,
        "Total number of messages rejected because the buffer was closed"
    );
    describe_counter!(
        BUFFER_FLUSHES_TOTAL,
        "Total number of batches delivered to a sink"
    );
    describe_counter!(
        BUFFER_FLUSHED_BYTES_TOTAL,
        "Total bytes of batches delivered to a sink"
    );
    describe_counter!(
        BUFFER_SINK_ERRORS_TOTAL,
        "Total number of failed sink invocations"
    );
    describe_counter!(
        BUFFER_MESSAGES_DISCARDED_TOTAL,
        "Total number of undelivered messages dropped after a failed final flush"
    );
    describe_gauge!(
        BUFFER_PENDING_MESSAGES,
        "Messages currently waiting for the next flush"
    );
    describe_histogram!(
        BUFFER_FLUSH_DURATION_SECONDS,
        "Sink invocation latency in seconds"
    );
    describe_counter!(
        DRIVER_FLUSH_TRIGGERS_TOTAL,
        "Flush attempts issued by the flush driver, by trigger"
    );
}
