//! 배치 버퍼 -- 동시 프로듀서의 메시지를 모아 한 번에 싱크로 전달
//!
//! [`BatchBuffer`]는 대기 메시지 목록, 열림/닫힘 플래그, (크기 전략일 때) 누적 바이트 수와
//! 크기 초과 신호를 하나의 `tokio::sync::Mutex` 아래에서 관리합니다.
//!
//! # 불변식
//! - 대기 목록은 락 안에서만, 그리고 항상 통째로 비워집니다.
//! - 닫힌 버퍼는 새 메시지를 받지 않습니다 ([`BufferError::Closed`]).
//! - 크기 전략에서 누적 바이트 수는 대기 목록의 UTF-8 길이 합과 항상 같습니다.
//! - 비어 있는 버퍼의 플러시는 싱크를 호출하지 않습니다.
//!
//! # 폐기 검사
//! 플러시되지 않은 메시지가 남은 채 버퍼가 drop되면 디버그 빌드에서는 panic,
//! 릴리스 빌드에서는 `error` 로그를 남깁니다. 정상 경로에서는
//! [`scoped`](crate::scope::scoped)로 닫기와 마지막 플러시를 보장합니다.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use logbatch_core::metrics as names;
use logbatch_core::pipeline::{LineFormatter, Sink};

use crate::config::{BufferConfig, FlushTrigger};
use crate::error::BufferError;
use crate::format::{RawMessage, TimestampFormatter, format_message};

/// 락으로 보호되는 버퍼 상태
#[derive(Debug)]
struct BufferState {
    /// 대기 중인 메시지 (추가 순서 유지)
    pending: Vec<String>,
    /// 열림 여부
    open: bool,
    /// 대기 메시지의 UTF-8 바이트 합 (크기 전략 전용)
    pending_bytes: usize,
}

/// 플러시 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 대기 메시지가 없어 싱크를 호출하지 않음
    Empty,
    /// 싱크에 배치를 전달함
    Flushed {
        /// 배치에 포함된 메시지 수
        messages: usize,
        /// 배치 문자열의 바이트 수
        bytes: usize,
    },
}

impl FlushOutcome {
    /// 싱크가 호출되었는지 확인합니다.
    pub fn is_flushed(&self) -> bool {
        matches!(self, Self::Flushed { .. })
    }
}

/// 버퍼 통계 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    /// 수락된 메시지 수
    pub appended: u64,
    /// 닫힌 뒤 거부된 메시지 수
    pub rejected: u64,
    /// 싱크로 전달된 배치 수
    pub flushes: u64,
    /// 싱크로 전달된 바이트 수
    pub flushed_bytes: u64,
    /// 싱크 호출 실패 수
    pub sink_errors: u64,
    /// 전달하지 못하고 버려진 메시지 수
    pub discarded: u64,
    /// 현재 대기 중인 메시지 수
    pub pending: usize,
}

#[derive(Debug, Default)]
struct Counters {
    appended: AtomicU64,
    rejected: AtomicU64,
    flushes: AtomicU64,
    flushed_bytes: AtomicU64,
    sink_errors: AtomicU64,
    discarded: AtomicU64,
}

/// 동시성 안전 메시지 배치 버퍼
///
/// 여러 프로듀서가 `Arc<BatchBuffer>`를 공유하여 [`append`](Self::append)를 호출하고,
/// 플러시 드라이버가 주기적으로 [`flush`](Self::flush)를 호출합니다.
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use logbatch_buffer::{BatchBuffer, BufferConfig, FlushTrigger, WriterSink};
///
/// let buffer = Arc::new(BatchBuffer::new(
///     BufferConfig::with_trigger(FlushTrigger::periodic()),
///     WriterSink::stdout(),
/// )?);
/// buffer.append("hello").await?;
/// buffer.flush().await?;
/// ```
pub struct BatchBuffer {
    /// 인스턴스 식별자 (로그 구분용)
    id: Uuid,
    /// 플러시 전략
    trigger: FlushTrigger,
    /// 배치 출력 대상
    sink: Box<dyn Sink>,
    /// 줄 단위 포매터 (없으면 변환하지 않음)
    formatter: Option<Box<dyn LineFormatter>>,
    /// 보호 상태
    state: Mutex<BufferState>,
    /// 락 없이 읽는 대기 메시지 수 (빈 버퍼 플러시 사전 검사용)
    pending_count: AtomicUsize,
    /// 크기 초과 신호 (레벨 트리거, 플러시 시 해제)
    size_exceeded: watch::Sender<bool>,
    /// 닫힘 알림
    closed: watch::Sender<bool>,
    /// 누적 통계
    counters: Counters,
}

impl BatchBuffer {
    /// 새 버퍼를 생성합니다.
    ///
    /// `config.timestamp`가 켜져 있으면 [`TimestampFormatter`]가 포매터로 설정됩니다.
    pub fn new(config: BufferConfig, sink: impl Sink + 'static) -> Result<Self, BufferError> {
        config.validate()?;

        let formatter: Option<Box<dyn LineFormatter>> = if config.timestamp {
            Some(Box::new(TimestampFormatter::new(&config.timestamp_format)?))
        } else {
            None
        };

        let (size_exceeded, _) = watch::channel(false);
        let (closed, _) = watch::channel(false);

        let buffer = Self {
            id: Uuid::new_v4(),
            trigger: config.trigger,
            sink: Box::new(sink),
            formatter,
            state: Mutex::new(BufferState {
                pending: Vec::new(),
                open: true,
                pending_bytes: 0,
            }),
            pending_count: AtomicUsize::new(0),
            size_exceeded,
            closed,
            counters: Counters::default(),
        };

        debug!(
            buffer_id = %buffer.id,
            strategy = buffer.trigger.name(),
            sink = buffer.sink.name(),
            "batch buffer created"
        );
        Ok(buffer)
    }

    /// 포매터를 지정합니다 (설정의 타임스탬프 포매터를 대체).
    pub fn with_formatter(mut self, formatter: impl LineFormatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// 메시지를 버퍼에 추가합니다.
    ///
    /// 포매터가 있으면 락을 잡기 전에 줄 단위로 적용합니다.
    /// 버퍼가 닫혀 있으면 아무것도 바꾸지 않고 [`BufferError::Closed`]를 반환합니다.
    pub async fn append(&self, message: impl Into<RawMessage>) -> Result<(), BufferError> {
        let message = match &self.formatter {
            Some(formatter) => format_message(message, formatter.as_ref())?,
            None => message.into().into_text()?,
        };
        let message_bytes = message.len();

        let (pending, exceeded) = {
            let mut state = self.state.lock().await;
            if !state.open {
                drop(state);
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                counter!(names::BUFFER_MESSAGES_REJECTED_TOTAL).increment(1);
                return Err(BufferError::Closed);
            }

            state.pending.push(message);
            self.pending_count
                .store(state.pending.len(), Ordering::Release);

            let exceeded = match self.trigger.max_size_bytes() {
                Some(max_size_bytes) => {
                    state.pending_bytes += message_bytes;
                    state.pending_bytes > max_size_bytes
                }
                None => false,
            };
            (state.pending.len(), exceeded)
        };

        self.counters.appended.fetch_add(1, Ordering::Relaxed);
        counter!(names::BUFFER_MESSAGES_APPENDED_TOTAL).increment(1);
        gauge!(names::BUFFER_PENDING_MESSAGES).set(pending as f64);

        if exceeded && !*self.size_exceeded.borrow() {
            debug!(buffer_id = %self.id, pending, "maximum buffer size exceeded");
            self.size_exceeded.send_replace(true);
        }

        Ok(())
    }

    /// 대기 메시지를 개행으로 이어 붙여 싱크에 한 번 전달하고 버퍼를 비웁니다.
    ///
    /// 대기 메시지가 없으면 싱크를 호출하지 않고 [`FlushOutcome::Empty`]를 반환합니다.
    /// 싱크 실패 시 대기 메시지는 그대로 남고 에러가 호출자에게 전파됩니다.
    pub async fn flush(&self) -> Result<FlushOutcome, BufferError> {
        if self.pending_count.load(Ordering::Acquire) == 0 {
            return Ok(FlushOutcome::Empty);
        }

        let mut state = self.state.lock().await;
        // 락 대기 중 다른 플러시가 비웠을 수 있음
        if state.pending.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let batch = state.pending.join("\n");
        let messages = state.pending.len();

        let started = Instant::now();
        if let Err(e) = self.sink.write_batch(&batch) {
            drop(state);
            self.counters.sink_errors.fetch_add(1, Ordering::Relaxed);
            counter!(names::BUFFER_SINK_ERRORS_TOTAL, names::LABEL_SINK => self.sink.name().to_owned())
                .increment(1);
            warn!(
                buffer_id = %self.id,
                sink = self.sink.name(),
                messages,
                error = %e,
                "sink rejected batch, messages kept for next flush"
            );
            return Err(BufferError::Sink(e));
        }
        histogram!(names::BUFFER_FLUSH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        state.pending.clear();
        state.pending_bytes = 0;
        self.pending_count.store(0, Ordering::Release);
        self.size_exceeded.send_replace(false);
        drop(state);

        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        self.counters
            .flushed_bytes
            .fetch_add(batch.len() as u64, Ordering::Relaxed);
        counter!(names::BUFFER_FLUSHES_TOTAL, names::LABEL_SINK => self.sink.name().to_owned())
            .increment(1);
        counter!(names::BUFFER_FLUSHED_BYTES_TOTAL).increment(batch.len() as u64);
        gauge!(names::BUFFER_PENDING_MESSAGES).set(0.0);

        debug!(
            buffer_id = %self.id,
            messages,
            bytes = batch.len(),
            "flushed batch"
        );

        Ok(FlushOutcome::Flushed {
            messages,
            bytes: batch.len(),
        })
    }

    /// 버퍼를 닫습니다. 이후 append는 실패합니다.
    ///
    /// 플러시는 하지 않습니다. 여러 번 호출해도 효과는 한 번입니다.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if !state.open {
            return;
        }
        state.open = false;
        let pending = state.pending.len();
        drop(state);

        self.closed.send_replace(true);
        info!(buffer_id = %self.id, pending, "batch buffer closed");
    }

    /// 대기 메시지를 싱크에 보내지 않고 버립니다.
    ///
    /// 마지막 플러시가 실패한 뒤 남은 메시지를 정리할 때 사용합니다.
    /// 버린 메시지 수를 반환하며, 0이 아니면 `error` 로그를 남깁니다.
    pub async fn discard(&self) -> usize {
        let mut state = self.state.lock().await;
        let discarded = state.pending.len();
        if discarded == 0 {
            return 0;
        }

        state.pending.clear();
        state.pending_bytes = 0;
        self.pending_count.store(0, Ordering::Release);
        self.size_exceeded.send_replace(false);
        drop(state);

        self.counters
            .discarded
            .fetch_add(discarded as u64, Ordering::Relaxed);
        counter!(names::BUFFER_MESSAGES_DISCARDED_TOTAL).increment(discarded as u64);
        gauge!(names::BUFFER_PENDING_MESSAGES).set(0.0);
        error!(
            buffer_id = %self.id,
            sink = self.sink.name(),
            discarded,
            "discarded undelivered messages"
        );
        discarded
    }

    /// 버퍼가 비어 있는지 검사합니다.
    ///
    /// 폐기 전에 호출하여 플러시되지 않은 메시지를
    /// [`BufferError::UnflushedOnDispose`]로 보고합니다.
    pub fn ensure_drained(&self) -> Result<(), BufferError> {
        match self.pending_count.load(Ordering::Acquire) {
            0 => Ok(()),
            pending => Err(BufferError::UnflushedOnDispose { pending }),
        }
    }

    /// 인스턴스 식별자를 반환합니다.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 플러시 전략을 반환합니다.
    pub fn trigger(&self) -> FlushTrigger {
        self.trigger
    }

    /// 싱크 이름을 반환합니다.
    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// 버퍼가 열려 있는지 확인합니다.
    pub fn is_open(&self) -> bool {
        !*self.closed.borrow()
    }

    /// 대기 중인 메시지 수를 반환합니다.
    pub fn pending_len(&self) -> usize {
        self.pending_count.load(Ordering::Acquire)
    }

    /// 대기 메시지의 누적 UTF-8 바이트 수를 반환합니다 (크기 전략 전용, 그 외 0).
    pub async fn pending_bytes(&self) -> usize {
        self.state.lock().await.pending_bytes
    }

    /// 크기 초과 신호가 켜져 있는지 확인합니다.
    pub fn size_exceeded(&self) -> bool {
        *self.size_exceeded.borrow()
    }

    /// 통계 스냅샷을 반환합니다.
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            appended: self.counters.appended.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
            flushed_bytes: self.counters.flushed_bytes.load(Ordering::Relaxed),
            sink_errors: self.counters.sink_errors.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            pending: self.pending_len(),
        }
    }

    /// 크기 초과 신호 구독
    pub(crate) fn subscribe_size_exceeded(&self) -> watch::Receiver<bool> {
        self.size_exceeded.subscribe()
    }

    /// 닫힘 알림 구독
    pub(crate) fn subscribe_closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

impl Drop for BatchBuffer {
    fn drop(&mut self) {
        let pending = self.state.get_mut().pending.len();
        if pending == 0 {
            return;
        }

        let err = BufferError::UnflushedOnDispose { pending };
        if cfg!(debug_assertions) && !std::thread::panicking() {
            panic!("{err} (buffer {})", self.id);
        }
        error!(buffer_id = %self.id, pending, "{err}");
    }
}

impl std::fmt::Debug for BatchBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchBuffer")
            .field("id", &self.id)
            .field("trigger", &self.trigger)
            .field("sink", &self.sink.name())
            .field("pending", &self.pending_len())
            .field("open", &self.is_open())
            .finish()
    }
}
