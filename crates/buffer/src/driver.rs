//! 플러시 드라이버 -- 버퍼가 열려 있는 동안 전략에 따라 반복 플러시
//!
//! 드라이버는 `Running -> Draining -> Stopped` 순서로만 진행합니다.
//! 버퍼가 닫히면 루프를 빠져나와 마지막 플러시를 한 번 수행하고 종료합니다.
//!
//! # 전략별 동작
//! - `Periodic`: 플러시 후 간격만큼 대기 (닫힘 알림이 오면 즉시 깨어남)
//! - `SizeOrTimeout`: 크기 초과 신호와 타임아웃 중 먼저 오는 쪽을 기다린 뒤
//!   원인 마커 메시지를 추가하고 플러시
//!
//! 반복 중 싱크 실패는 로그로 남기고 한 간격 쉰 뒤 계속합니다.
//! 마지막 플러시의 실패는 [`DriverHandle::join`]으로 전달됩니다.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use logbatch_core::metrics as names;

use crate::buffer::{BatchBuffer, FlushOutcome};
use crate::config::FlushTrigger;
use crate::error::BufferError;

/// 크기 초과로 깨어났을 때 추가되는 마커
pub const SIZE_EXCEEDED_MARKER: &str = "[flusher] maximum buffer size exceeded";

/// 타임아웃으로 깨어났을 때 추가되는 마커
pub const TIME_EXCEEDED_MARKER: &str = "[flusher] maximum buffer time exceeded";

/// 드라이버 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// 버퍼가 열려 있는 동안 반복
    Running,
    /// 닫힘 감지 후 마지막 플러시 중
    Draining,
    /// 종료
    Stopped,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// 플러시 원인
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushCause {
    /// 주기 도래
    Periodic,
    /// 크기 임계값 초과
    SizeExceeded,
    /// 최대 대기 시간 초과
    TimeExceeded,
    /// 닫힘 후 마지막 플러시
    Final,
}

impl FlushCause {
    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Periodic => "periodic",
            Self::SizeExceeded => "size",
            Self::TimeExceeded => "time",
            Self::Final => "final",
        }
    }

    /// 플러시 전에 버퍼에 추가할 마커
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::SizeExceeded => Some(SIZE_EXCEEDED_MARKER),
            Self::TimeExceeded => Some(TIME_EXCEEDED_MARKER),
            Self::Periodic | Self::Final => None,
        }
    }
}

/// 드라이버 실행 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriverReport {
    /// 반복 횟수 (마지막 플러시 제외)
    pub iterations: u64,
    /// 싱크에 배치를 전달한 플러시 수 (마지막 플러시 포함)
    pub flushes: u64,
    /// 크기 초과로 깨어난 횟수
    pub size_triggered: u64,
    /// 타임아웃으로 깨어난 횟수
    pub time_triggered: u64,
    /// 실패한 플러시 수
    pub failed_flushes: u64,
}

/// 대기 결과
enum Wake {
    Closed,
    Flush(FlushCause),
}

/// 버퍼 하나를 담당하는 플러시 드라이버
pub struct FlushDriver {
    buffer: Arc<BatchBuffer>,
    state: DriverState,
    report: DriverReport,
}

impl FlushDriver {
    /// 새 드라이버를 생성합니다.
    pub fn new(buffer: Arc<BatchBuffer>) -> Self {
        Self {
            buffer,
            state: DriverState::Running,
            report: DriverReport::default(),
        }
    }

    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// 백그라운드 태스크로 실행합니다.
    pub fn spawn(self) -> DriverHandle {
        DriverHandle {
            handle: tokio::spawn(self.run()),
        }
    }

    /// 버퍼가 닫힐 때까지 실행하고 마지막 플러시 결과를 반환합니다.
    pub async fn run(mut self) -> Result<DriverReport, BufferError> {
        let trigger = self.buffer.trigger();
        info!(
            buffer_id = %self.buffer.id(),
            strategy = trigger.name(),
            interval_ms = trigger.interval().as_millis() as u64,
            "flush driver started"
        );

        match trigger {
            FlushTrigger::Periodic { interval } => self.run_periodic(interval).await,
            FlushTrigger::SizeOrTimeout { interval, .. } => {
                self.run_size_or_timeout(interval).await
            }
        }

        self.transition(DriverState::Draining);
        let result = self.flush(FlushCause::Final).await;
        self.transition(DriverState::Stopped);

        info!(
            buffer_id = %self.buffer.id(),
            iterations = self.report.iterations,
            flushes = self.report.flushes,
            failed_flushes = self.report.failed_flushes,
            "flush driver stopped"
        );

        result.map(|_| self.report)
    }

    async fn run_periodic(&mut self, interval: Duration) {
        let mut closed = self.buffer.subscribe_closed();

        while self.buffer.is_open() {
            self.report.iterations += 1;
            counter!(
                names::DRIVER_FLUSH_TRIGGERS_TOTAL,
                names::LABEL_TRIGGER => FlushCause::Periodic.as_str()
            )
            .increment(1);
            if self.flush(FlushCause::Periodic).await.is_err() {
                debug!(buffer_id = %self.buffer.id(), "periodic flush failed, retrying next tick");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = closed.wait_for(|closed| *closed) => {}
            }
        }
    }

    async fn run_size_or_timeout(&mut self, interval: Duration) {
        let mut closed = self.buffer.subscribe_closed();
        let mut exceeded = self.buffer.subscribe_size_exceeded();
        // 직전 플러시 실패 시 남은 배치에 이미 마커가 있음
        let mut retrying = false;

        while self.buffer.is_open() {
            let wake = Self::wait(&mut closed, &mut exceeded, interval).await;
            let cause = match wake {
                Wake::Closed => break,
                Wake::Flush(cause) => cause,
            };

            self.report.iterations += 1;
            match cause {
                FlushCause::SizeExceeded => self.report.size_triggered += 1,
                FlushCause::TimeExceeded => self.report.time_triggered += 1,
                _ => {}
            }
            counter!(names::DRIVER_FLUSH_TRIGGERS_TOTAL, names::LABEL_TRIGGER => cause.as_str())
                .increment(1);

            if let Some(marker) = cause.marker().filter(|_| !retrying) {
                match self.buffer.append(marker).await {
                    Ok(()) => {}
                    // 대기 직후 닫힘: 마커 없이 마지막 플러시로 넘어감
                    Err(BufferError::Closed) => break,
                    Err(e) => {
                        warn!(buffer_id = %self.buffer.id(), error = %e, "failed to append marker");
                    }
                }
            }

            retrying = self.flush(cause).await.is_err();
            if retrying {
                // 신호가 켜진 채 남으므로 바로 재시도하지 않음
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = closed.wait_for(|closed| *closed) => {}
                }
            }
        }
    }

    /// 닫힘, 크기 초과, 타임아웃 중 먼저 오는 것을 기다립니다.
    async fn wait(
        closed: &mut watch::Receiver<bool>,
        exceeded: &mut watch::Receiver<bool>,
        interval: Duration,
    ) -> Wake {
        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Wake::Closed,
            signal = tokio::time::timeout(interval, exceeded.wait_for(|exceeded| *exceeded)) => {
                match signal {
                    Ok(_) => Wake::Flush(FlushCause::SizeExceeded),
                    Err(_) => Wake::Flush(FlushCause::TimeExceeded),
                }
            }
        }
    }

    async fn flush(&mut self, cause: FlushCause) -> Result<FlushOutcome, BufferError> {
        match self.buffer.flush().await {
            Ok(outcome) => {
                if let FlushOutcome::Flushed { messages, bytes } = outcome {
                    self.report.flushes += 1;
                    debug!(
                        buffer_id = %self.buffer.id(),
                        cause = cause.as_str(),
                        messages,
                        bytes,
                        "driver flushed batch"
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                self.report.failed_flushes += 1;
                error!(
                    buffer_id = %self.buffer.id(),
                    cause = cause.as_str(),
                    error = %e,
                    "driver flush failed"
                );
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: DriverState) {
        debug!(buffer_id = %self.buffer.id(), from = %self.state, to = %next, "driver state changed");
        self.state = next;
    }
}

/// 실행 중인 드라이버 태스크 핸들
pub struct DriverHandle {
    handle: JoinHandle<Result<DriverReport, BufferError>>,
}

impl DriverHandle {
    /// 드라이버 종료를 기다립니다.
    ///
    /// 버퍼를 먼저 닫지 않으면 반환되지 않습니다.
    pub async fn join(self) -> Result<DriverReport, BufferError> {
        self.handle
            .await
            .map_err(|e| BufferError::Driver(e.to_string()))?
    }

    /// 태스크가 끝났는지 확인합니다.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;
    use crate::sink::ChannelSink;

    #[test]
    fn cause_markers() {
        assert_eq!(FlushCause::SizeExceeded.marker(), Some(SIZE_EXCEEDED_MARKER));
        assert_eq!(FlushCause::TimeExceeded.marker(), Some(TIME_EXCEEDED_MARKER));
        assert_eq!(FlushCause::Periodic.marker(), None);
        assert_eq!(FlushCause::Final.marker(), None);
    }

    #[test]
    fn report_serializes_counters() {
        let report = DriverReport {
            iterations: 4,
            flushes: 3,
            size_triggered: 1,
            time_triggered: 2,
            failed_flushes: 1,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["iterations"], 4);
        assert_eq!(json["size_triggered"], 1);
        assert_eq!(json["failed_flushes"], 1);
    }

    #[test]
    fn driver_state_display() {
        assert_eq!(DriverState::Running.to_string(), "running");
        assert_eq!(DriverState::Draining.to_string(), "draining");
        assert_eq!(DriverState::Stopped.to_string(), "stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn driver_starts_running_and_stops_after_close() {
        let (sink, _rx) = ChannelSink::new();
        let buffer = Arc::new(
            BatchBuffer::new(BufferConfig::with_trigger(FlushTrigger::periodic()), sink).unwrap(),
        );
        let driver = FlushDriver::new(Arc::clone(&buffer));
        assert_eq!(driver.state(), DriverState::Running);

        let handle = driver.spawn();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!handle.is_finished());

        buffer.close().await;
        let report = handle.join().await.unwrap();
        assert!(report.iterations >= 3);
        assert_eq!(report.flushes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn size_or_timeout_idle_buffer_flushes_time_marker() {
        let (sink, mut rx) = ChannelSink::new();
        let buffer = Arc::new(
            BatchBuffer::new(
                BufferConfig::with_trigger(FlushTrigger::size_or_timeout()),
                sink,
            )
            .unwrap(),
        );
        let handle = FlushDriver::new(Arc::clone(&buffer)).spawn();

        // 메시지가 없어도 타임아웃마다 마커가 추가되어 플러시됨
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch, TIME_EXCEEDED_MARKER);

        buffer.close().await;
        let report = handle.join().await.unwrap();
        assert!(report.time_triggered >= 1);
        assert_eq!(report.size_triggered, 0);
    }
}
