//! 스코프 실행 -- 드라이버 시작부터 닫기와 마지막 플러시까지 묶어서 수행
//!
//! [`scoped`]는 버퍼 사용 구간을 하나의 async 블록으로 감쌉니다.
//! 프로듀서가 정상 종료하든 에러를 반환하든 panic하든 항상
//! 닫기와 드라이버 종료 대기를 거치고, 마지막 플러시가 실패하면 남은 메시지를 버립니다.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error};

use crate::buffer::BatchBuffer;
use crate::driver::{DriverReport, FlushDriver};
use crate::error::BufferError;

/// 스코프 실행 결과
#[derive(Debug)]
pub struct ScopeOutcome<T> {
    /// 프로듀서가 반환한 값
    pub value: T,
    /// 드라이버 실행 요약
    pub report: DriverReport,
}

/// 드라이버를 띄운 채 프로듀서를 실행하고, 끝나면 버퍼를 닫고 비웁니다.
///
/// 프로듀서가 panic하면 정리를 마친 뒤 같은 panic을 다시 일으킵니다.
/// 마지막 플러시가 실패하면 전달하지 못한 메시지를 [`BatchBuffer::discard`]로
/// 버리고 그 에러를 반환합니다. 어느 경로로 끝나든 반환 시점의 버퍼는 비어 있습니다.
///
/// # 사용 예시
/// ```ignore
/// let outcome = scoped(Arc::clone(&buffer), |buffer| async move {
///     buffer.append("hello").await?;
///     Ok::<_, BufferError>(())
/// })
/// .await?;
/// outcome.value?;
/// ```
pub async fn scoped<F, Fut, T>(
    buffer: Arc<BatchBuffer>,
    producer: F,
) -> Result<ScopeOutcome<T>, BufferError>
where
    F: FnOnce(Arc<BatchBuffer>) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let driver = FlushDriver::new(Arc::clone(&buffer)).spawn();
    let produced = tokio::spawn(producer(Arc::clone(&buffer))).await;

    buffer.close().await;
    let report = driver.join().await;
    if report.is_err() {
        buffer.discard().await;
    }
    debug!(buffer_id = %buffer.id(), "buffer scope finished");

    let value = match produced {
        Ok(value) => value,
        Err(e) if e.is_panic() => {
            error!(buffer_id = %buffer.id(), "producer panicked inside buffer scope");
            std::panic::resume_unwind(e.into_panic());
        }
        Err(e) => return Err(BufferError::Driver(format!("producer task failed: {e}"))),
    };

    let report = report?;
    buffer.ensure_drained()?;

    Ok(ScopeOutcome { value, report })
}
