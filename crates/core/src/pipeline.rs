//! 파이프라인 trait -- 버퍼의 확장 포인트 정의

use crate::error::SinkError;

/// 완성된 배치를 소비하는 trait
///
/// 새로운 출력 대상(파일, 네트워크, 로거 백엔드 등)을 지원하려면 이 trait을 구현합니다.
/// 버퍼는 플러시 임계 구역 안에서만 `write_batch`를 호출하므로
/// 동시에 두 번 호출되는 일은 없습니다.
pub trait Sink: Send + Sync {
    /// 싱크 이름 (로그/메트릭 레이블용)
    fn name(&self) -> &str;

    /// 개행으로 이어 붙인 배치 문자열 하나를 전달
    fn write_batch(&self, batch: &str) -> Result<(), SinkError>;
}

/// 한 줄 단위 포매터 trait
///
/// 입력은 내부 개행으로 이미 분리된 한 줄이며, 치환될 한 줄을 반환합니다.
/// 프로듀서 태스크에서 락 밖에서 호출되므로 재진입 안전해야 합니다.
pub trait LineFormatter: Send + Sync {
    /// 한 줄을 포매팅
    fn format_line(&self, line: &str) -> String;
}

impl<T: Sink + ?Sized> Sink for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_batch(&self, batch: &str) -> Result<(), SinkError> {
        (**self).write_batch(batch)
    }
}

impl<T: LineFormatter + ?Sized> LineFormatter for std::sync::Arc<T> {
    fn format_line(&self, line: &str) -> String {
        (**self).format_line(line)
    }
}
