//! 내장 싱크 구현
//!
//! - [`FnSink`]: 클로저 어댑터
//! - [`WriterSink`]: `std::io::Write` 대상 (stdout, 파일 등)
//! - [`ChannelSink`]: `tokio::sync::mpsc` 채널로 배치를 넘김
//!
//! 버퍼는 플러시 임계 구역 안에서만 싱크를 호출하지만, trait이 `&self`를 받으므로
//! 가변 상태가 필요한 싱크는 내부에 락을 둡니다.

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc;

use logbatch_core::error::SinkError;
use logbatch_core::pipeline::Sink;

/// 클로저를 [`Sink`]로 감싸는 어댑터
pub struct FnSink<F> {
    name: String,
    f: F,
}

impl<F> FnSink<F>
where
    F: Fn(&str) -> Result<(), SinkError> + Send + Sync,
{
    /// 새 클로저 싱크를 생성합니다.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Sink for FnSink<F>
where
    F: Fn(&str) -> Result<(), SinkError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn write_batch(&self, batch: &str) -> Result<(), SinkError> {
        (self.f)(batch)
    }
}

/// `std::io::Write` 대상에 배치를 기록하는 싱크
///
/// 배치 뒤에 개행을 하나 붙이고, 매 배치마다 writer를 flush합니다.
pub struct WriterSink<W> {
    name: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// 새 writer 싱크를 생성합니다.
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    /// 내부 writer를 돌려받습니다.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WriterSink<std::io::Stdout> {
    /// 표준 출력 싱크
    pub fn stdout() -> Self {
        Self::new("stdout", std::io::stdout())
    }
}

impl WriterSink<std::io::Stderr> {
    /// 표준 에러 싱크
    pub fn stderr() -> Self {
        Self::new("stderr", std::io::stderr())
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_batch(&self, batch: &str) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Failed(format!("{} writer lock poisoned", self.name)))?;
        writer.write_all(batch.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// 배치를 채널로 전달하는 싱크
///
/// 수신측이 drop되면 [`SinkError::Closed`]를 반환합니다.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// 새 채널 싱크와 수신측을 생성합니다.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 기존 송신측으로 채널 싱크를 생성합니다.
    pub fn from_sender(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Sink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    fn write_batch(&self, batch: &str) -> Result<(), SinkError> {
        self.tx
            .send(batch.to_owned())
            .map_err(|e| SinkError::Closed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_sink_forwards_batch() {
        let seen = Mutex::new(Vec::new());
        let sink = FnSink::new("collect", |batch: &str| {
            seen.lock().unwrap().push(batch.to_owned());
            Ok(())
        });
        sink.write_batch("a\nb").unwrap();
        assert_eq!(sink.name(), "collect");
        drop(sink);
        assert_eq!(seen.into_inner().unwrap(), vec!["a\nb".to_owned()]);
    }

    #[test]
    fn writer_sink_appends_newline() {
        let sink = WriterSink::new("memory", Vec::new());
        sink.write_batch("first\nsecond").unwrap();
        sink.write_batch("third").unwrap();
        assert_eq!(sink.into_inner(), b"first\nsecond\nthird\n");
    }

    #[test]
    fn writer_sink_propagates_io_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let sink = WriterSink::new("broken", Broken);
        let err = sink.write_batch("x").unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }

    #[tokio::test]
    async fn channel_sink_delivers_and_detects_closed_receiver() {
        let (sink, mut rx) = ChannelSink::new();
        sink.write_batch("batch-1").unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("batch-1"));

        drop(rx);
        let err = sink.write_batch("batch-2").unwrap_err();
        assert!(matches!(err, SinkError::Closed(_)));
    }
}
