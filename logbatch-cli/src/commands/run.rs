//! `logbatch run` command handler
//!
//! Reads stdin line by line into a [`BatchBuffer`] while a flush driver
//! writes batches to the configured sink. Stops on EOF or Ctrl-C, drains
//! the buffer, then prints a run summary.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use logbatch_buffer::{BatchBuffer, BufferConfig, BufferStats, DriverReport, WriterSink, scoped};
use logbatch_core::config::{BufferSection, LogbatchConfig, SinkSection};
use logbatch_core::pipeline::Sink;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config: LogbatchConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let section = apply_overrides(&config.buffer, &args);
    let buffer_config = BufferConfig::from_core(&section)?;
    let sink = open_sink(&config.sink, args.sink_file.as_deref())?;
    let to_stdout = sink.name() == "stdout";

    let buffer = Arc::new(BatchBuffer::new(buffer_config, sink)?);
    info!(
        buffer_id = %buffer.id(),
        strategy = buffer.trigger().name(),
        sink = buffer.sink_name(),
        "reading lines from stdin"
    );

    let cancel = CancellationToken::new();
    let signal = tokio::spawn(interrupt_on_ctrl_c(cancel.clone()));

    let outcome = scoped(Arc::clone(&buffer), {
        let cancel = cancel.clone();
        move |buffer| pump_lines(tokio::io::stdin(), buffer, cancel)
    })
    .await;
    signal.abort();

    let outcome = outcome?;
    let lines_read = outcome.value?;

    let summary = RunSummary {
        buffer_id: buffer.id().to_string(),
        strategy: buffer.trigger().name().to_owned(),
        sink: buffer.sink_name().to_owned(),
        interrupted: cancel.is_cancelled(),
        lines_read,
        stats: buffer.stats(),
        driver: outcome.report,
    };

    if to_stdout {
        writer.render_stderr(&summary)?;
    } else {
        writer.render(&summary)?;
    }

    Ok(())
}

/// Cancel the token on the first Ctrl-C.
async fn interrupt_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, draining buffer");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
    }
}

/// Append every line from `reader` until EOF or cancellation.
///
/// Returns the number of lines appended.
pub async fn pump_lines<R>(
    reader: R,
    buffer: Arc<BatchBuffer>,
    cancel: CancellationToken,
) -> Result<u64, CliError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut count = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    buffer.append(line).await?;
                    count += 1;
                }
                None => break,
            },
        }
    }

    Ok(count)
}

/// Merge command-line flags over the `[buffer]` section.
fn apply_overrides(section: &BufferSection, args: &RunArgs) -> BufferSection {
    let mut section = section.clone();
    if let Some(strategy) = args.strategy {
        section.strategy = strategy.as_config_str().to_owned();
    }
    if let Some(interval) = args.interval {
        section.flush_interval_secs = Some(interval);
    }
    if let Some(max_size) = args.max_size {
        section.max_size_bytes = max_size;
    }
    if args.timestamp {
        section.timestamp = true;
    }
    if let Some(format) = &args.timestamp_format {
        section.timestamp_format = format.clone();
    }
    section
}

/// Build the sink from `[sink]`, or a file sink when `--sink-file` is given.
fn open_sink(section: &SinkSection, file_override: Option<&Path>) -> Result<Arc<dyn Sink>, CliError> {
    if let Some(path) = file_override {
        return open_file_sink(path, section.append);
    }

    match section.kind.as_str() {
        "stdout" => Ok(Arc::new(WriterSink::stdout())),
        "stderr" => Ok(Arc::new(WriterSink::stderr())),
        "file" => open_file_sink(Path::new(&section.path), section.append),
        other => Err(CliError::Config(format!("unknown sink kind: {}", other))),
    }
}

fn open_file_sink(path: &Path, append: bool) -> Result<Arc<dyn Sink>, CliError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    info!(path = %path.display(), append, "opened file sink");
    Ok(Arc::new(WriterSink::new(
        format!("file:{}", path.display()),
        BufWriter::new(file),
    )))
}

/// Summary printed after the buffer is drained.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub buffer_id: String,
    pub strategy: String,
    pub sink: String,
    pub interrupted: bool,
    pub lines_read: u64,
    pub stats: BufferStats,
    pub driver: DriverReport,
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Run Summary ({})", self.buffer_id)?;
        writeln!(w, "  Strategy:      {}", self.strategy)?;
        writeln!(w, "  Sink:          {}", self.sink)?;
        writeln!(w, "  Lines read:    {}", self.lines_read)?;
        writeln!(w, "  Flushes:       {}", self.stats.flushes)?;
        writeln!(w, "  Bytes flushed: {}", self.stats.flushed_bytes)?;
        writeln!(w, "  Sink errors:   {}", self.stats.sink_errors)?;
        writeln!(
            w,
            "  Triggers:      size={} time={}",
            self.driver.size_triggered, self.driver.time_triggered
        )?;
        if self.interrupted {
            writeln!(w, "  Stopped by interrupt")?;
        }
        Ok(())
    }
}
