//! CLI-specific error types and exit code mapping

use logbatch_buffer::BufferError;
use logbatch_core::error::LogbatchError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdin read, sink file open, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logbatch-core.
    #[error("{0}")]
    Core(#[from] LogbatchError),

    /// Buffer or flush driver failure.
    #[error("buffer error: {0}")]
    Buffer(BufferError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration error                  |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LogbatchError::Config(_)) => 2,
            Self::Io(_) | Self::Core(LogbatchError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Buffer(_) => 1,
        }
    }
}

impl From<BufferError> for CliError {
    fn from(e: BufferError) -> Self {
        match e {
            BufferError::Config { field, reason } => Self::Config(format!("{field}: {reason}")),
            other => Self::Buffer(other),
        }
    }
}
