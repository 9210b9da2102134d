//! Error types for the logging façade

use thiserror::Error;

/// Errors surfaced by configuration and setup; runtime failures inside the
/// workers are logged and never propagated to callers.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration failed validation.
    #[error("invalid config: {0}")]
    Config(String),

    /// File mode was requested without both log directories.
    #[error("log path must be set")]
    LogPathUnset,

    /// A service name was required but not provided.
    #[error("log service name must be set")]
    ServiceNameUnset,

    /// Closing a combo writer failed in more than one member.
    #[error("multiple close failures: {0:?}")]
    Batch(Vec<Error>),

    /// An error from the rotating file engine.
    #[error(transparent)]
    File(#[from] quill_logger_file::Error),

    /// An I/O failure on a console stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
