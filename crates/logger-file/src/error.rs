//! Error types for the rotating file writer

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the rotating file writer and its workers.
#[derive(Debug, Error)]
pub enum Error {
    /// The log file has been closed; the record was dumped to stderr instead.
    #[error("log file closed")]
    Closed,

    /// The supplied path contains a parent-directory component.
    #[error("path {0:?} escapes the log directory")]
    PathDenied(PathBuf),

    /// The log directory could not be created.
    #[error("failed to create directory {path:?}")]
    CreateDirectory {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Probing the volume hosting the log directory failed.
    #[error("disk probe failed: {0}")]
    DiskProbe(String),

    /// Compressing an archived segment failed; the source file is left intact.
    #[error("compression failed: {0}")]
    Compress(String),

    /// Flushing or closing the active file during shutdown failed. The
    /// message is replayed verbatim on repeated `close` calls.
    #[error("close failed: {0}")]
    Close(String),

    /// Any other I/O failure on the active file or an archive.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
