//! Rotating file writer with retention, compression and fault recovery
//!
//! This crate is the file engine behind the `quill-logger` façade. It
//! provides:
//! - A bounded, non-blocking record queue drained by a single consumer task
//!   that owns the active file descriptor
//! - Size- or date-driven rotation with sortable archive names
//! - Retention by backup count, disk usage and age, swept on rotation and
//!   on a one-minute ticker
//! - Asynchronous gzip compression of archives with a free-space guard
//! - A health checker that detects write failures and file disappearance
//!   and transparently re-opens the active file

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod compress;
mod disk;
mod error;
mod fs;
mod health;
mod rule;
mod writer;

pub use error::{Error, Result};
pub use rule::{DailyRule, RotateRule, SizeLimitRule};
pub use writer::RotatingFile;

/// Timestamp layout used in emitted records: UTC RFC3339 with millisecond
/// precision.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
