//! Log levels and the process-wide level gate

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Log level - totally ordered so the gate is a single integer comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum Level {
    /// Trace level - lowest priority
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level - highest priority
    Error = 4,
    /// Suppresses every leveled method
    Disable = 0xff,
}

/// The supplied string is not a recognized level name.
#[derive(Debug, Clone, Error)]
#[error("invalid log level: {0}")]
pub struct InvalidLevel(pub String);

impl Level {
    /// Three-letter tag used in record headers and configuration.
    pub fn tag(self) -> &'static str {
        match self {
            Level::Trace => "TRA",
            Level::Debug => "DEB",
            Level::Info => "INF",
            Level::Warn => "WAR",
            Level::Error => "ERR",
            Level::Disable => "OFF",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Level {
    type Err = InvalidLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRA" => Ok(Level::Trace),
            "DEB" => Ok(Level::Debug),
            "INF" => Ok(Level::Info),
            "WAR" => Ok(Level::Warn),
            "ERR" => Ok(Level::Error),
            "OFF" => Ok(Level::Disable),
            _ => Err(InvalidLevel(s.to_string())),
        }
    }
}

/// Minimum enabled level; leveled entry points are gated on one relaxed
/// atomic load. Defaults to `ERR`.
static LOG_LEVEL: AtomicU32 = AtomicU32::new(Level::Error as u32);

/// Whether a record at `level` passes the current gate.
#[inline(always)]
pub fn shall_log(level: Level) -> bool {
    LOG_LEVEL.load(Ordering::Relaxed) <= level as u32
}

/// Set the minimum enabled level.
pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u32, Ordering::Relaxed);
}

/// The current minimum enabled level.
pub fn get_level() -> Level {
    from_raw(LOG_LEVEL.load(Ordering::Relaxed))
}

pub(crate) fn from_raw(raw: u32) -> Level {
    match raw {
        0 => Level::Trace,
        1 => Level::Debug,
        2 => Level::Info,
        3 => Level::Warn,
        4 => Level::Error,
        _ => Level::Disable,
    }
}

/// Validate a level name without changing the gate.
pub fn check_level_str(level: &str) -> Result<(), InvalidLevel> {
    level.parse::<Level>().map(|_| ())
}

/// Set the gate from a level name; unrecognized names are ignored with a
/// diagnostic through the active writer.
pub fn set_level_str(level: &str) {
    match level.parse::<Level>() {
        Ok(parsed) => {
            set_level(parsed);
            crate::logger::get_run_log("quill").info(format!("set log level to {parsed}"));
        }
        Err(e) => crate::logger::get_run_log("quill").warn(e.to_string()),
    }
}

/// Tag of the current minimum enabled level.
pub fn get_level_str() -> &'static str {
    get_level().tag()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("deb".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("ERR".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("off".parse::<Level>().unwrap(), Level::Disable);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn ordering_matches_severity() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Disable);
    }

    #[test]
    fn tag_round_trips() {
        for level in [
            Level::Trace,
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
            Level::Disable,
        ] {
            assert_eq!(level.tag().parse::<Level>().unwrap(), level);
        }
    }
}
