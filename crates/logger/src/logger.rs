//! Typed logger façades over the writer fan-out
//!
//! [`RunLogger`] emits leveled records onto the run stream with a
//! `[module]` and optional `[traceId]` prefix; [`AccessLogger`] emits
//! unleveled, timestamped records onto the access stream.

use crate::level::{shall_log, Level};
use crate::writer::get_writer;
use serde::Serialize;
use std::fmt::Display;
use std::time::Instant;

/// Leveled logger for the run stream.
///
/// Every entry point first consults the process-wide level gate; a failing
/// check costs one atomic load and allocates nothing.
#[derive(Debug, Clone)]
pub struct RunLogger {
    module: String,
    trace_id: Option<String>,
}

/// A [`RunLogger`] for the given module name.
pub fn get_run_log(module: impl Into<String>) -> RunLogger {
    RunLogger {
        module: module.into(),
        trace_id: None,
    }
}

impl RunLogger {
    /// A copy of this logger that prefixes records with a trace id.
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> RunLogger {
        RunLogger {
            module: self.module.clone(),
            trace_id: Some(trace_id.into()),
        }
    }

    /// Log at trace level.
    pub fn trace(&self, msg: impl Display) {
        if !shall_log(Level::Trace) {
            return;
        }
        get_writer().write_leveled(Level::Trace, &self.format_message(&msg.to_string()));
    }

    /// Log at debug level.
    pub fn debug(&self, msg: impl Display) {
        if !shall_log(Level::Debug) {
            return;
        }
        get_writer().write_leveled(Level::Debug, &self.format_message(&msg.to_string()));
    }

    /// Log at info level.
    pub fn info(&self, msg: impl Display) {
        if !shall_log(Level::Info) {
            return;
        }
        get_writer().write_leveled(Level::Info, &self.format_message(&msg.to_string()));
    }

    /// Log at warn level.
    pub fn warn(&self, msg: impl Display) {
        if !shall_log(Level::Warn) {
            return;
        }
        get_writer().write_leveled(Level::Warn, &self.format_message(&msg.to_string()));
    }

    /// Log at error level.
    pub fn error(&self, msg: impl Display) {
        if !shall_log(Level::Error) {
            return;
        }
        get_writer().write_leveled(Level::Error, &self.format_message(&msg.to_string()));
    }

    /// Log a non-string payload at the given level, rendered as best-effort
    /// JSON.
    pub fn log_value<T: Serialize>(&self, level: Level, value: &T) {
        if level == Level::Disable || !shall_log(level) {
            return;
        }
        let encoded = crate::format::encode_value(value);
        get_writer().write_leveled(level, &self.format_message(&encoded));
    }

    /// Write a pre-formatted line verbatim to the run stream, bypassing the
    /// level gate and the formatter.
    pub fn write_raw_string(&self, msg: &str) {
        get_writer().write_raw(msg);
    }

    fn format_message(&self, msg: &str) -> String {
        match &self.trace_id {
            Some(trace_id) => format!("[{}] [{trace_id}] {msg}", self.module),
            None => format!("[{}] {msg}", self.module),
        }
    }
}

/// Unleveled logger for the access stream.
#[derive(Debug, Clone, Copy)]
pub struct AccessLogger;

/// The access-stream logger.
pub fn get_access_log() -> AccessLogger {
    AccessLogger
}

impl AccessLogger {
    /// Emit one timestamped access record.
    pub fn record(&self, msg: impl Display) {
        get_writer().access_record(&msg.to_string());
    }
}

/// Guard that logs `Leave:<msg>,cost:<elapsed>` when dropped.
///
/// ```
/// # let logger = quill_logger::get_run_log("demo");
/// let _track = quill_logger::time_track_debug(&logger, "rebuild index");
/// ```
pub struct TimeTrack<'a> {
    logger: &'a RunLogger,
    msg: String,
    level: Level,
    start: Instant,
}

/// Track elapsed time and report it at debug level on drop.
pub fn time_track_debug<'a>(logger: &'a RunLogger, msg: impl Into<String>) -> TimeTrack<'a> {
    time_track(logger, msg, Level::Debug)
}

/// Track elapsed time and report it at trace level on drop.
pub fn time_track_trace<'a>(logger: &'a RunLogger, msg: impl Into<String>) -> TimeTrack<'a> {
    time_track(logger, msg, Level::Trace)
}

/// Track elapsed time and report it at info level on drop.
pub fn time_track_info<'a>(logger: &'a RunLogger, msg: impl Into<String>) -> TimeTrack<'a> {
    time_track(logger, msg, Level::Info)
}

fn time_track<'a>(logger: &'a RunLogger, msg: impl Into<String>, level: Level) -> TimeTrack<'a> {
    TimeTrack {
        logger,
        msg: msg.into(),
        level,
        start: Instant::now(),
    }
}

impl Drop for TimeTrack<'_> {
    fn drop(&mut self) {
        let line = format!("Leave:{},cost:{:?}", self.msg, self.start.elapsed());
        match self.level {
            Level::Trace => self.logger.trace(line),
            Level::Info => self.logger.info(line),
            _ => self.logger.debug(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_is_part_of_the_prefix() {
        let logger = get_run_log("session");
        assert_eq!(logger.format_message("hello"), "[session] hello");

        let traced = logger.with_trace_id("trace-123");
        assert_eq!(
            traced.format_message("hello"),
            "[session] [trace-123] hello"
        );
    }

    #[test]
    fn suppressed_levels_do_not_format() {
        // Default gate is ERR; these calls must return before touching the
        // writer cell. Main assertion is that nothing panics with no writer
        // installed.
        let logger = get_run_log("quiet");
        logger.trace("dropped");
        logger.debug("dropped");
        logger.info("dropped");
    }
}
