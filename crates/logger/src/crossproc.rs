//! Cross-process record channel
//!
//! A child process formats complete record lines and parks them on a
//! bounded in-memory queue; the parent drains the queue and writes each
//! line raw to its own run stream, applying its own level threshold.
//! Producers never block: a full queue drops the newest record.

use crate::format::format_plain_text;
use crate::level::{shall_log, Level};
use crate::writer::get_writer;
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::OnceLock;
use tokio::sync::mpsc;

const CHILD_QUEUE_CAPACITY: usize = 1024;

/// A pre-formatted record destined for the parent process.
#[derive(Debug, Clone)]
pub struct ChildRecord {
    /// Level the record was emitted at; the parent filters on it.
    pub level: Level,
    /// The complete formatted line, trailing newline included.
    pub content: String,
}

struct ChildQueue {
    tx: mpsc::Sender<ChildRecord>,
    rx: Mutex<mpsc::Receiver<ChildRecord>>,
}

fn queue() -> &'static ChildQueue {
    static QUEUE: OnceLock<ChildQueue> = OnceLock::new();
    QUEUE.get_or_init(|| {
        let (tx, rx) = mpsc::channel(CHILD_QUEUE_CAPACITY);
        ChildQueue {
            tx,
            rx: Mutex::new(rx),
        }
    })
}

/// Logger used inside a child process: records are fully formatted up
/// front and buffered for the parent instead of being written locally.
#[derive(Debug, Clone)]
pub struct ChildLogger {
    module: String,
    trace_id: Option<String>,
}

/// A [`ChildLogger`] for the given module name.
pub fn get_child_log(module: impl Into<String>) -> ChildLogger {
    ChildLogger {
        module: module.into(),
        trace_id: None,
    }
}

impl ChildLogger {
    /// A copy of this logger that prefixes records with a trace id.
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> ChildLogger {
        ChildLogger {
            module: self.module.clone(),
            trace_id: Some(trace_id.into()),
        }
    }

    /// Buffer a trace-level record.
    pub fn trace(&self, msg: impl Display) {
        self.emit(Level::Trace, msg.to_string());
    }

    /// Buffer a debug-level record.
    pub fn debug(&self, msg: impl Display) {
        self.emit(Level::Debug, msg.to_string());
    }

    /// Buffer an info-level record.
    pub fn info(&self, msg: impl Display) {
        self.emit(Level::Info, msg.to_string());
    }

    /// Buffer a warn-level record.
    pub fn warn(&self, msg: impl Display) {
        self.emit(Level::Warn, msg.to_string());
    }

    /// Buffer an error-level record.
    pub fn error(&self, msg: impl Display) {
        self.emit(Level::Error, msg.to_string());
    }

    fn emit(&self, level: Level, msg: String) {
        if msg.is_empty() {
            return;
        }
        let content = format_plain_text(level.tag(), &self.format_message(&msg));
        let _ = queue().tx.try_send(ChildRecord { level, content });
    }

    fn format_message(&self, msg: &str) -> String {
        match &self.trace_id {
            Some(trace_id) => format!("[{}] [{trace_id}] {msg}", self.module),
            None => format!("[{}] {msg}", self.module),
        }
    }
}

/// Take the oldest buffered record, if any. Non-blocking.
pub fn pop_child_record() -> Option<ChildRecord> {
    queue().rx.lock().try_recv().ok()
}

/// Parent-side sink: write a child record raw to the run stream when it
/// passes the current level threshold.
pub fn write_child_record(record: &ChildRecord) {
    if !shall_log(record.level) {
        return;
    }
    get_writer().write_raw(&record.content);
}
