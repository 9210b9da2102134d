//! Stream-writer fan-out and the process-wide writer cell
//!
//! A [`Writer`] is one of five variants: empty, console, colour console,
//! dual-file (run stream + access stream) or an ordered combo that fans
//! every record out to its members. The active writer lives in a
//! process-wide cell; [`add_writer`] tees an additional destination onto
//! whatever is installed.

use crate::error::Error;
use crate::format;
use crate::level::Level;
use parking_lot::{Mutex, RwLock};
use quill_logger_file::RotatingFile;
use std::io::{IsTerminal, Write as _};
use std::sync::Arc;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// A destination for formatted records.
pub struct Writer {
    kind: Kind,
}

enum Kind {
    Empty,
    Console(Mutex<std::io::Stdout>),
    ColorConsole(Mutex<StandardStream>),
    File {
        server: RotatingFile,
        manager: RotatingFile,
    },
    Combo(Vec<Arc<Writer>>),
}

impl Writer {
    /// A writer that drops everything.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// A writer that prints formatted records to standard output.
    pub fn console() -> Self {
        Self {
            kind: Kind::Console(Mutex::new(std::io::stdout())),
        }
    }

    /// Like [`console`](Self::console), but colours the level tag when
    /// standard output is a terminal.
    pub fn color_console() -> Self {
        Self {
            kind: Kind::ColorConsole(Mutex::new(StandardStream::stdout(ColorChoice::Auto))),
        }
    }

    pub(crate) fn file(server: RotatingFile, manager: RotatingFile) -> Self {
        Self {
            kind: Kind::File { server, manager },
        }
    }

    pub(crate) fn combo(writers: Vec<Arc<Writer>>) -> Self {
        Self {
            kind: Kind::Combo(writers),
        }
    }

    pub(crate) fn close(&self) -> Result<(), Error> {
        match &self.kind {
            Kind::Empty => Ok(()),
            Kind::Console(out) => Ok(out.lock().flush()?),
            Kind::ColorConsole(out) => Ok(out.lock().flush()?),
            Kind::File { server, manager } => {
                server.close()?;
                manager.close()?;
                Ok(())
            }
            Kind::Combo(writers) => {
                let mut errors: Vec<Error> =
                    writers.iter().filter_map(|w| w.close().err()).collect();
                match errors.len() {
                    0 => Ok(()),
                    1 => Err(errors.remove(0)),
                    _ => Err(Error::Batch(errors)),
                }
            }
        }
    }

    /// Route a leveled record to the run stream.
    pub(crate) fn write_leveled(&self, level: Level, msg: &str) {
        match &self.kind {
            Kind::Empty => {}
            Kind::Console(out) => {
                let line = format::format_plain_text(level.tag(), format::truncate_payload(msg));
                write_console(&mut *out.lock(), &line);
            }
            Kind::ColorConsole(out) => {
                write_colored(&mut *out.lock(), level, format::truncate_payload(msg));
            }
            Kind::File { server, .. } => {
                let line = format::format_plain_text(level.tag(), format::truncate_payload(msg));
                write_file(server, line);
            }
            Kind::Combo(writers) => {
                for w in writers {
                    w.write_leveled(level, msg);
                }
            }
        }
    }

    /// Route an unleveled, timestamped record to the access stream.
    pub(crate) fn access_record(&self, msg: &str) {
        match &self.kind {
            Kind::Empty => {}
            Kind::Console(out) => {
                let line =
                    format::format_plain_text(format::ACCESS_TAG, format::truncate_payload(msg));
                write_console(&mut *out.lock(), &line);
            }
            Kind::ColorConsole(out) => {
                let line =
                    format::format_plain_text(format::ACCESS_TAG, format::truncate_payload(msg));
                write_console(&mut *out.lock(), &line);
            }
            Kind::File { manager, .. } => {
                let line =
                    format::format_plain_text(format::ACCESS_TAG, format::truncate_payload(msg));
                write_file(manager, line);
            }
            Kind::Combo(writers) => {
                for w in writers {
                    w.access_record(msg);
                }
            }
        }
    }

    /// Write a pre-formatted string verbatim to the run stream.
    pub(crate) fn write_raw(&self, msg: &str) {
        match &self.kind {
            Kind::Empty => {}
            Kind::Console(out) => write_console(&mut *out.lock(), msg),
            Kind::ColorConsole(out) => write_console(&mut *out.lock(), msg),
            Kind::File { server, .. } => write_file(server, msg.to_string()),
            Kind::Combo(writers) => {
                for w in writers {
                    w.write_raw(msg);
                }
            }
        }
    }
}

fn write_console<W: std::io::Write>(out: &mut W, line: &str) {
    if let Err(e) = out.write_all(line.as_bytes()).and_then(|()| out.flush()) {
        eprintln!("failed to write log record to stdout: {e}");
    }
}

fn write_file(file: &RotatingFile, line: String) {
    if let Err(e) = file.write(line.into_bytes()) {
        eprintln!("{e}");
    }
}

fn level_color(level: Level) -> Option<ColorSpec> {
    let mut spec = ColorSpec::new();
    match level {
        Level::Trace => spec.set_fg(Some(Color::Cyan)).set_intense(true),
        Level::Debug => spec.set_fg(Some(Color::Green)),
        Level::Info => spec.set_fg(Some(Color::Cyan)),
        Level::Warn => spec.set_fg(Some(Color::Yellow)),
        Level::Error => spec.set_fg(Some(Color::Red)),
        Level::Disable => return None,
    };
    Some(spec)
}

/// Colour only the level tag; when stdout is not a terminal this degrades
/// to the plain console layout.
fn write_colored(out: &mut StandardStream, level: Level, msg: &str) {
    let spec = if std::io::stdout().is_terminal() {
        level_color(level)
    } else {
        None
    };

    let Some(spec) = spec else {
        write_console(out, &format::format_plain_text(level.tag(), msg));
        return;
    };

    let result = out
        .write_all(b"[")
        .and_then(|()| out.set_color(&spec))
        .and_then(|()| out.write_all(level.tag().as_bytes()))
        .and_then(|()| out.reset())
        .and_then(|()| writeln!(out, "] {} {msg}", format::timestamp()))
        .and_then(|()| out.flush());
    if let Err(e) = result {
        eprintln!("failed to write log record to stdout: {e}");
    }
}

/// Process-wide active writer.
static WRITER: RwLock<Option<Arc<Writer>>> = RwLock::new(None);

/// The installed writer, installing an empty writer first if none exists.
pub(crate) fn get_writer() -> Arc<Writer> {
    if let Some(w) = WRITER.read().clone() {
        return w;
    }
    store_if_none(Arc::new(Writer::empty()))
}

fn store_if_none(writer: Arc<Writer>) -> Arc<Writer> {
    let mut guard = WRITER.write();
    guard.get_or_insert(writer).clone()
}

pub(crate) fn set_writer(writer: Arc<Writer>) {
    *WRITER.write() = Some(writer);
}

pub(crate) fn swap_writer(writer: Option<Arc<Writer>>) -> Option<Arc<Writer>> {
    std::mem::replace(&mut *WRITER.write(), writer)
}

/// Tee an additional writer onto the active one. With nothing installed the
/// new writer simply becomes active; otherwise the two are wrapped in an
/// ordered combo.
pub fn add_writer(writer: Writer) {
    match swap_writer(None) {
        None => set_writer(Arc::new(writer)),
        Some(existing) => {
            set_writer(Arc::new(Writer::combo(vec![existing, Arc::new(writer)])));
        }
    }
}
