//! Dual-stream leveled logging over rotating files
//!
//! The library produces two categorical streams: a *run* stream of leveled
//! application records and an *access* stream of unleveled, timestamped
//! request records. Both are backed by the `quill-logger-file` engine,
//! which handles rotation, compression, retention and recovery from
//! file-system faults.
//!
//! ```no_run
//! use quill_logger::{init_with_config, get_run_log, get_access_log, Config};
//!
//! init_with_config(Config {
//!     service_name: "gateway".into(),
//!     mode: "file".into(),
//!     server_log_dir: "/var/log/gateway".into(),
//!     manager_log_dir: "/var/log/gateway".into(),
//!     level: "INF".into(),
//!     rotation: "size".into(),
//!     max_size: 64,
//!     max_backups: 8,
//!     compress: true,
//!     ..Config::default()
//! })?;
//!
//! let log = get_run_log("session");
//! log.info("listener up");
//! log.with_trace_id("f3a9").warn("slow handshake");
//!
//! get_access_log().record("GET /status 200");
//! # Ok::<(), quill_logger::Error>(())
//! ```

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod config;
mod crossproc;
mod elevate;
mod error;
mod format;
mod level;
mod logger;
mod runtime;
mod setup;
mod writer;

pub use config::Config;
pub use crossproc::{
    get_child_log, pop_child_record, write_child_record, ChildLogger, ChildRecord,
};
pub use elevate::{get_open_time, set_open_time, OpenTime};
pub use error::Error;
pub use level::{
    check_level_str, get_level, get_level_str, set_level, set_level_str, shall_log, InvalidLevel,
    Level,
};
pub use logger::{
    get_access_log, get_run_log, time_track_debug, time_track_info, time_track_trace,
    AccessLogger, RunLogger, TimeTrack,
};
pub use setup::{init_with_config, reset, uninit};
pub use writer::{add_writer, Writer};
