//! One-shot initialization of the process-wide logging state

use crate::config::{Config, MODE_FILE, ROTATION_SIZE};
use crate::elevate;
use crate::error::Error;
use crate::format;
use crate::level::{self, Level};
use crate::runtime::runtime;
use crate::writer::{add_writer, set_writer, swap_writer, Writer};
use quill_logger_file::{RotateRule, RotatingFile};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const BACKUP_DELIMITER: &str = "-";
const SERVER_FILENAME: &str = "server.log";
const MANAGER_FILENAME: &str = "manager.log";

/// One-shot latch: multiple services in one process may each call
/// `init_with_config`; only the first successful call configures anything.
static SETUP_DONE: AtomicBool = AtomicBool::new(false);

/// Validate the configuration and install the logging pipeline.
///
/// In `file` mode this opens the run-stream and access-stream rotating
/// files; in `console` mode records go to standard output, coloured when
/// requested. With `to_console` set, file mode additionally tees every
/// record to standard output. Repeated calls after a successful setup are
/// ignored, apart from refreshing the level snapshot the elevation timer
/// restores to.
pub fn init_with_config(config: Config) -> Result<(), Error> {
    config.validate()?;

    elevate::set_default_level(config.level.parse::<Level>().unwrap_or(Level::Error));

    if SETUP_DONE.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    if let Ok(parsed) = config.level.parse::<Level>() {
        level::set_level(parsed);
    }
    format::set_max_content_length(config.max_content_length);

    let result = if config.mode == MODE_FILE {
        setup_with_files(&config)
    } else {
        setup_with_console(&config);
        Ok(())
    };

    if let Err(e) = result {
        SETUP_DONE.store(false, Ordering::SeqCst);
        return Err(e);
    }

    if config.to_console && config.mode == MODE_FILE {
        add_writer(Writer::console());
    }

    Ok(())
}

fn setup_with_console(config: &Config) {
    if config.color_console {
        set_writer(Arc::new(Writer::color_console()));
    } else {
        set_writer(Arc::new(Writer::console()));
    }
}

fn setup_with_files(config: &Config) -> Result<(), Error> {
    if config.server_log_dir.is_empty() || config.manager_log_dir.is_empty() {
        return Err(Error::LogPathUnset);
    }

    let server_file = stream_file(&config.server_log_dir, &config.service_name, SERVER_FILENAME);
    let manager_file = stream_file(
        &config.manager_log_dir,
        &config.service_name,
        MANAGER_FILENAME,
    );

    // The engine spawns its workers onto the ambient runtime.
    let _guard = runtime().enter();
    let server = RotatingFile::new(&server_file, make_rule(config, &server_file), config.compress)?;
    let manager = RotatingFile::new(
        &manager_file,
        make_rule(config, &manager_file),
        config.compress,
    )?;

    set_writer(Arc::new(Writer::file(server, manager)));
    Ok(())
}

fn stream_file(dir: &str, service_name: &str, filename: &str) -> PathBuf {
    Path::new(dir).join(format!("{service_name}_{filename}"))
}

fn make_rule(config: &Config, file: &Path) -> RotateRule {
    if config.rotation == ROTATION_SIZE {
        RotateRule::size_limit(
            file,
            BACKUP_DELIMITER,
            config.keep_days,
            u64::from(config.max_size),
            config.max_backups as usize,
            config.compress,
        )
    } else {
        RotateRule::daily(file, BACKUP_DELIMITER, config.keep_days, config.compress)
    }
}

/// Tear the pipeline down: the active writer is swapped out and closed,
/// draining queued records to disk. Close failures are reported to stderr.
pub fn uninit() {
    if let Some(writer) = swap_writer(None) {
        if let Err(e) = writer.close() {
            eprintln!("failed to close log writer: {e}");
        }
    }
}

/// Return the process-wide logging state to its pristine form so a test
/// can run its own initialization.
#[doc(hidden)]
pub fn reset() {
    uninit();
    SETUP_DONE.store(false, Ordering::SeqCst);
    level::set_level(Level::Error);
    format::set_max_content_length(0);
}
