//! Logging configuration and validation

use crate::error::Error;
use crate::level;

pub(crate) const MODE_FILE: &str = "file";
pub(crate) const MODE_CONSOLE: &str = "console";
pub(crate) const ROTATION_SIZE: &str = "size";
pub(crate) const ROTATION_TIME: &str = "time";
pub(crate) const ROTATION_DAILY: &str = "daily";

const MIN_LOG_SIZE_MIB: u32 = 1;
const MAX_LOG_SIZE_MIB: u32 = 1024;
const MAX_BACKUP_COUNT: u32 = 100;

/// Logging configuration.
///
/// String fields use the wire vocabulary: mode `file`/`console`, rotation
/// `size`/`time`/`daily`, level `TRA`/`DEB`/`INF`/`WAR`/`ERR`/`OFF`
/// (case-insensitive). Empty strings select the defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service name used as the log file prefix; may be empty.
    pub service_name: String,
    /// Output mode: `file` or `console`.
    pub mode: String,
    /// Directory for the run (server) stream; required in file mode.
    pub server_log_dir: String,
    /// Directory for the access (manager) stream; required in file mode.
    pub manager_log_dir: String,
    /// Minimum enabled level; defaults to `ERR`.
    pub level: String,
    /// Maximum string payload length in bytes; 0 disables truncation.
    pub max_content_length: u32,
    /// Gzip archives after rotation.
    pub compress: bool,
    /// Archive retention in days; 0 retains everything.
    pub keep_days: u32,
    /// Archive retention by count (size rotation only); 0 retains everything.
    pub max_backups: u32,
    /// Per-file size cap in MiB (size rotation only); 0 disables.
    pub max_size: u32,
    /// Rotation rule: `size`, or `time`/`daily`.
    pub rotation: String,
    /// Also tee records to standard output in file mode.
    pub to_console: bool,
    /// Colour the level tag in console mode when stdout is a terminal.
    pub color_console: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            mode: MODE_CONSOLE.to_string(),
            server_log_dir: String::new(),
            manager_log_dir: String::new(),
            level: "ERR".to_string(),
            max_content_length: 0,
            compress: false,
            keep_days: 0,
            max_backups: 0,
            max_size: 0,
            rotation: ROTATION_DAILY.to_string(),
            to_console: false,
            color_console: false,
        }
    }
}

impl Config {
    /// Check the configuration for internally inconsistent or out-of-range
    /// values.
    pub fn validate(&self) -> Result<(), Error> {
        if self.mode == MODE_FILE {
            if self.server_log_dir.is_empty() {
                return Err(Error::Config(
                    "server log directory cannot be empty in file mode".to_string(),
                ));
            }
            if self.manager_log_dir.is_empty() {
                return Err(Error::Config(
                    "manager log directory cannot be empty in file mode".to_string(),
                ));
            }
        }

        if self.max_size > 0
            && !(MIN_LOG_SIZE_MIB..=MAX_LOG_SIZE_MIB).contains(&self.max_size)
        {
            return Err(Error::Config(format!(
                "invalid max size: {}, should be between {MIN_LOG_SIZE_MIB} and {MAX_LOG_SIZE_MIB} MiB",
                self.max_size
            )));
        }

        if self.max_backups > MAX_BACKUP_COUNT {
            return Err(Error::Config(format!(
                "invalid max backups: {}, should be between 1 and {MAX_BACKUP_COUNT}",
                self.max_backups
            )));
        }

        if !self.level.is_empty() {
            if let Err(e) = level::check_level_str(&self.level) {
                return Err(Error::Config(format!(
                    "{e}, valid levels are: TRA,DEB,INF,WAR,ERR,OFF"
                )));
            }
        }

        if !self.rotation.is_empty()
            && self.rotation != ROTATION_SIZE
            && self.rotation != ROTATION_TIME
            && self.rotation != ROTATION_DAILY
        {
            return Err(Error::Config(format!(
                "invalid rotation: {}, should be '{ROTATION_SIZE}', '{ROTATION_TIME}' or '{ROTATION_DAILY}'",
                self.rotation
            )));
        }

        if !self.mode.is_empty() && self.mode != MODE_FILE && self.mode != MODE_CONSOLE {
            return Err(Error::Config(format!(
                "invalid mode: {}, should be either '{MODE_FILE}' or '{MODE_CONSOLE}'",
                self.mode
            )));
        }

        Ok(())
    }
}
