//! Temporary level elevation with automatic restore
//!
//! `set_open_time` arms a single one-shot timer; when it fires, the level
//! snapshot captured at the most recent initialization is restored. All
//! timer-state transitions are serialized by one mutex.

use crate::level::{self, set_level, Level};
use crate::logger::get_run_log;
use crate::runtime::runtime;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Reported elevation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTime {
    /// No timer armed; the current level holds until changed again.
    Permanent,
    /// A previously armed timer has fired and the level was restored.
    Expired,
    /// A timer is armed with the given duration.
    Active(Duration),
}

struct ElevateState {
    timer: Option<JoinHandle<()>>,
    current: OpenTime,
}

static STATE: Mutex<ElevateState> = Mutex::new(ElevateState {
    timer: None,
    current: OpenTime::Permanent,
});

/// Level restored when an elevation expires; captured at initialization.
static DEFAULT_LEVEL: AtomicU32 = AtomicU32::new(Level::Error as u32);

pub(crate) fn set_default_level(level: Level) {
    DEFAULT_LEVEL.store(level as u32, Ordering::Relaxed);
}

fn default_level() -> Level {
    level::from_raw(DEFAULT_LEVEL.load(Ordering::Relaxed))
}

/// Keep the currently set level for `duration`, then restore the default
/// captured at initialization and invoke `callback` with the restored
/// level's name. A newly armed timer cancels any prior one; a zero
/// duration makes the current level permanent.
pub fn set_open_time(duration: Duration, callback: Option<Box<dyn FnOnce(&str) + Send>>) {
    let mut state = STATE.lock();

    if let Some(timer) = state.timer.take() {
        timer.abort();
    }

    if duration.is_zero() {
        state.current = OpenTime::Permanent;
        drop(state);
        get_run_log("quill").info(format!(
            "log level ({}) set permanently",
            level::get_level_str()
        ));
        return;
    }

    state.current = OpenTime::Active(duration);
    let handle = runtime().spawn(async move {
        tokio::time::sleep(duration).await;

        let restored = default_level();
        get_run_log("quill").info(format!(
            "log level temporary elevation timeout, restoring ({}) to default level: {restored}",
            level::get_level_str()
        ));
        set_level(restored);

        {
            let mut state = STATE.lock();
            state.current = OpenTime::Expired;
            state.timer = None;
        }

        if let Some(callback) = callback {
            callback(restored.tag());
        }
    });
    state.timer = Some(handle);
}

/// The current elevation state.
pub fn get_open_time() -> OpenTime {
    STATE.lock().current
}
