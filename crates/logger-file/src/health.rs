//! Health checking and transparent recovery for the rotating writer
//!
//! One worker observes two signals: write errors reported by the consumer
//! (capacity-one channel, at most one outstanding incident) and a one-second
//! existence probe on the active file. Either drives `try_recover`, which
//! keeps attempting a test write until the file is usable again, then wakes
//! the parked consumer through the recover channel.

use crate::error::Result;
use crate::writer::{initialize, Shared};
use crate::RECORD_TIME_FORMAT;
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const EXISTENCE_PROBE_INTERVAL: Duration = Duration::from_secs(1);
const RECOVER_RETRY_DELAY: Duration = Duration::from_secs(1);

pub(crate) async fn run_health(shared: Arc<Shared>, mut health_rx: mpsc::Receiver<io::Error>) {
    let mut probe = tokio::time::interval(EXISTENCE_PROBE_INTERVAL);

    loop {
        tokio::select! {
            maybe = health_rx.recv() => match maybe {
                Some(error) => {
                    let error_time = Utc::now();
                    eprintln!(
                        "log health check error at {}: {error}",
                        error_time.format(RECORD_TIME_FORMAT)
                    );
                    try_recover(&shared, error, error_time).await;
                }
                None => return,
            },
            _ = probe.tick() => {
                if let Err(e) = std::fs::metadata(&shared.path) {
                    if e.kind() == io::ErrorKind::NotFound {
                        let _ = shared.health_tx.try_send(io::Error::new(
                            io::ErrorKind::NotFound,
                            format!("log file does not exist: {e}"),
                        ));
                    }
                }
            }
            _ = shared.cancel.cancelled() => return,
        }
    }
}

/// Retry a banner write every second until it succeeds, then hand the
/// consumer a recover token. The token send is non-blocking; a pending
/// token means the consumer has not caught up yet and needs no second one.
async fn try_recover(shared: &Arc<Shared>, last_error: io::Error, error_time: DateTime<Utc>) {
    loop {
        let banner = recovery_banner(&last_error, error_time);
        if test_write(shared, banner.as_bytes()).is_ok() {
            let _ = shared.recover_tx.try_send(());
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(RECOVER_RETRY_DELAY) => {}
            _ = shared.cancel.cancelled() => return,
        }
    }
}

/// The record announcing a completed recovery, carrying the original error
/// and the outage duration.
fn recovery_banner(last_error: &io::Error, error_time: DateTime<Utc>) -> String {
    let outage = (Utc::now() - error_time).to_std().unwrap_or_default();
    format!(
        "[ERR] {} [quill] system recovered from({}:{:?}), outage duration: {outage:?}\n",
        Utc::now().format(RECORD_TIME_FORMAT),
        error_time.format(RECORD_TIME_FORMAT),
        last_error.to_string(),
    )
}

/// Prove the file is writable again. Re-initializes when the descriptor is
/// gone, and drops a stale descriptor when the path has vanished from disk
/// (deletion or rename from outside).
fn test_write(shared: &Arc<Shared>, banner: &[u8]) -> Result<()> {
    let mut state = shared.state.lock();

    if state.file.is_none() {
        initialize(shared, &mut state)?;
    }

    if !shared.path.exists() {
        state.file = None;
        initialize(shared, &mut state)?;
    }

    match state.file.as_mut() {
        Some(file) => Ok(file.write_all(banner)?),
        None => Err(io::Error::other("log file not open after re-initialization").into()),
    }
}
