//! The rotating file writer: a single-consumer pipeline over a bounded
//! record queue
//!
//! [`RotatingFile::write`] is the producer entry point and never blocks the
//! caller beyond one non-blocking channel send. A dedicated consumer task
//! owns the active file descriptor: it rotates when the rule says so, writes
//! the record, and on failure parks on the health checker until the file is
//! usable again. A second task services compression retries and runs the
//! periodic retention sweep; the health task watches for write errors and
//! file disappearance.

use crate::compress;
use crate::error::{Error, Result};
use crate::fs;
use crate::health;
use crate::rule::RotateRule;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const RECORD_QUEUE_CAPACITY: usize = 1000;
const RETRY_COMPRESS_CAPACITY: usize = 100;
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// State guarded by one mutex: the active descriptor, the byte count since
/// the last open or rotation, and the pending archive name. The consumer is
/// the only writer outside of recovery; the health checker touches it only
/// while the consumer is parked.
#[derive(Default)]
pub(crate) struct FileState {
    pub(crate) file: Option<File>,
    pub(crate) size: u64,
    pub(crate) backup: Option<PathBuf>,
}

pub(crate) struct Shared {
    pub(crate) path: PathBuf,
    pub(crate) compress: bool,
    pub(crate) rule: Mutex<RotateRule>,
    pub(crate) state: Mutex<FileState>,
    pub(crate) cancel: CancellationToken,
    pub(crate) retry_tx: mpsc::Sender<PathBuf>,
    pub(crate) health_tx: mpsc::Sender<io::Error>,
    pub(crate) recover_tx: mpsc::Sender<()>,
}

/// A log file that rotates, compresses and prunes its own archives.
pub struct RotatingFile {
    shared: Arc<Shared>,
    sender: mpsc::Sender<Vec<u8>>,
    done_rx: Mutex<std_mpsc::Receiver<std::result::Result<(), String>>>,
    close_state: Mutex<Option<std::result::Result<(), String>>>,
}

impl RotatingFile {
    /// Open (or create) the active file and start the consumer, compression
    /// and health workers.
    ///
    /// Must be called from within a Tokio runtime context; the workers are
    /// spawned onto the ambient runtime.
    pub fn new(path: impl Into<PathBuf>, rule: RotateRule, compress: bool) -> Result<Self> {
        let path = path.into();
        fs::validate_path(&path)?;

        let (sender, receiver) = mpsc::channel(RECORD_QUEUE_CAPACITY);
        let (retry_tx, retry_rx) = mpsc::channel(RETRY_COMPRESS_CAPACITY);
        let (health_tx, health_rx) = mpsc::channel(1);
        let (recover_tx, recover_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = std_mpsc::sync_channel(1);

        let shared = Arc::new(Shared {
            path,
            compress,
            rule: Mutex::new(rule),
            state: Mutex::new(FileState::default()),
            cancel: CancellationToken::new(),
            retry_tx,
            health_tx,
            recover_tx,
        });

        {
            let mut state = shared.state.lock();
            initialize(&shared, &mut state)?;
        }

        tokio::spawn(run_consumer(shared.clone(), receiver, recover_rx, done_tx));
        tokio::spawn(run_compressor(shared.clone(), retry_rx));
        tokio::spawn(health::run_health(shared.clone(), health_rx));

        Ok(Self {
            shared,
            sender,
            done_rx: Mutex::new(done_rx),
            close_state: Mutex::new(None),
        })
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Enqueue one encoded record.
    ///
    /// Returns the number of bytes accepted: `data.len()` when the record
    /// was queued, `0` when the queue is full and the record was shed.
    /// After [`close`](Self::close) the record is dumped to stderr and
    /// [`Error::Closed`] is returned.
    pub fn write(&self, data: Vec<u8>) -> Result<usize> {
        let len = data.len();
        if self.shared.cancel.is_cancelled() {
            eprint!("{}", String::from_utf8_lossy(&data));
            return Err(Error::Closed);
        }
        match self.sender.try_send(data) {
            Ok(()) => Ok(len),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(0),
            Err(mpsc::error::TrySendError::Closed(data)) => {
                eprint!("{}", String::from_utf8_lossy(&data));
                Err(Error::Closed)
            }
        }
    }

    /// Stop the workers, drain the queue, flush and close the active file.
    ///
    /// Idempotent: repeated calls return the outcome of the first one.
    pub fn close(&self) -> Result<()> {
        let mut close_state = self.close_state.lock();
        if let Some(outcome) = close_state.as_ref() {
            return outcome.clone().map_err(Error::Close);
        }

        self.shared.cancel.cancel();
        let outcome = match self.done_rx.lock().recv_timeout(CLOSE_TIMEOUT) {
            Ok(result) => result,
            Err(_) => Err("timed out waiting for the log writer to drain".to_string()),
        };

        *close_state = Some(outcome.clone());
        outcome.map_err(Error::Close)
    }
}

/// Create the directory and active file if needed, or reopen for append,
/// seeding the size from the existing file. Also refreshes the pending
/// archive name from the rule.
pub(crate) fn initialize(shared: &Shared, state: &mut FileState) -> Result<()> {
    state.backup = Some(shared.rule.lock().backup_file_name());

    match std::fs::metadata(&shared.path) {
        Err(_) => {
            if let Some(parent) = shared.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            state.file = Some(fs::create(&shared.path)?);
            state.size = 0;
        }
        Ok(meta) => {
            state.file = Some(fs::open_append(&shared.path)?);
            state.size = meta.len();
        }
    }
    Ok(())
}

enum WriteAttempt {
    Done,
    Blocked,
}

async fn run_consumer(
    shared: Arc<Shared>,
    mut receiver: mpsc::Receiver<Vec<u8>>,
    mut recover_rx: mpsc::Receiver<()>,
    done_tx: std_mpsc::SyncSender<std::result::Result<(), String>>,
) {
    loop {
        tokio::select! {
            maybe = receiver.recv() => match maybe {
                Some(data) => write_record(&shared, &mut recover_rx, data).await,
                None => break,
            },
            _ = shared.cancel.cancelled() => {
                // Bounded drain: whatever is already queued still gets a
                // write attempt before the file is closed.
                while let Ok(data) = receiver.try_recv() {
                    write_record(&shared, &mut recover_rx, data).await;
                }
                break;
            }
        }
    }

    let _ = done_tx.send(finalize(&shared));
}

/// Rotate if due, then write; on failure report to health and park until
/// recovery. The retry loop is unbounded: a full disk is expected to be
/// fixed out-of-band.
async fn write_record(shared: &Arc<Shared>, recover_rx: &mut mpsc::Receiver<()>, data: Vec<u8>) {
    loop {
        match attempt_write(shared, &data) {
            WriteAttempt::Done => return,
            WriteAttempt::Blocked => {
                let recovered = tokio::select! {
                    token = recover_rx.recv() => token.is_some(),
                    _ = shared.cancel.cancelled() => false,
                };
                if !recovered {
                    // Shutdown while unhealthy: abandon this record.
                    return;
                }
            }
        }
    }
}

fn attempt_write(shared: &Arc<Shared>, data: &[u8]) -> WriteAttempt {
    let mut state = shared.state.lock();
    let mut rule = shared.rule.lock();

    if rule.shall_rotate(state.size + data.len() as u64) {
        match rotate(shared, &mut state, &rule) {
            Ok(()) => {
                rule.mark_rotated();
                state.size = 0;
            }
            Err(e) => eprintln!("log rotation failed for {:?}: {e}", shared.path),
        }
    }
    drop(rule);

    if let Some(file) = state.file.as_mut() {
        match file.write_all(data) {
            Ok(()) => {
                state.size += data.len() as u64;
                return WriteAttempt::Done;
            }
            Err(e) => {
                let _ = shared.health_tx.try_send(e);
            }
        }
    }
    WriteAttempt::Blocked
}

/// Close the descriptor, rename the active file to the pending archive
/// name, kick off async compression and a retention sweep, then start a
/// fresh active file.
fn rotate(shared: &Arc<Shared>, state: &mut FileState, rule: &RotateRule) -> Result<()> {
    if let Some(file) = state.file.take() {
        drop(file);
    }

    if shared.path.exists() {
        if let Some(backup) = state.backup.clone() {
            std::fs::rename(&shared.path, &backup)?;
            spawn_post_rotate(shared, backup);
        }
    }

    state.backup = Some(rule.backup_file_name());
    state.file = Some(fs::create(&shared.path)?);
    Ok(())
}

/// Post-rotate work runs off the consumer: best-effort compression with one
/// retry slot, then a retention sweep. Failures are logged and never stop
/// the writer.
fn spawn_post_rotate(shared: &Arc<Shared>, backup: PathBuf) {
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        if needs_compress_retry(&shared, &backup).await {
            let _ = shared.retry_tx.send(backup).await;
        }
        delete_outdated(&shared);
    });
}

async fn needs_compress_retry(shared: &Arc<Shared>, file: &Path) -> bool {
    if !shared.compress || !file.exists() {
        return false;
    }
    match compress_archive(file.to_path_buf()).await {
        Ok(()) => false,
        Err(e) => {
            eprintln!("failed to compress archive {file:?}: {e}");
            true
        }
    }
}

async fn compress_archive(path: PathBuf) -> Result<()> {
    match tokio::task::spawn_blocking(move || compress::gzip_file(&path)).await {
        Ok(result) => result,
        Err(join_err) => Err(Error::Compress(format!(
            "compression task panicked: {join_err}"
        ))),
    }
}

/// One retention sweep: evaluate the rule's outdated set and unlink each
/// member. Works on a clone of the rule so the consumer is not stalled on
/// the rule lock while the directory is scanned.
fn delete_outdated(shared: &Arc<Shared>) {
    let rule = shared.rule.lock().clone();
    for file in rule.outdated_files() {
        if let Err(e) = fs::remove(&file) {
            eprintln!("failed to remove outdated log file {file:?}: {e}");
        }
    }
}

async fn run_compressor(shared: Arc<Shared>, mut retry_rx: mpsc::Receiver<PathBuf>) {
    let mut sweep = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    enqueue_uncompressed(&shared);

    loop {
        tokio::select! {
            maybe = retry_rx.recv() => match maybe {
                Some(path) => {
                    // Free space first, then retry the compression.
                    delete_outdated(&shared);
                    if path.exists() {
                        if let Err(e) = compress_archive(path.clone()).await {
                            eprintln!("compression retry failed for {path:?}: {e}");
                        }
                    }
                }
                None => return,
            },
            _ = sweep.tick() => delete_outdated(&shared),
            _ = shared.cancel.cancelled() => return,
        }
    }
}

/// Pre-existing uncompressed archives (e.g. from a crash before compression
/// finished) are fed through the retry queue at startup. Overflow beyond
/// the queue capacity is silently dropped.
fn enqueue_uncompressed(shared: &Arc<Shared>) {
    if !shared.compress {
        return;
    }
    let rule = shared.rule.lock().clone();
    for file in rule.uncompressed_archives() {
        let _ = shared.retry_tx.try_send(file);
    }
}

fn finalize(shared: &Arc<Shared>) -> std::result::Result<(), String> {
    let mut state = shared.state.lock();
    if let Some(file) = state.file.take() {
        file.sync_all().map_err(|e| e.to_string())?;
    }
    Ok(())
}
