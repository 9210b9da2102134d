//! Dedicated runtime hosting the logger's background workers

use std::sync::OnceLock;
use tokio::runtime::Runtime;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The process-global two-thread runtime the file workers and the
/// elevation timer run on. Built lazily on first use and kept for the
/// lifetime of the process.
///
/// # Panics
///
/// Panics if the runtime cannot be built, which should only happen under
/// extreme resource exhaustion.
pub(crate) fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("quill-logger")
            .enable_all()
            .build()
            .expect("failed to create logger runtime")
    })
}
