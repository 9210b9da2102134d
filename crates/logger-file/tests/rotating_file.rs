//! End-to-end tests for the rotating file writer

use quill_logger_file::{Error, RotateRule, RotatingFile};
use std::time::Duration;
use tempfile::TempDir;

fn entry_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn size_rotation_bounds_the_archive_set() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("svc_server.log");
    let rule = RotateRule::size_limit(&active, "-", 0, 1, 3, true);
    let file = RotatingFile::new(&active, rule, true).unwrap();

    let line = format!("[ERR] 2026-08-02T00:00:00.000Z [test] {}\n", "x".repeat(2000));
    for _ in 0..1000 {
        file.write(line.clone().into_bytes()).unwrap();
        // Keep the producer slightly behind the consumer so the bounded
        // queue does not shed most of the records.
        tokio::time::sleep(Duration::from_micros(200)).await;
    }

    tokio::time::sleep(Duration::from_secs(1)).await;

    let names = entry_names(dir.path());
    assert!(
        names.contains(&"svc_server.log".to_string()),
        "active file missing from {names:?}"
    );
    assert!(
        names.len() <= 4,
        "expected at most 1 active + 3 archives, got {names:?}"
    );
    let archives: Vec<&String> = names.iter().filter(|n| *n != "svc_server.log").collect();
    assert!(!archives.is_empty(), "no rotation happened: {names:?}");
    for pair in archives.windows(2) {
        assert!(pair[0] < pair[1], "archive names out of order: {names:?}");
    }

    file.close().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn startup_sweep_removes_archives_past_keep_days() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("svc_server.log");

    let dated = |days: i64| {
        let date = (chrono::Utc::now() - chrono::Duration::days(days)).format("%Y-%m-%d");
        dir.path().join(format!("svc_server.log-{date}"))
    };
    std::fs::write(dated(5), b"old\n").unwrap();
    std::fs::write(dated(3), b"old\n").unwrap();
    std::fs::write(dated(1), b"recent\n").unwrap();

    let rule = RotateRule::daily(&active, "-", 2, false);
    let file = RotatingFile::new(&active, rule, false).unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(!dated(5).exists(), "5-day-old archive should be gone");
    assert!(!dated(3).exists(), "3-day-old archive should be gone");
    assert!(dated(1).exists(), "1-day-old archive should survive");
    assert!(active.exists());

    file.close().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn recovers_after_external_deletion() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("svc_server.log");
    let rule = RotateRule::daily(&active, "-", 0, false);
    let file = RotatingFile::new(&active, rule, false).unwrap();

    file.write(b"pre\n".to_vec()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    std::fs::remove_file(&active).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    file.write(b"post\n".to_vec()).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(active.exists(), "active file was not re-created");
    let content = std::fs::read_to_string(&active).unwrap();
    assert!(
        content.contains("system recovered from"),
        "no recovery banner in: {content}"
    );
    assert!(content.contains("post\n"), "post-outage record lost: {content}");

    file.close().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_is_idempotent_and_rejects_writes() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("svc_server.log");
    let rule = RotateRule::daily(&active, "-", 0, false);
    let file = RotatingFile::new(&active, rule, false).unwrap();

    assert_eq!(file.write(b"last words\n".to_vec()).unwrap(), 11);

    file.close().unwrap();
    assert!(matches!(file.write(b"too late\n".to_vec()), Err(Error::Closed)));
    file.close().unwrap();

    let content = std::fs::read_to_string(&active).unwrap();
    assert!(content.contains("last words"), "queued record lost on close");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pre_existing_archives_are_compressed_at_startup() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("svc_server.log");
    let stale = dir
        .path()
        .join("svc_server-2026-01-01T00.00.00.000000000Z.log");
    std::fs::write(&stale, b"left over from a crash\n").unwrap();

    let rule = RotateRule::size_limit(&active, "-", 0, 1, 5, true);
    let file = RotatingFile::new(&active, rule, true).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut gz = stale.clone().into_os_string();
    gz.push(".gz");
    assert!(
        std::path::Path::new(&gz).exists(),
        "stale archive was not compressed: {:?}",
        entry_names(dir.path())
    );
    assert!(!stale.exists(), "uncompressed source should be removed");

    file.close().unwrap();
}
