//! File-mode end-to-end: size rotation on both streams, retention bounds,
//! level-gate behaviour against live files, and the console tee
#![cfg(unix)]

use quill_logger::{
    get_access_log, get_run_log, init_with_config, set_level, uninit, Config, Level,
};
use std::time::Duration;
use tempfile::TempDir;

fn entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Point fd 1 at `path` for the duration of the closure, restoring the
/// real stdout afterwards. Writes through `std::io::stdout()` go straight
/// to fd 1, so the sink file sees exactly what a terminal would.
fn with_captured_stdout<F: FnOnce()>(path: &std::path::Path, f: F) {
    use std::io::Write;
    use std::os::unix::io::AsRawFd;

    let sink = std::fs::File::create(path).unwrap();
    std::io::stdout().flush().unwrap();

    // SAFETY: duplicating fd 1 aside and pointing it at the sink; the
    // saved copy is restored and closed before returning.
    let saved = unsafe { libc::dup(1) };
    assert!(saved >= 0, "dup(1) failed");
    assert!(
        unsafe { libc::dup2(sink.as_raw_fd(), 1) } >= 0,
        "dup2 to sink failed"
    );

    f();
    std::io::stdout().flush().unwrap();

    assert!(unsafe { libc::dup2(saved, 1) } >= 0, "dup2 restore failed");
    unsafe { libc::close(saved) };
}

#[test]
fn dual_stream_rotation_and_level_gate() {
    let server_dir = TempDir::new().unwrap();
    let manager_dir = TempDir::new().unwrap();

    init_with_config(Config {
        service_name: "svc".into(),
        mode: "file".into(),
        server_log_dir: server_dir.path().to_string_lossy().into_owned(),
        manager_log_dir: manager_dir.path().to_string_lossy().into_owned(),
        level: "ERR".into(),
        rotation: "size".into(),
        max_size: 1,
        max_backups: 3,
        compress: true,
        // Tee through a combo writer so the fan-out path is exercised too.
        to_console: true,
        ..Config::default()
    })
    .unwrap();

    let rlog = get_run_log("rotation-test");
    let alog = get_access_log();
    let padding = "x".repeat(3000);
    for i in 0..1000 {
        rlog.error(format!("run record #{i}: {padding}"));
        alog.record(format!("access record #{i}: {padding}"));
        std::thread::sleep(Duration::from_micros(100));
    }

    std::thread::sleep(Duration::from_secs(1));

    for (label, dir, active) in [
        ("server", server_dir.path(), "svc_server.log"),
        ("manager", manager_dir.path(), "svc_manager.log"),
    ] {
        let names = entries(dir);
        assert!(
            names.contains(&active.to_string()),
            "{label}: active file missing from {names:?}"
        );
        assert!(
            names.len() <= 4,
            "{label}: expected at most 1 active + 3 archives, got {names:?}"
        );
        assert!(
            names.len() >= 2,
            "{label}: no rotation happened: {names:?}"
        );
    }

    // Run records carry the level bracket; access records do not.
    let server_active = server_dir.path().join("svc_server.log");
    let manager_active = manager_dir.path().join("svc_manager.log");
    let server_content = std::fs::read_to_string(&server_active).unwrap();
    let manager_content = std::fs::read_to_string(&manager_active).unwrap();
    assert!(server_content.lines().all(|l| l.starts_with("[ERR] ")));
    assert!(manager_content.lines().all(|l| !l.starts_with('[')));

    // OFF suppresses leveled methods but not access records.
    set_level(Level::Disable);
    std::thread::sleep(Duration::from_millis(300));
    let server_len = std::fs::metadata(&server_active).unwrap().len();
    let manager_len = std::fs::metadata(&manager_active).unwrap().len();

    rlog.error("must not appear");
    alog.record("must appear");
    std::thread::sleep(Duration::from_millis(500));

    assert_eq!(
        std::fs::metadata(&server_active).unwrap().len(),
        server_len,
        "leveled record leaked through OFF"
    );
    assert!(
        std::fs::metadata(&manager_active).unwrap().len() > manager_len,
        "access record was suppressed by OFF"
    );

    // Combo tee: one info call produces one line in the server archive and
    // an identical line on stdout. The two fan-out members stamp the
    // record independently, so a call straddling a millisecond boundary
    // can legitimately differ; retry a few times before declaring failure.
    set_level(Level::Info);
    let capture_dir = TempDir::new().unwrap();
    let capture_path = capture_dir.path().join("stdout.txt");
    let mut matched = false;
    for _ in 0..5 {
        with_captured_stdout(&capture_path, || rlog.info("combo tee probe"));
        std::thread::sleep(Duration::from_millis(500));

        let captured = std::fs::read_to_string(&capture_path).unwrap();
        let console_lines: Vec<&str> = captured.lines().collect();
        assert_eq!(
            console_lines.len(),
            1,
            "expected exactly one line on stdout, got {captured:?}"
        );
        let console_line = console_lines[0];
        assert!(
            console_line.starts_with("[INF] "),
            "unexpected stdout line: {console_line}"
        );

        let server_content = std::fs::read_to_string(&server_active).unwrap();
        let file_line = server_content
            .lines()
            .rev()
            .find(|l| l.contains("combo tee probe"))
            .expect("probe line missing from server archive");

        if console_line == file_line {
            matched = true;
            break;
        }
    }
    assert!(
        matched,
        "stdout line never matched the server archive line byte-for-byte"
    );

    set_level(Level::Error);
    uninit();
    // Writes after teardown hit the freshly installed empty writer.
    rlog.error("after close");
}
