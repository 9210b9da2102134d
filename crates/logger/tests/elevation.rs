//! Elevation-timer behaviour: temporary level raise, automatic restore,
//! cancellation on re-arm, and the permanent setting
//!
//! Single test function: the timer works against process-wide level state.

use parking_lot::Mutex;
use quill_logger::{
    get_level, get_open_time, init_with_config, set_level_str, set_open_time, Config, Level,
    OpenTime,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn elevation_timer_lifecycle() {
    init_with_config(Config {
        mode: "console".into(),
        level: "ERR".into(),
        ..Config::default()
    })
    .unwrap();
    assert_eq!(get_level(), Level::Error);

    // Temporary raise restores the initialization snapshot on expiry.
    let restored: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let restored_clone = Arc::clone(&restored);

    set_level_str("DEB");
    assert_eq!(get_level(), Level::Debug);

    set_open_time(
        Duration::from_secs(1),
        Some(Box::new(move |level| {
            *restored_clone.lock() = Some(level.to_string());
        })),
    );
    assert_eq!(get_open_time(), OpenTime::Active(Duration::from_secs(1)));

    std::thread::sleep(Duration::from_millis(1300));

    assert_eq!(get_level(), Level::Error, "level was not restored");
    assert_eq!(get_open_time(), OpenTime::Expired);
    assert_eq!(restored.lock().as_deref(), Some("ERR"));

    // Re-arming cancels the previous timer.
    set_level_str("TRA");
    set_open_time(Duration::from_millis(100), None);
    set_open_time(Duration::from_secs(5), None);
    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(
        get_level(),
        Level::Trace,
        "cancelled timer still restored the level"
    );
    assert_eq!(get_open_time(), OpenTime::Active(Duration::from_secs(5)));

    // Zero duration cancels the timer and keeps the level for good.
    set_open_time(Duration::ZERO, None);
    assert_eq!(get_open_time(), OpenTime::Permanent);
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(get_level(), Level::Trace);
}
