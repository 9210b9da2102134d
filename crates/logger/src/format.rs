//! Plain-text record layout and best-effort value encoding

use chrono::Utc;
use quill_logger_file::RECORD_TIME_FORMAT;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};

/// Sentinel level tag for access records; formatted without the bracketed
/// level prefix.
pub(crate) const ACCESS_TAG: &str = "access";

const NIL_ANGLE: &str = "<nil>";

/// Maximum string payload length in bytes; 0 disables truncation.
static MAX_CONTENT_LENGTH: AtomicU32 = AtomicU32::new(0);

pub(crate) fn set_max_content_length(max: u32) {
    MAX_CONTENT_LENGTH.store(max, Ordering::Relaxed);
}

/// Current UTC timestamp in the record layout.
pub(crate) fn timestamp() -> String {
    Utc::now().format(RECORD_TIME_FORMAT).to_string()
}

/// `"[" TAG "] " TIMESTAMP " " MSG "\n"`; the level bracket is omitted when
/// the tag is empty or the access sentinel.
pub(crate) fn format_plain_text(tag: &str, msg: &str) -> String {
    let mut line = String::with_capacity(tag.len() + msg.len() + 32);
    if !tag.is_empty() && tag != ACCESS_TAG {
        line.push('[');
        line.push_str(tag);
        line.push(']');
        line.push(' ');
    }
    line.push_str(&timestamp());
    line.push(' ');
    line.push_str(msg);
    line.push('\n');
    line
}

/// Truncate a string payload to the configured maximum, clamped down to a
/// character boundary. Pass-through when truncation is disabled.
pub(crate) fn truncate_payload(msg: &str) -> &str {
    let max = MAX_CONTENT_LENGTH.load(Ordering::Relaxed) as usize;
    truncate_to(msg, max)
}

fn truncate_to(msg: &str, max: usize) -> &str {
    if max == 0 || msg.len() <= max {
        return msg;
    }
    let mut end = max;
    while end > 0 && !msg.is_char_boundary(end) {
        end -= 1;
    }
    &msg[..end]
}

/// Best-effort JSON rendering of a non-string payload. A panicking
/// `Serialize` implementation yields `panic: <cause>`; an encoder error
/// yields the `<nil>` literal.
pub(crate) fn encode_value<T: Serialize>(value: &T) -> String {
    match catch_unwind(AssertUnwindSafe(|| serde_json::to_string(value))) {
        Ok(Ok(encoded)) => encoded,
        Ok(Err(_)) => NIL_ANGLE.to_string(),
        Err(cause) => format!("panic: {}", panic_message(&*cause)),
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;

    #[test]
    fn leveled_header_round_trips() {
        let line = format_plain_text("ERR", "boom in module");
        assert!(line.starts_with("[ERR] "));
        assert!(line.ends_with(" boom in module\n"));

        // Parse the header back out.
        let rest = line.strip_prefix('[').unwrap();
        let (tag, rest) = rest.split_once("] ").unwrap();
        let (ts, msg) = rest.split_once(' ').unwrap();
        assert_eq!(tag, "ERR");
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok(), "bad timestamp {ts}");
        assert_eq!(msg, "boom in module\n");
    }

    #[test]
    fn access_records_have_no_level_bracket() {
        assert!(!format_plain_text(ACCESS_TAG, "GET /status").starts_with('['));
        assert!(!format_plain_text("", "raw-ish").starts_with('['));
    }

    #[test]
    fn truncation_keeps_the_prefix() {
        assert_eq!(truncate_to("abcdefg", 5), "abcde");
        assert_eq!(truncate_to("abc", 5), "abc");
        assert_eq!(truncate_to("abcdefg", 0), "abcdefg");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Each of these characters is three bytes long.
        let msg = "日志内容";
        assert_eq!(truncate_to(msg, 4), "日");
        assert_eq!(truncate_to(msg, 2), "");
    }

    #[test]
    fn values_encode_as_json() {
        #[derive(Serialize)]
        struct Probe {
            code: u32,
            detail: &'static str,
        }
        assert_eq!(
            encode_value(&Probe { code: 7, detail: "ok" }),
            r#"{"code":7,"detail":"ok"}"#
        );
    }

    #[test]
    fn panicking_serializer_is_caught() {
        struct Grenade;
        impl Serialize for Grenade {
            fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                panic!("pulled the pin");
            }
        }
        assert_eq!(encode_value(&Grenade), "panic: pulled the pin");
    }

    #[test]
    fn failing_serializer_yields_nil_literal() {
        struct Refusal;
        impl Serialize for Refusal {
            fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("not today"))
            }
        }
        assert_eq!(encode_value(&Refusal), "<nil>");
    }
}
