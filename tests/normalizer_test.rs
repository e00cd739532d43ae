use chrono::{DateTime, TimeZone, Utc};
use json_log_formatter::capture::FixedFrames;
use json_log_formatter::{
    CapturedError, ContextError, FieldValue, Fields, FormatterConfig, Level, LogEvent, RecordNormalizer,
    SourceLocation, StackFrame, StackTraceCompactor, TraceLayout, SCHEMA_VERSION,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn normalizer() -> RecordNormalizer {
    RecordNormalizer::new(FormatterConfig::default().with_base_path("/app"))
        .with_frame_source(Arc::new(FixedFrames(vec![StackFrame::new("/app/src/main.rs", 7)])))
}

fn keys(value: &Value) -> Vec<&str> {
    value.as_object().unwrap().keys().map(String::as_str).collect()
}

#[test]
fn test_base_fields_in_order() {
    let event = LogEvent::new(Level::Warning, "billing", "card declined");
    let record = normalizer().normalize(&event).unwrap();
    let record = Value::Object(record);

    assert_eq!(
        keys(&record),
        vec!["message", "level", "level_name", "channel", "datetime", "_schema", "stacktrace"]
    );
    assert_eq!(record["level"], json!(300));
    assert_eq!(record["level_name"], json!("WARNING"));
    assert_eq!(record["_schema"], json!(SCHEMA_VERSION));
    assert_eq!(record["stacktrace"], json!("/src/main.rs (7)"));
}

#[test]
fn test_extra_wins_over_context() {
    let event = LogEvent::new(Level::Info, "app", "merge")
        .with_context("a", 1i64)
        .with_extra("a", 2i64);
    let record = normalizer().normalize(&event).unwrap();
    assert_eq!(record["a"], json!(2));
}

#[test]
fn test_context_and_extra_are_flattened() {
    let mut nested = Fields::new();
    nested.insert("id".to_string(), FieldValue::from(9i64));
    let event = LogEvent::new(Level::Info, "app", "flat")
        .with_context("user", nested)
        .with_context("route", "/discussions")
        .with_extra("host", "web-3");

    let record = normalizer().normalize(&event).unwrap();
    assert_eq!(record["user"], json!({"id": 9}));
    assert_eq!(record["route"], json!("/discussions"));
    assert_eq!(record["host"], json!("web-3"));
    assert!(!record.contains_key("context"));
    assert!(!record.contains_key("extra"));
}

#[test]
fn test_context_cannot_replace_schema() {
    let event = LogEvent::new(Level::Info, "app", "schema").with_context("_schema", "v1");
    let record = normalizer().normalize(&event).unwrap();
    assert_eq!(record["_schema"], json!("v2"));
}

#[test]
fn test_context_can_replace_base_fields() {
    let event = LogEvent::new(Level::Info, "app", "original").with_context("message", "replaced");
    let record = Value::Object(normalizer().normalize(&event).unwrap());
    assert_eq!(record["message"], json!("replaced"));
    assert_eq!(keys(&record)[0], "message");
}

#[test]
fn test_event_timestamp_keeps_offset() {
    let timestamp = Utc.with_ymd_and_hms(2023, 5, 17, 8, 30, 0).unwrap();
    let event = LogEvent::new(Level::Info, "app", "time").at(timestamp);
    let record = normalizer().normalize(&event).unwrap();
    let datetime = record["datetime"].as_str().unwrap();
    assert_eq!(datetime, "2023-05-17T08:30:00.000000+00:00");
    assert_eq!(DateTime::parse_from_rfc3339(datetime).unwrap(), timestamp);
}

#[test]
fn test_plain_error_keys() {
    let error = CapturedError::new("Exception", "plain").at(SourceLocation::new("/app/src/lib.rs", 3));
    let map = Value::Object(normalizer().normalize_error(&error).unwrap());
    assert_eq!(keys(&map), vec!["class", "message", "code", "file", "stacktrace"]);
    assert_eq!(map["file"], json!("/src/lib.rs:3"));
    assert_eq!(map["code"], json!(0));
}

#[test]
fn test_previous_chain_is_recursive() {
    let root = CapturedError::new("RootError", "disk full").at(SourceLocation::new("/app/a.rs", 1));
    let middle = CapturedError::new("IoError", "write failed")
        .at(SourceLocation::new("/app/b.rs", 2))
        .caused_by(root);
    let top = ContextError::new("save failed", 500)
        .with_context("documentID", 44i64)
        .at(SourceLocation::new("/app/c.rs", 3))
        .caused_by(middle);

    let map = Value::Object(normalizer().normalize_error(&top).unwrap());
    assert_eq!(
        keys(&map),
        vec!["class", "message", "code", "file", "previous", "documentID", "stacktrace"]
    );

    let previous = &map["previous"];
    assert_eq!(keys(previous), vec!["class", "message", "code", "file", "previous", "stacktrace"]);
    assert_eq!(previous["class"], json!("IoError"));

    let innermost = &previous["previous"];
    assert_eq!(keys(innermost), vec!["class", "message", "code", "file", "stacktrace"]);
    assert_eq!(innermost["message"], json!("disk full"));
}

#[test]
fn test_errors_nested_in_context_values() {
    let error = CapturedError::new("Exception", "inner").at(SourceLocation::new("/app/x.rs", 5));
    let event = LogEvent::new(Level::Error, "app", "batch failed").with_context(
        "failures",
        vec![FieldValue::error(error), FieldValue::from("ok")],
    );
    let record = normalizer().normalize(&event).unwrap();
    assert_eq!(record["failures"][0]["message"], json!("inner"));
    assert_eq!(record["failures"][0]["file"], json!("/x.rs:5"));
    assert_eq!(record["failures"][1], json!("ok"));
}

#[test]
fn test_error_context_trace_key_is_dropped() {
    let error = ContextError::new("with trace", 0)
        .with_context("trace", json!(["raw", "frames"]))
        .at(SourceLocation::new("/app/x.rs", 1));
    let map = normalizer().normalize_error(&error).unwrap();
    assert!(!map.contains_key("trace"));
    assert!(map.contains_key("stacktrace"));
}

#[test]
fn test_call_site_window_applies() {
    let frames: Vec<StackFrame> = (1..=6).map(|i| StackFrame::new(format!("/app/f{}.rs", i), i)).collect();
    let config = FormatterConfig::default()
        .with_base_path("/app")
        .with_call_site_window(2, Some(3));
    let normalizer = RecordNormalizer::new(config).with_frame_source(Arc::new(FixedFrames(frames)));
    let record = normalizer.normalize(&LogEvent::new(Level::Info, "app", "window")).unwrap();
    assert_eq!(record["stacktrace"], json!("/f3.rs (3)\n/f4.rs (4)\n/f5.rs (5)"));
}

#[test]
fn test_live_call_site_is_bounded() {
    let normalizer = RecordNormalizer::new(FormatterConfig::default());
    let record = normalizer.normalize(&LogEvent::new(Level::Info, "app", "live")).unwrap();
    let stacktrace = record["stacktrace"].as_str().unwrap();
    assert!(stacktrace.lines().count() <= 8);
}

#[test]
fn test_compaction_accounts_for_every_frame() {
    let compactor = StackTraceCompactor::new("/app", TraceLayout::default());
    let pattern = [
        "/app/src/a.php",
        "/app/vendor/acme/http/Client.php",
        "/app/vendor/acme/http/Pool.php",
        "/app/vendor/phpunit/phpunit/TestCase.php",
        "/app/vendor/acme/cache/Store.php",
        "/app/src/b.php",
        "/app/vendor/bin/phpunit",
    ];

    for len in 0..=pattern.len() * 3 {
        let frames: Vec<StackFrame> = pattern
            .iter()
            .cycle()
            .take(len)
            .enumerate()
            .map(|(i, p)| StackFrame::new(*p, i as u32))
            .collect();
        let harness = frames
            .iter()
            .filter(|f| {
                let path = f.file.as_deref().unwrap();
                path.starts_with("/app/vendor/phpunit") || path.starts_with("/app/vendor/bin")
            })
            .count();

        let trace = compactor.compact(&frames, None, 0);
        assert_eq!(trace.frames_accounted(), len - harness, "len {}", len);
    }
}
