use chrono::DateTime;
use json_log_formatter::capture::FixedFrames;
use json_log_formatter::{
    CapturedError, ContextError, FieldValue, FormatError, FormatterConfig, JsonLineFormatter, Level,
    LogEvent, SourceLocation, StackFrame,
};
use serde_json::{json, Value};
use std::sync::Arc;

const BASE: &str = "/srv/forum";

fn call_site() -> Vec<StackFrame> {
    vec![
        StackFrame::new("/srv/forum/tests/formatter_test.rs", 64),
        StackFrame::unknown(),
        StackFrame::new("/srv/forum/tests/formatter_test.rs", 51),
        StackFrame::new("/srv/forum/vendor/phpunit/phpunit/src/Framework/TestCase.php", 1200),
        StackFrame::new("/srv/forum/tests/formatter_test.rs", 62),
        StackFrame::new("/srv/forum/vendor/bin/phpunit", 97),
    ]
}

fn formatter() -> JsonLineFormatter {
    let time = DateTime::parse_from_rfc3339("2022-01-01T00:00:00+00:00").unwrap();
    let config = FormatterConfig::default()
        .with_base_path(BASE)
        .with_fixed_time(time);
    JsonLineFormatter::new(config).with_frame_source(Arc::new(FixedFrames(call_site())))
}

fn event() -> LogEvent {
    LogEvent::new(Level::Info, "my-logger", "hello world")
}

fn at(line: u32) -> SourceLocation {
    SourceLocation::new(format!("{}/tests/formatter_test.rs", BASE), line)
}

fn decode(line: &str) -> Value {
    let json = line
        .strip_prefix("$json:")
        .and_then(|rest| rest.strip_suffix('\n'))
        .expect("framed line");
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_plain_message_line() {
    let line = formatter().format(&event()).unwrap();
    assert_eq!(
        line,
        concat!(
            r#"$json:{"message":"hello world","level":200,"level_name":"INFO","channel":"my-logger","#,
            r#""datetime":"2022-01-01T00:00:00+00:00","_schema":"v2","#,
            r#""stacktrace":"/tests/formatter_test.rs (64)\n/unknown (0)\n/tests/formatter_test.rs (51)\n/tests/formatter_test.rs (62)"}"#,
            "\n"
        )
    );
}

#[test]
fn test_context_is_flattened() {
    let event = event().with_context("extra-data", json!({"foo": "bar"}));
    let line = formatter().format(&event).unwrap();
    assert_eq!(
        line,
        concat!(
            r#"$json:{"message":"hello world","level":200,"level_name":"INFO","channel":"my-logger","#,
            r#""datetime":"2022-01-01T00:00:00+00:00","_schema":"v2","extra-data":{"foo":"bar"},"#,
            r#""stacktrace":"/tests/formatter_test.rs (64)\n/unknown (0)\n/tests/formatter_test.rs (51)\n/tests/formatter_test.rs (62)"}"#,
            "\n"
        )
    );
}

#[test]
fn test_error_chain_serialization() {
    let parent = CapturedError::new("Exception", "Parent Exception")
        .with_code(543)
        .at(at(77));
    let error = ContextError::new("Bam!", 500)
        .with_context("contextFoo", "contextBar")
        .caused_by(parent)
        .at(at(73));

    let line = formatter().format(&event().with_error(error)).unwrap();
    assert_eq!(
        line,
        concat!(
            r#"$json:{"message":"hello world","level":200,"level_name":"INFO","channel":"my-logger","#,
            r#""datetime":"2022-01-01T00:00:00+00:00","_schema":"v2","#,
            r#""error":{"class":"json_log_formatter::exception::ContextError","message":"Bam!","code":500,"#,
            r#""file":"/tests/formatter_test.rs:73","#,
            r#""previous":{"class":"Exception","message":"Parent Exception","code":543,"file":"/tests/formatter_test.rs:77","stacktrace":""},"#,
            r#""contextFoo":"contextBar","stacktrace":""},"#,
            r#""stacktrace":"/tests/formatter_test.rs (64)\n/unknown (0)\n/tests/formatter_test.rs (51)\n/tests/formatter_test.rs (62)"}"#,
            "\n"
        )
    );
}

#[test]
fn test_error_frames_are_compacted() {
    let error = CapturedError::new("Exception", "with frames")
        .at(at(10))
        .with_frames(vec![
            StackFrame::new("/srv/forum/src/Controller.php", 30),
            StackFrame::new("/srv/forum/vendor/laravel/framework/src/Pipeline.php", 128),
            StackFrame::new("/srv/forum/vendor/laravel/framework/src/Router.php", 799),
            StackFrame::new("/srv/forum/public/index.php", 55),
        ]);

    let record = decode(&formatter().format(&event().with_error(error)).unwrap());
    assert_eq!(
        record["error"]["stacktrace"],
        json!("/src/Controller.php (30)\n/vendor/laravel/framework (2 frames)\n/public/index.php (55)")
    );
    assert!(record["error"].get("trace").is_none());
}

#[test]
fn test_line_round_trips_through_json() {
    let event = event()
        .with_context("url", "https://forum.example.com/discussions/12")
        .with_context("ratio", 0.1)
        .with_context("name", "Zoë 日本")
        .with_context("ids", vec![FieldValue::from(1i64), FieldValue::from(2i64)])
        .with_extra("process", json!({"pid": 12, "tags": ["a", "b"]}));

    let line = formatter().format(&event).unwrap();
    assert!(line.contains(r#""url":"https://forum.example.com/discussions/12""#));
    assert!(line.contains("Zoë 日本"));
    assert!(line.ends_with("}\n"));
    assert_eq!(line.matches('\n').count(), 1);

    let record = decode(&line);
    assert_eq!(record["ratio"], json!(0.1));
    assert_eq!(record["ids"], json!([1, 2]));
    assert_eq!(record["process"], json!({"pid": 12, "tags": ["a", "b"]}));
    assert!(record.get("context").is_none());
    assert!(record.get("extra").is_none());
}

#[test]
fn test_non_finite_float_is_reported() {
    let event = event().with_context("ratio", f64::INFINITY);
    match formatter().format(&event) {
        Err(FormatError::NonFiniteFloat(value)) => assert!(value.is_infinite()),
        other => panic!("expected NonFiniteFloat, got {:?}", other),
    }
}
