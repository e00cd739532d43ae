use crate::exception::{CapturedError, SourceLocation};
use crate::formatter::JsonLineFormatter;
use crate::record::{FieldValue, Fields, Level, LogEvent};
use crate::trace::UNKNOWN_PATH;
use chrono::Utc;
use std::io::{self, Write};
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that formats every event as a `$json:` line
/// and writes it through a [`MakeWriter`].
///
/// Event fields become the record's context, fields configured with
/// [`JsonLogLayer::with_extra`] become its extra data, and the event
/// target is used as the channel unless one is set explicitly. Errors
/// recorded as `&dyn Error` fields are expanded with their source chain.
///
/// Formatting and write failures are reported on stderr and counted; they
/// never propagate into application code.
pub struct JsonLogLayer<W = fn() -> io::Stdout> {
    formatter: JsonLineFormatter,
    make_writer: W,
    channel: Option<String>,
    extra: Fields,
    max_level: LevelFilter,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Lines successfully handed to the writer.
    pub written_events: Arc<AtomicU64>,
    /// Events lost to formatting or write errors.
    pub failed_events: Arc<AtomicU64>,
}

impl JsonLogLayer {
    /// Create a layer that writes to stdout and accepts every level.
    pub fn new(formatter: JsonLineFormatter) -> Self {
        Self {
            formatter,
            make_writer: io::stdout,
            channel: None,
            extra: Fields::new(),
            max_level: LevelFilter::TRACE,
            total_events: Arc::new(AtomicU64::new(0)),
            written_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<W> JsonLogLayer<W> {
    pub fn with_writer<W2>(self, make_writer: W2) -> JsonLogLayer<W2>
    where
        W2: for<'a> MakeWriter<'a> + 'static,
    {
        JsonLogLayer {
            formatter: self.formatter,
            make_writer,
            channel: self.channel,
            extra: self.extra,
            max_level: self.max_level,
            total_events: self.total_events,
            written_events: self.written_events,
            failed_events: self.failed_events,
        }
    }

    /// Use a fixed channel name instead of the event target.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Attach a field to the extra data of every record.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_extra_fields(mut self, fields: Fields) -> Self {
        self.extra.extend(fields);
        self
    }

    /// Ignore events more verbose than `max_level`.
    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    fn to_log_event(&self, event: &Event<'_>) -> LogEvent {
        let meta = event.metadata();
        let location = SourceLocation::new(meta.file().unwrap_or(UNKNOWN_PATH), meta.line().unwrap_or(0));

        let mut context = Fields::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut context,
            message: &mut message,
            location,
        };
        event.record(&mut visitor);

        LogEvent {
            timestamp: Utc::now(),
            level: Level::from(*meta.level()),
            channel: self.channel.clone().unwrap_or_else(|| meta.target().to_string()),
            message: message.unwrap_or_default(),
            context,
            extra: self.extra.clone(),
        }
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > self.max_level {
            return;
        }

        let log_event = self.to_log_event(event);
        let line = match self.formatter.format(&log_event) {
            Ok(line) => line,
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("error formatting log record: {}", e);
                return;
            }
        };

        let mut writer = self.make_writer.make_writer_for(event.metadata());
        match writer.write_all(line.as_bytes()) {
            Ok(()) => {
                self.written_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("error writing log line: {}", e);
            }
        }
    }
}

/// Collects event fields into a [`Fields`] map, pulling out `message`.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
    /// Attributed to errors recorded on the event.
    pub location: SourceLocation,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), FieldValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let error = CapturedError::from_dyn(value, self.location.clone());
        self.fields.insert(field.name().to_string(), FieldValue::error(error));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), FieldValue::Str(format!("{:?}", value)));
        }
    }
}
