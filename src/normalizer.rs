use crate::capture::{BacktraceSource, FrameSource};
use crate::config::FormatterConfig;
use crate::error::FormatError;
use crate::exception::LoggableError;
use crate::record::{FieldValue, Fields, LogEvent};
use crate::trace::StackTraceCompactor;
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};
use std::sync::Arc;

/// Version tag of the flat record shape, written under `_schema`.
pub const SCHEMA_VERSION: &str = "v2";

/// Flat record produced from one [`LogEvent`], in output key order.
pub type NormalizedRecord = Map<String, Value>;

/// Turns [`LogEvent`]s into flat, JSON-ready maps.
///
/// Context and extra entries are lifted to the top level, errors found at
/// any depth are expanded into `class`/`message`/`code`/`file`/`stacktrace`
/// maps with their causes under `previous`, and the call site of the log
/// statement is attached as a compacted trace.
///
/// A normalizer holds only immutable configuration and can be shared
/// between threads.
#[derive(Clone)]
pub struct RecordNormalizer {
    config: FormatterConfig,
    compactor: StackTraceCompactor,
    frames: Arc<dyn FrameSource>,
}

impl RecordNormalizer {
    pub fn new(config: FormatterConfig) -> Self {
        let compactor = config.compactor();
        Self {
            config,
            compactor,
            frames: Arc::new(BacktraceSource::default()),
        }
    }

    /// Replace the source of call-site frames.
    pub fn with_frame_source(mut self, frames: Arc<dyn FrameSource>) -> Self {
        self.frames = frames;
        self
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn compactor(&self) -> &StackTraceCompactor {
        &self.compactor
    }

    /// Normalize one event.
    ///
    /// **Returns**
    /// - `Ok(record)` with `message`, `level`, `level_name`, `channel`,
    ///   `datetime`, `_schema`, the merged context and extra entries and
    ///   `stacktrace`, in that order.
    /// - `Err(FormatError)` if a value cannot be represented in JSON.
    pub fn normalize(&self, event: &LogEvent) -> Result<NormalizedRecord, FormatError> {
        let mut record = Map::new();
        record.insert("message".to_string(), Value::String(event.message.clone()));
        record.insert("level".to_string(), Value::from(event.level.ordinal()));
        record.insert("level_name".to_string(), Value::from(event.level.name()));
        record.insert("channel".to_string(), Value::String(event.channel.clone()));
        record.insert("datetime".to_string(), Value::String(self.datetime(event)));
        record.insert("_schema".to_string(), Value::from(SCHEMA_VERSION));

        record.extend(self.normalize_map(&event.context, 1)?);
        record.extend(self.normalize_map(&event.extra, 1)?);
        // Merged keys cannot replace the schema tag.
        record.insert("_schema".to_string(), Value::from(SCHEMA_VERSION));

        let frames = self.frames.capture();
        let stacktrace = self.compactor.render(
            &frames,
            self.config.call_site_limit,
            self.config.call_site_offset,
        );
        record.insert("stacktrace".to_string(), Value::String(stacktrace));

        Ok(record)
    }

    /// Serialize an error and its cause chain.
    ///
    /// The map holds `class`, `message`, `code`, `file`, then `previous`
    /// when the error has a cause, then the entries of the error's
    /// extension context, then `stacktrace`.
    pub fn normalize_error(&self, error: &dyn LoggableError) -> Result<Map<String, Value>, FormatError> {
        self.error_map(error, 1)
    }

    /// Normalize a free-standing field map, e.g. an error's context.
    pub fn normalize_fields(&self, fields: &Fields) -> Result<Map<String, Value>, FormatError> {
        self.normalize_map(fields, 1)
    }

    fn datetime(&self, event: &LogEvent) -> String {
        match &self.config.fixed_time {
            Some(time) => time.to_rfc3339_opts(SecondsFormat::Secs, false),
            None => event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }

    fn too_deep(&self) -> Value {
        Value::String(format!(
            "Over {} levels deep, aborting normalization",
            self.config.max_depth
        ))
    }

    fn normalize_value(&self, value: &FieldValue, depth: usize) -> Result<Value, FormatError> {
        if depth > self.config.max_depth {
            return Ok(self.too_deep());
        }

        let normalized = match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::I64(n) => Value::from(*n),
            FieldValue::U64(n) => Value::from(*n),
            FieldValue::F64(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or(FormatError::NonFiniteFloat(*f))?,
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Array(self.normalize_list(items, depth)?),
            FieldValue::Map(fields) => Value::Object(self.normalize_map(fields, depth)?),
            FieldValue::Json(json) => self.normalize_json(json, depth),
            FieldValue::Error(error) => Value::Object(self.error_map(error.as_ref(), depth)?),
        };
        Ok(normalized)
    }

    fn normalize_json(&self, value: &Value, depth: usize) -> Value {
        if depth > self.config.max_depth {
            return self.too_deep();
        }

        match value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len().min(self.config.max_items + 1));
                for (count, item) in items.iter().enumerate() {
                    if count >= self.config.max_items {
                        out.push(self.overflow_notice(items.len()));
                        break;
                    }
                    out.push(self.normalize_json(item, depth + 1));
                }
                Value::Array(out)
            }
            Value::Object(entries) => {
                let mut out = Map::new();
                for (count, (key, item)) in entries.iter().enumerate() {
                    if count >= self.config.max_items {
                        out.insert("...".to_string(), self.overflow_notice(entries.len()));
                        break;
                    }
                    out.insert(key.clone(), self.normalize_json(item, depth + 1));
                }
                Value::Object(out)
            }
            scalar => scalar.clone(),
        }
    }

    fn overflow_notice(&self, total: usize) -> Value {
        Value::String(format!(
            "Over {} items ({} total), aborting normalization",
            self.config.max_items, total
        ))
    }

    fn normalize_list(&self, items: &[FieldValue], depth: usize) -> Result<Vec<Value>, FormatError> {
        let mut out = Vec::with_capacity(items.len().min(self.config.max_items + 1));
        for (count, item) in items.iter().enumerate() {
            if count >= self.config.max_items {
                out.push(self.overflow_notice(items.len()));
                break;
            }
            out.push(self.normalize_value(item, depth + 1)?);
        }
        Ok(out)
    }

    fn normalize_map(&self, fields: &Fields, depth: usize) -> Result<Map<String, Value>, FormatError> {
        let mut out = Map::new();
        for (count, (key, value)) in fields.iter().enumerate() {
            if count >= self.config.max_items {
                out.insert("...".to_string(), self.overflow_notice(fields.len()));
                break;
            }
            out.insert(key.clone(), self.normalize_value(value, depth + 1)?);
        }
        Ok(out)
    }

    fn error_map(&self, error: &dyn LoggableError, depth: usize) -> Result<Map<String, Value>, FormatError> {
        let mut out = Map::new();
        out.insert("class".to_string(), Value::String(error.class_name().into_owned()));
        out.insert("message".to_string(), Value::String(error.message().into_owned()));
        out.insert("code".to_string(), Value::from(error.code()));

        let location = error.location();
        out.insert(
            "file".to_string(),
            Value::String(format!("{}:{}", self.compactor.trim(&location.file), location.line)),
        );

        if let Some(cause) = error.cause() {
            let previous = if depth + 1 > self.config.max_depth {
                self.too_deep()
            } else {
                Value::Object(self.error_map(cause, depth + 1)?)
            };
            out.insert("previous".to_string(), previous);
        }

        if let Some(context) = error.extension_context() {
            for (key, value) in self.normalize_map(context, depth)? {
                if key != "trace" {
                    out.insert(key, value);
                }
            }
        }

        let stacktrace = self.compactor.render(error.frames(), None, 0);
        out.insert("stacktrace".to_string(), Value::String(stacktrace));
        Ok(out)
    }
}
