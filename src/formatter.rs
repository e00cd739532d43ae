use crate::capture::FrameSource;
use crate::config::FormatterConfig;
use crate::error::FormatError;
use crate::normalizer::RecordNormalizer;
use crate::record::LogEvent;
use std::sync::Arc;

/// Marks a line as a structured payload within a mixed log stream.
pub const LINE_PREFIX: &str = "$json:";

/// Formats [`LogEvent`]s as `$json:{...}\n` lines.
#[derive(Clone)]
pub struct JsonLineFormatter {
    normalizer: RecordNormalizer,
}

impl JsonLineFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self {
            normalizer: RecordNormalizer::new(config),
        }
    }

    pub fn with_frame_source(mut self, frames: Arc<dyn FrameSource>) -> Self {
        self.normalizer = self.normalizer.with_frame_source(frames);
        self
    }

    pub fn normalizer(&self) -> &RecordNormalizer {
        &self.normalizer
    }

    /// Format one event as a complete line, trailing newline included.
    ///
    /// **Returns**
    /// - `Err(FormatError)` if the record cannot be encoded. The caller
    ///   decides how to report it; the line is never silently dropped here.
    pub fn format(&self, event: &LogEvent) -> Result<String, FormatError> {
        let record = self.normalizer.normalize(event)?;
        let json = serde_json::to_string(&record)?;

        let mut line = String::with_capacity(LINE_PREFIX.len() + json.len() + 1);
        line.push_str(LINE_PREFIX);
        line.push_str(&json);
        line.push('\n');
        Ok(line)
    }
}

impl From<RecordNormalizer> for JsonLineFormatter {
    fn from(normalizer: RecordNormalizer) -> Self {
        Self { normalizer }
    }
}
