use crate::trace::{StackTraceCompactor, TraceLayout};
use chrono::{DateTime, FixedOffset};

/// Settings shared by every record a normalizer produces.
///
/// **Fields**
/// - `base_path`: stripped from the front of every emitted file path.
/// - `case_insensitive_paths`: compare `base_path` ignoring ASCII case.
/// - `fixed_time`: when set, every record's `datetime` uses this value.
///   Meant for tests that compare whole output lines.
/// - `call_site_offset` / `call_site_limit`: window of the call-site trace
///   written under `stacktrace`.
/// - `max_depth`: nesting depth after which values are replaced by a
///   placeholder string.
/// - `max_items`: entries kept per list or map.
/// - `layout`: vendor and test-harness directory conventions.
#[derive(Clone, Debug)]
pub struct FormatterConfig {
    pub base_path: String,
    pub case_insensitive_paths: bool,
    pub fixed_time: Option<DateTime<FixedOffset>>,
    pub call_site_offset: usize,
    pub call_site_limit: Option<usize>,
    pub max_depth: usize,
    pub max_items: usize,
    pub layout: TraceLayout,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            case_insensitive_paths: false,
            fixed_time: None,
            call_site_offset: 0,
            call_site_limit: Some(8),
            max_depth: 9,
            max_items: 1000,
            layout: TraceLayout::default(),
        }
    }
}

impl FormatterConfig {
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_fixed_time(mut self, time: DateTime<FixedOffset>) -> Self {
        self.fixed_time = Some(time);
        self
    }

    pub fn with_call_site_window(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.call_site_offset = offset;
        self.call_site_limit = limit;
        self
    }

    pub fn with_layout(mut self, layout: TraceLayout) -> Self {
        self.layout = layout;
        self
    }

    pub(crate) fn compactor(&self) -> StackTraceCompactor {
        StackTraceCompactor::new(self.base_path.clone(), self.layout.clone())
            .case_insensitive(self.case_insensitive_paths)
    }
}
