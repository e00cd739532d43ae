pub mod path;
pub mod trace;
pub mod capture;
pub mod record;
pub mod exception;
pub mod error;
pub mod config;
pub mod env;
pub mod normalizer;
pub mod formatter;
pub mod response;
pub mod context;
pub mod layer;
pub mod init;

pub use config::FormatterConfig;
pub use error::{ConfigError, FormatError};
pub use exception::{CapturedError, ContextError, LoggableError, SourceLocation};
pub use formatter::JsonLineFormatter;
pub use normalizer::{NormalizedRecord, RecordNormalizer, SCHEMA_VERSION};
pub use record::{FieldValue, Fields, Level, LogEvent};
pub use trace::{CompactedTrace, StackFrame, StackTraceCompactor, TraceLayout, VendorRoot};
