use crate::capture::{BacktraceSource, FrameSource};
use crate::record::{FieldValue, Fields};
use crate::trace::StackFrame;
use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Longest `source()` chain followed when converting a std error.
const MAX_SOURCE_CHAIN: usize = 32;

/// Where an error was constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        SourceLocation { file: file.into(), line }
    }

    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        SourceLocation::new(location.file(), location.line())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Capabilities an error exposes to the log formatter.
///
/// Plain errors only need to describe themselves; errors that carry a
/// debugging context map return it from [`LoggableError::extension_context`]
/// and the formatter merges it into the serialized error.
pub trait LoggableError: fmt::Debug + Send + Sync {
    /// Fully qualified type name.
    fn class_name(&self) -> Cow<'_, str>;

    fn message(&self) -> Cow<'_, str>;

    fn code(&self) -> i64 {
        0
    }

    fn location(&self) -> &SourceLocation;

    /// Frames captured when the error was built, innermost first.
    fn frames(&self) -> &[StackFrame] {
        &[]
    }

    fn cause(&self) -> Option<&dyn LoggableError> {
        None
    }

    fn extension_context(&self) -> Option<&Fields> {
        None
    }

    /// HTTP status to answer with when this error ends a request.
    fn http_status(&self) -> u16 {
        500
    }
}

/// Error carrying an arbitrary map of debugging context.
#[derive(Debug, Clone)]
pub struct ContextError {
    message: String,
    code: i64,
    context: Fields,
    location: SourceLocation,
    frames: Vec<StackFrame>,
    cause: Option<Arc<dyn LoggableError>>,
}

impl ContextError {
    #[track_caller]
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        ContextError {
            message: message.into(),
            code,
            context: Fields::new(),
            location: SourceLocation::caller(),
            frames: Vec::new(),
            cause: None,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.context.extend(fields);
        self
    }

    pub fn caused_by<E: LoggableError + 'static>(mut self, cause: E) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Record the live call stack as this error's frames.
    pub fn with_captured_frames(self) -> Self {
        let frames = BacktraceSource::default().capture();
        self.with_frames(frames)
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn context(&self) -> &Fields {
        &self.context
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ContextError {}

impl LoggableError for ContextError {
    fn class_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn code(&self) -> i64 {
        self.code
    }

    fn location(&self) -> &SourceLocation {
        &self.location
    }

    fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    fn cause(&self) -> Option<&dyn LoggableError> {
        self.cause.as_deref()
    }

    fn extension_context(&self) -> Option<&Fields> {
        Some(&self.context)
    }

    fn http_status(&self) -> u16 {
        match u16::try_from(self.code) {
            Ok(status @ 400..=599) => status,
            _ => 500,
        }
    }
}

/// Plain error with an explicit class name.
///
/// Used for errors that did not originate as a [`LoggableError`], such as
/// `std::error::Error` values recorded on `tracing` events.
#[derive(Debug, Clone)]
pub struct CapturedError {
    class: String,
    message: String,
    code: i64,
    location: SourceLocation,
    frames: Vec<StackFrame>,
    cause: Option<Arc<dyn LoggableError>>,
}

impl CapturedError {
    #[track_caller]
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        CapturedError {
            class: class.into(),
            message: message.into(),
            code: 0,
            location: SourceLocation::caller(),
            frames: Vec::new(),
            cause: None,
        }
    }

    /// Convert a typed std error, following its `source()` chain.
    #[track_caller]
    pub fn from_error<E: std::error::Error + 'static>(error: &E) -> Self {
        let mut captured = Self::from_dyn(error, SourceLocation::caller());
        captured.class = std::any::type_name::<E>().to_string();
        captured
    }

    /// Convert a type-erased std error, following its `source()` chain.
    ///
    /// The concrete type is not available here, so the class is taken from
    /// the leading identifier of the error's `Debug` output.
    pub fn from_dyn(error: &(dyn std::error::Error + 'static), location: SourceLocation) -> Self {
        let mut chain = vec![error];
        let mut current = error;
        while let Some(source) = current.source() {
            if chain.len() >= MAX_SOURCE_CHAIN {
                break;
            }
            chain.push(source);
            current = source;
        }

        let mut cause: Option<Arc<dyn LoggableError>> = None;
        for link in chain.into_iter().skip(1).rev() {
            cause = Some(Arc::new(CapturedError {
                class: debug_type_name(link),
                message: link.to_string(),
                code: 0,
                location: location.clone(),
                frames: Vec::new(),
                cause: cause.take(),
            }));
        }

        CapturedError {
            class: debug_type_name(error),
            message: error.to_string(),
            code: 0,
            location,
            frames: Vec::new(),
            cause,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn caused_by<E: LoggableError + 'static>(mut self, cause: E) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }
}

/// `io::Error` prints its private representation (`Custom { .. }`,
/// `Os { .. }`) instead of a type name, so it is recognized by downcast.
fn debug_type_name(error: &(dyn std::error::Error + 'static)) -> String {
    if error.is::<std::io::Error>() {
        return "std::io::Error".to_string();
    }
    let debug = format!("{:?}", error);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "Error".to_string()
    } else {
        name
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CapturedError {}

impl LoggableError for CapturedError {
    fn class_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.class)
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn code(&self) -> i64 {
        self.code
    }

    fn location(&self) -> &SourceLocation {
        &self.location
    }

    fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    fn cause(&self) -> Option<&dyn LoggableError> {
        self.cause.as_deref()
    }
}
