use crate::trace::StackFrame;

/// Function-name prefixes of the capture machinery and of the dispatch path
/// a `tracing` event takes before reaching the formatter.
const INTERNAL_PREFIXES: &[&str] = &[
    "backtrace::",
    "json_log_formatter::",
    "tracing::",
    "tracing_core::",
    "tracing_subscriber::",
];

/// Registry directory names of the same crates, for frames whose symbol is
/// inlined into caller code (the closures `tracing`'s macros expand to).
const INTERNAL_CRATE_DIRS: &[&str] = &["backtrace-", "tracing-", "tracing-core-", "tracing-subscriber-"];

/// Standard library paths the dispatch path runs through, e.g.
/// `LocalKey::try_with` under `tracing_core::dispatcher::get_default`.
const RUNTIME_PREFIXES: &[&str] = &["std::", "core::", "alloc::"];

/// Source of the call stack at the moment a record is normalized.
pub trait FrameSource: Send + Sync {
    /// Frames of the current call stack, innermost first.
    fn capture(&self) -> Vec<StackFrame>;
}

/// Resolves the live call stack with the `backtrace` crate.
///
/// Leading frames that belong to the capture itself, to this crate, or to
/// the `tracing` dispatch path are dropped, so the first frame returned is
/// the code that emitted the log event.
#[derive(Debug, Clone, Default)]
pub struct BacktraceSource {
    extra_internal: Vec<String>,
}

impl BacktraceSource {
    /// Also skip leading frames whose function starts with `prefix`, e.g. an
    /// application's own logging wrapper.
    pub fn skipping(mut self, prefix: impl Into<String>) -> Self {
        self.extra_internal.push(prefix.into());
        self
    }

    fn is_internal(&self, frame: &StackFrame) -> bool {
        let name = match frame.function.as_deref() {
            Some(name) => name.trim_start_matches('<'),
            None => return true,
        };
        INTERNAL_PREFIXES.iter().any(|p| name.starts_with(p))
            || self.extra_internal.iter().any(|p| name.starts_with(p.as_str()))
            || frame.file.as_deref().is_some_and(in_internal_crate)
    }

    /// Index of the first frame that belongs to the code that logged.
    ///
    /// When the stack starts inside internal frames, everything before the
    /// first application frame is dropped, standard library frames between
    /// internal ones included.
    fn first_caller_frame(&self, frames: &[StackFrame]) -> usize {
        let first_app = frames
            .iter()
            .position(|f| !self.is_internal(f) && !is_runtime(f))
            .unwrap_or(frames.len());
        if frames[..first_app].iter().any(|f| self.is_internal(f)) {
            first_app
        } else {
            0
        }
    }
}

fn is_runtime(frame: &StackFrame) -> bool {
    frame
        .function
        .as_deref()
        .map(|name| name.trim_start_matches('<'))
        .is_some_and(|name| RUNTIME_PREFIXES.iter().any(|p| name.starts_with(p)))
}

/// `.../tracing-core-0.1.36/src/dispatcher.rs` lies inside `tracing-core`.
fn in_internal_crate(file: &str) -> bool {
    file.split(['/', '\\']).any(|segment| {
        INTERNAL_CRATE_DIRS.iter().any(|dir| {
            segment
                .strip_prefix(dir)
                .and_then(|version| version.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
    })
}

impl FrameSource for BacktraceSource {
    fn capture(&self) -> Vec<StackFrame> {
        let mut frames = Vec::new();
        backtrace::trace(|frame| {
            let mut resolved = false;
            backtrace::resolve_frame(frame, |symbol| {
                resolved = true;
                frames.push(StackFrame {
                    file: symbol.filename().map(|p| p.to_string_lossy().into_owned()),
                    line: symbol.lineno(),
                    function: symbol.name().map(|n| n.to_string()),
                });
            });
            if !resolved {
                frames.push(StackFrame::unknown());
            }
            true
        });

        let first = self.first_caller_frame(&frames);
        frames.split_off(first)
    }
}

/// Replays a fixed list of frames on every capture.
#[derive(Debug, Clone, Default)]
pub struct FixedFrames(pub Vec<StackFrame>);

impl FrameSource for FixedFrames {
    fn capture(&self) -> Vec<StackFrame> {
        self.0.clone()
    }
}
