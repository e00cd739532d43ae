use crate::path::trim_prefix;
use std::fmt;

/// Display path substituted for frames without a file.
pub const UNKNOWN_PATH: &str = "/unknown";

/// One entry of a captured call stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrame {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        StackFrame {
            file: Some(file.into()),
            line: Some(line),
            function: None,
        }
    }

    /// A frame the runtime could not resolve to a source location.
    pub fn unknown() -> Self {
        StackFrame::default()
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}

/// A directory holding third-party code whose frames are collapsed.
///
/// The group prefix of a vendor frame is the root's own segments plus
/// `package_segments` more, so `/vendor` with 2 groups
/// `/vendor/acme/http/src/Client.php` under `/vendor/acme/http`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorRoot {
    pub prefix: String,
    pub package_segments: usize,
}

impl VendorRoot {
    pub fn new(prefix: impl Into<String>, package_segments: usize) -> Self {
        VendorRoot {
            prefix: prefix.into(),
            package_segments,
        }
    }
}

/// Directory conventions the compactor classifies frames by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLayout {
    pub vendor_roots: Vec<VendorRoot>,
    /// Frames under these prefixes belong to the test harness and are dropped.
    pub ignored_prefixes: Vec<String>,
    /// Extra segment appended to every group prefix, e.g. `**/*`.
    pub group_wildcard: Option<String>,
}

impl Default for TraceLayout {
    fn default() -> Self {
        TraceLayout {
            vendor_roots: vec![VendorRoot::new("/vendor", 2)],
            ignored_prefixes: vec!["/vendor/bin".to_string(), "/vendor/phpunit".to_string()],
            group_wildcard: None,
        }
    }
}

impl TraceLayout {
    /// Layout for binaries built by cargo: registry crates are grouped by
    /// crate release and the standard library by crate.
    pub fn rust_toolchain(cargo_home: &str) -> Self {
        let registry = format!("{}/registry/src", cargo_home.trim_end_matches('/'));
        TraceLayout {
            vendor_roots: vec![VendorRoot::new(registry, 2), VendorRoot::new("/rustc", 3)],
            ignored_prefixes: Vec::new(),
            group_wildcard: None,
        }
    }

    pub fn with_vendor_root(mut self, root: VendorRoot) -> Self {
        self.vendor_roots.push(root);
        self
    }

    pub fn with_ignored_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_prefixes.push(prefix.into());
        self
    }

    pub fn with_group_wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.group_wildcard = Some(wildcard.into());
        self
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignored_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn vendor_root_for(&self, path: &str) -> Option<&VendorRoot> {
        self.vendor_roots.iter().find(|r| path.starts_with(r.prefix.as_str()))
    }

    fn group_prefix(&self, path: &str, root: &VendorRoot) -> String {
        let take = segments(&root.prefix).count() + root.package_segments;
        let head: Vec<&str> = segments(path).take(take).collect();

        let mut prefix = String::with_capacity(path.len());
        if path.starts_with('/') {
            prefix.push('/');
        }
        prefix.push_str(&head.join("/"));
        if let Some(wildcard) = &self.group_wildcard {
            prefix.push('/');
            prefix.push_str(wildcard);
        }
        prefix
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// A single display line of a compacted trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceLine {
    Frame { path: String, line: u32 },
    VendorRun { prefix: String, frames: usize },
}

impl TraceLine {
    /// Number of input frames this line stands for.
    pub fn frame_count(&self) -> usize {
        match self {
            TraceLine::Frame { .. } => 1,
            TraceLine::VendorRun { frames, .. } => *frames,
        }
    }
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceLine::Frame { path, line } => write!(f, "{} ({})", path, line),
            TraceLine::VendorRun { prefix, frames } => write!(f, "{} ({} frames)", prefix, frames),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactedTrace {
    lines: Vec<TraceLine>,
}

impl CompactedTrace {
    pub fn lines(&self) -> &[TraceLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total input frames represented, individually or inside a run.
    pub fn frames_accounted(&self) -> usize {
        self.lines.iter().map(TraceLine::frame_count).sum()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.lines.iter().map(ToString::to_string).collect()
    }

    /// Lines joined with `\n`, without a trailing newline.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CompactedTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

struct VendorRun {
    prefix: String,
    frames: usize,
}

/// Turns raw frames into a [`CompactedTrace`].
///
/// Application frames are kept one per line with the base path removed.
/// Consecutive frames from the same vendor package collapse into a single
/// `"<prefix> (<n> frames)"` line, and test-harness frames are dropped.
#[derive(Debug, Clone, Default)]
pub struct StackTraceCompactor {
    base_path: String,
    case_insensitive: bool,
    layout: TraceLayout,
}

impl StackTraceCompactor {
    pub fn new(base_path: impl Into<String>, layout: TraceLayout) -> Self {
        StackTraceCompactor {
            base_path: base_path.into(),
            case_insensitive: false,
            layout,
        }
    }

    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Remove the base path from `path` if it starts with it.
    pub fn trim<'a>(&self, path: &'a str) -> &'a str {
        trim_prefix(path, &self.base_path, self.case_insensitive)
    }

    /// Compact `frames[offset..offset + limit]`.
    ///
    /// **Parameters**
    /// - `frames`: innermost frame first.
    /// - `limit`: maximum number of frames to consider after the offset;
    ///   `None` keeps all of them.
    /// - `offset`: leading frames to skip.
    ///
    /// Ranges past the end of `frames` simply produce fewer lines.
    pub fn compact(&self, frames: &[StackFrame], limit: Option<usize>, offset: usize) -> CompactedTrace {
        let mut lines = Vec::new();
        let mut pending: Option<VendorRun> = None;

        let window = frames.iter().skip(offset).take(limit.unwrap_or(usize::MAX));
        for frame in window {
            let path = self.trim(frame.file.as_deref().unwrap_or(UNKNOWN_PATH));

            if self.layout.is_ignored(path) {
                flush(&mut lines, pending.take());
                continue;
            }

            if let Some(root) = self.layout.vendor_root_for(path) {
                let prefix = self.layout.group_prefix(path, root);
                match pending.as_mut() {
                    Some(run) if run.prefix == prefix => run.frames += 1,
                    _ => {
                        flush(&mut lines, pending.take());
                        pending = Some(VendorRun { prefix, frames: 1 });
                    }
                }
                continue;
            }

            flush(&mut lines, pending.take());
            lines.push(TraceLine::Frame {
                path: path.to_string(),
                line: frame.line.unwrap_or(0),
            });
        }

        flush(&mut lines, pending.take());
        CompactedTrace { lines }
    }

    pub fn render(&self, frames: &[StackFrame], limit: Option<usize>, offset: usize) -> String {
        self.compact(frames, limit, offset).render()
    }

    /// Compacted lines as separate strings, for JSON arrays.
    pub fn stack_trace_array(&self, frames: &[StackFrame], limit: Option<usize>, offset: usize) -> Vec<String> {
        self.compact(frames, limit, offset).to_strings()
    }
}

fn flush(lines: &mut Vec<TraceLine>, run: Option<VendorRun>) {
    if let Some(run) = run {
        if run.frames > 0 {
            lines.push(TraceLine::VendorRun {
                prefix: run.prefix,
                frames: run.frames,
            });
        }
    }
}
