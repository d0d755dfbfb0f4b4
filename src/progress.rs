//! Report pipeline progress.
//!
//! Reports observable progress during `litreport run` so users see which
//! book is being read, which stage is in flight, and where the report landed.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use crate::backend::Stage;
use crate::models::ParagraphRole;

/// A single progress event for a report run.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Raw text extraction started for this book.
    Extracting { book: String },
    /// Extraction finished; `chars` is the normalized text length.
    Extracted { book: String, chars: u64 },
    /// Summary requested for this book (may be served from cache).
    Summarizing { book: String },
    /// A whole-report stage started (comparison, thesis, title).
    Stage { stage: Stage },
    /// A paragraph generation call started.
    Paragraph { role: ParagraphRole },
    /// The rendered report was written.
    Written { path: String, bytes: u64 },
}

/// Reports run progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the pipeline.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "report  extracted  12,345 chars  (book-1.xml)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Extracting { book } => format!("report  extracting  {}\n", book),
            ProgressEvent::Extracted { book, chars } => format!(
                "report  extracted  {} chars  ({})\n",
                format_number(*chars),
                book
            ),
            ProgressEvent::Summarizing { book } => format!("report  summarizing  {}\n", book),
            ProgressEvent::Stage { stage } => format!("report  {}...\n", stage),
            ProgressEvent::Paragraph { role } => format!("report  paragraph  {}\n", role),
            ProgressEvent::Written { path, bytes } => format!(
                "report  wrote {} bytes to {}\n",
                format_number(*bytes),
                path
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &ProgressEvent) -> serde_json::Value {
        match event {
            ProgressEvent::Extracting { book } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "book": book
            }),
            ProgressEvent::Extracted { book, chars } => serde_json::json!({
                "event": "progress",
                "phase": "extracted",
                "book": book,
                "chars": chars
            }),
            ProgressEvent::Summarizing { book } => serde_json::json!({
                "event": "progress",
                "phase": "summarizing",
                "book": book
            }),
            ProgressEvent::Stage { stage } => serde_json::json!({
                "event": "progress",
                "phase": stage.to_string()
            }),
            ProgressEvent::Paragraph { role } => serde_json::json!({
                "event": "progress",
                "phase": "paragraph",
                "role": role.as_str()
            }),
            ProgressEvent::Written { path, bytes } => serde_json::json!({
                "event": "written",
                "path": path,
                "bytes": bytes
            }),
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" | "none" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
