//! SAS log stream.
//!
//! Every message written to the SAS log is kept in memory (so callers can
//! inspect or persist it) and mirrored to `tracing`.

use std::fmt;

use tracing::{error, info, warn};

/// Log message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// `NOTE:` lines.
    Info,
    /// `WARNING:` lines.
    Warning,
    /// `ERROR:` lines.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "NOTE"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// One log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// In-memory SAS log.
#[derive(Debug, Clone, Default)]
pub struct SasLog {
    entries: Vec<LogEntry>,
}

impl SasLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational note.
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "sas::log", "{message}");
        self.push(Severity::Info, message);
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(target: "sas::log", "{message}");
        self.push(Severity::Warning, message);
    }

    /// Record an error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(target: "sas::log", "{message}");
        self.push(Severity::Error, message);
    }

    fn push(&mut self, severity: Severity, message: String) {
        self.entries.push(LogEntry { severity, message });
    }

    /// All entries in order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries of one severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.severity == severity)
    }

    /// Whether any entry of the given severity contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.with_severity(severity).any(|e| e.message.contains(needle))
    }

    /// Number of error entries.
    pub fn error_count(&self) -> usize {
        self.with_severity(Severity::Error).count()
    }

    /// Render the log as text, one entry per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}
