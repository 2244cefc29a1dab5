//! Timestamped event log for a single pipeline run.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub message: String,
}

impl LogEntry {
    /// Renders the entry as `[YYYY-MM-DD HH:MM:SS] message`.
    pub fn line(&self) -> String {
        format!("[{}] {}", self.timestamp.format(TIMESTAMP_FORMAT), self.message)
    }
}

/// Append-only log owned by one run. A new run starts from a new `RunLog`.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(Local::now().naive_local(), message);
    }

    pub fn push_at(&mut self, timestamp: NaiveDateTime, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp,
            message: message.into(),
        };
        info!(target: "run_log", "{}", entry.message);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        for entry in &self.entries {
            let _ = writeln!(output, "{}", entry.line());
        }
        output
    }

    /// Overwrites `path` with the rendered log.
    pub fn flush(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}
