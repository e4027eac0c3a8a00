//! Export log
//!
//! Every message raised during an export pass goes through [`ExportLog`]. It is
//! forwarded to `tracing` straight away and also kept, tagged with the export
//! object it belongs to, so the driver can show warnings and errors together
//! once the pass is over.

use std::fmt;

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    /// Export object that was being processed, if any
    pub object: Option<String>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => write!(f, "[{}] {}: {}", self.severity, object, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportLog {
    entries: Vec<LogEntry>,
    current_object: Option<String>,
}

impl ExportLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag following messages with `object`
    pub fn begin_object(&mut self, object: impl Into<String>) {
        self.current_object = Some(object.into());
    }

    pub fn end_object(&mut self) {
        self.current_object = None;
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(Severity::Debug, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message.into());
    }

    fn push(&mut self, severity: Severity, message: String) {
        let object = self.current_object.as_deref().unwrap_or("-");
        match severity {
            Severity::Debug => tracing::debug!(object, "{}", message),
            Severity::Info => tracing::info!(object, "{}", message),
            Severity::Warning => tracing::warn!(object, "{}", message),
            Severity::Error => tracing::error!(object, "{}", message),
        }
        self.entries.push(LogEntry {
            severity,
            object: self.current_object.clone(),
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Warnings and errors, in the order they were raised
    pub fn problems(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.severity >= Severity::Warning)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_object = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_tagged_with_object() {
        let mut log = ExportLog::new();
        log.info("pass started");
        log.begin_object("Box01");
        log.warn("no diffuse colours");
        log.end_object();

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].object, None);
        assert_eq!(entries[1].object.as_deref(), Some("Box01"));
        assert_eq!(entries[1].to_string(), "[warning] Box01: no diffuse colours");
    }

    #[test]
    fn test_problems_filter() {
        let mut log = ExportLog::new();
        log.debug("a");
        log.info("b");
        log.warn("c");
        log.error("d");
        let problems: Vec<_> = log.problems().map(|e| e.message.as_str()).collect();
        assert_eq!(problems, vec!["c", "d"]);
        assert_eq!(log.count(Severity::Error), 1);

        log.clear();
        assert!(log.entries().is_empty());
    }
}
