//! Pluggable sink for operational messages.
//!
//! Operations emit structured `tracing` events for every state change.
//! The [`Logger`] set on [`AccessConfig`](crate::config::AccessConfig)
//! additionally receives failures of best-effort side effects (invitation
//! delivery, audit recording) that are swallowed instead of returned.

use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Logger")
    }
}

/// Forwards to `tracing` under the `project_access` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "project_access", "{}", message),
            LogLevel::Info => tracing::info!(target: "project_access", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "project_access", "{}", message),
            LogLevel::Error => tracing::error!(target: "project_access", "{}", message),
        }
    }
}

/// Keeps every message in memory. Useful in tests that assert a swallowed
/// failure was reported.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_records_levels() {
        let logger = MemoryLogger::new();
        logger.warn("notifier failed: smtp down");
        logger.info("invitation issued");

        assert!(logger.contains(LogLevel::Warn, "smtp down"));
        assert!(!logger.contains(LogLevel::Error, "smtp down"));
        assert_eq!(logger.entries().len(), 2);
    }

    #[test]
    fn test_memory_logger_clones_share_entries() {
        let logger = MemoryLogger::new();
        let shared: Arc<dyn Logger> = Arc::new(logger.clone());
        shared.error("audit sink unavailable");
        assert!(logger.contains(LogLevel::Error, "audit sink"));
    }
}
