//! Named loggers for the compiler and compilations.

use std::{
    fmt,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Error,
    Warn,
    Info,
    Log,
    Debug,
    Trace,
    Status,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogType::Error => "error",
            LogType::Warn => "warn",
            LogType::Info => "info",
            LogType::Log => "log",
            LogType::Debug => "debug",
            LogType::Trace => "trace",
            LogType::Status => "status",
        };
        f.write_str(s)
    }
}

/// One recorded log call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: LogType,
    pub args: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub time: u64,
}

impl LogEntry {
    pub fn new(kind: LogType, args: Vec<String>) -> Self {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self { kind, args, time }
    }

    pub fn message(&self) -> String {
        self.args.join(" ")
    }
}

type Sink = Arc<dyn Fn(&str, LogEntry) + Send + Sync>;

/// A logger that forwards every call to a sink under its name.
#[derive(Clone)]
pub struct Logger {
    name: String,
    sink: Sink,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}

impl Logger {
    pub fn new(name: impl Into<String>, sink: impl Fn(&str, LogEntry) + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            sink: Arc::new(sink),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A logger named `{self}/{name}` writing to the same sink.
    pub fn child(&self, name: &str) -> Logger {
        Logger {
            name: format!("{}/{}", self.name, name),
            sink: self.sink.clone(),
        }
    }

    pub fn log_entry(&self, kind: LogType, args: Vec<String>) {
        (self.sink)(&self.name, LogEntry::new(kind, args));
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log_entry(LogType::Error, vec![message.to_string()]);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log_entry(LogType::Warn, vec![message.to_string()]);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log_entry(LogType::Info, vec![message.to_string()]);
    }

    pub fn log(&self, message: impl fmt::Display) {
        self.log_entry(LogType::Log, vec![message.to_string()]);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log_entry(LogType::Debug, vec![message.to_string()]);
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log_entry(LogType::Trace, vec![message.to_string()]);
    }

    pub fn status(&self, message: impl fmt::Display) {
        self.log_entry(LogType::Status, vec![message.to_string()]);
    }
}

/// Write a log entry that no listener claimed through `tracing`.
pub(crate) fn forward_to_tracing(name: &str, entry: &LogEntry) {
    let message = entry.message();
    match entry.kind {
        LogType::Error => tracing::error!(target: "packhook::infrastructure", logger = name, "{message}"),
        LogType::Warn => tracing::warn!(target: "packhook::infrastructure", logger = name, "{message}"),
        LogType::Info | LogType::Log | LogType::Status => {
            tracing::info!(target: "packhook::infrastructure", logger = name, "{message}")
        }
        LogType::Debug => tracing::debug!(target: "packhook::infrastructure", logger = name, "{message}"),
        LogType::Trace => tracing::trace!(target: "packhook::infrastructure", logger = name, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_child_logger_shares_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let logger = Logger::new("Compiler", move |name, entry| {
            sink.lock().push((name.to_string(), entry.kind, entry.message()));
        });

        logger.info("starting");
        logger.child("cache").warn("stale entry");

        assert_eq!(
            *seen.lock(),
            vec![
                ("Compiler".to_string(), LogType::Info, "starting".to_string()),
                ("Compiler/cache".to_string(), LogType::Warn, "stale entry".to_string()),
            ]
        );
    }
}
