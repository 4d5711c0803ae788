//! Structured logging for the speed test job
//!
//! Every log line is a single JSON object written to standard output:
//! `time`, `level`, `msg`, `logger`, `run_id`, followed by the entry's
//! structured fields. The logger is a cheap cloneable handle that is carried
//! through the run on a [`RunContext`](crate::context::RunContext) instead of
//! living in a global.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Progress of a successful run
    Info,
    /// The error that terminated the run
    Error,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INFO" => Ok(LogLevel::Info),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub time: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub msg: String,
    /// Logger name/component
    pub logger: String,
    /// Identifier shared by every line of one run
    pub run_id: String,
    /// Additional structured fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// JSON logger handle; clones share the same sink and run id
#[derive(Clone)]
pub struct Logger {
    name: String,
    run_id: String,
    sink: Sink,
}

impl Logger {
    /// Logger writing to standard output
    pub fn stdout(name: &str) -> Self {
        Self::with_writer(name, io::stdout())
    }

    /// Logger writing to an arbitrary sink
    pub fn with_writer<W: Write + Send + 'static>(name: &str, writer: W) -> Self {
        Self {
            name: name.to_string(),
            run_id: Uuid::new_v4().to_string(),
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Logger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Correlation id attached to every entry
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    fn write_entry(&self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"level\":\"ERROR\",\"msg\":\"failed to serialize log entry\",\"original\":{:?}}}",
                entry.msg
            ),
        };

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(sink, "{}", line);
        let _ = sink.flush();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, msg: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                time: Utc::now(),
                level,
                msg,
                logger: logger.name.clone(),
                run_id: logger.run_id.clone(),
                fields: serde_json::Map::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        let builder = self
            .field("error", error.to_string())
            .field("error_category", error.category());
        match error.probe_stage() {
            Some(stage) => builder.field("probe", stage.as_str()),
            None => builder,
        }
    }

    /// Finalize and write the log entry
    pub fn log(self) {
        self.logger.write_entry(&self.entry);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// In-memory sink shared between a logger and the test reading it
    #[derive(Clone, Default)]
    pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub fn lines(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
