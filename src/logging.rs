/// Structured logging for the laying analysis pipeline
///
/// Provides leveled logging tagged with the pipeline stage that produced
/// the message, plus an optional context (usually an input path).
/// Supports console output and append-only file logging.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Temperature,
    Laying,
    Merge,
    Features,
    Split,
    Model,
    Report,
    Pipeline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Config => write!(f, "CFG"),
            Stage::Temperature => write!(f, "TEMP"),
            Stage::Laying => write!(f, "LAY"),
            Stage::Merge => write!(f, "MERGE"),
            Stage::Features => write!(f, "FEAT"),
            Stage::Split => write!(f, "SPLIT"),
            Stage::Model => write!(f, "MODEL"),
            Stage::Report => write!(f, "REPORT"),
            Stage::Pipeline => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, stage: Stage, context: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, stage, context_part, message)
    }

    fn log(&self, level: LogLevel, stage: Stage, context: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, stage, context, message);
        let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", stage, context_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", stage, context_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", stage, context_part, message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, stage: Stage, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, stage, context, message);
        }
    }
}

/// Log a general informational message
pub fn info(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, stage, context, message);
}

/// Log a warning message
pub fn warn(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, stage, context, message);
}

/// Log an error message
pub fn error(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, stage, context, message);
}

/// Log a debug message
pub fn debug(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, stage, context, message);
}

// ---------------------------------------------------------------------------
// Stage Summary Logging
// ---------------------------------------------------------------------------

/// Severity of a stage summary: info while rows survive, a warning when the
/// stage had nothing to process, an error when it lost every input row.
pub fn summary_level(rows_in: usize, rows_out: usize) -> LogLevel {
    if rows_out > 0 {
        LogLevel::Info
    } else if rows_in == 0 {
        LogLevel::Warning
    } else {
        LogLevel::Error
    }
}

/// Log how many rows a stage consumed and produced.
pub fn log_stage_summary(stage: Stage, what: &str, rows_in: usize, rows_out: usize) {
    let message = format!("{}: {} rows in, {} rows out", what, rows_in, rows_out);
    dispatch(summary_level(rows_in, rows_out), stage, None, &message);
}
