/// Structured logging for the gas storage reporting run
///
/// Provides context-rich logging tagged with the pipeline stage and an
/// optional context (metric, category, file), timestamps, and severity
/// levels. Supports both console output and file-based logging for
/// scheduled runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::StorageError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
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

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level {:?}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Clean,
    Split,
    Chart,
    Render,
    Config,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "FETCH"),
            Stage::Clean => write!(f, "CLEAN"),
            Stage::Split => write!(f, "SPLIT"),
            Stage::Chart => write!(f, "CHART"),
            Stage::Render => write!(f, "RENDER"),
            Stage::Config => write!(f, "CONFIG"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - e.g. the portal is down for maintenance
    Expected,
    /// Unexpected failure - API change, bad config or a bug
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

/// Console output goes to stderr so that figure JSON on stdout stays clean.
pub struct Logger {
    threshold: LogLevel,
    file: Option<PathBuf>,
    timestamps: bool,
}

impl Logger {
    /// Installs the process-wide logger, replacing any earlier one.
    pub fn init(threshold: LogLevel, file: Option<PathBuf>, timestamps: bool) {
        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(Logger {
                threshold,
                file,
                timestamps,
            });
        }
    }

    fn format_entry(level: LogLevel, stage: Stage, context: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        format!("{} {}", timestamp, Self::format_line(level, stage, context, message))
    }

    fn format_line(level: LogLevel, stage: Stage, context: Option<&str>, message: &str) -> String {
        match context {
            Some(context) => format!("{} {} [{}]: {}", level, stage, context, message),
            None => format!("{} {}: {}", level, stage, message),
        }
    }

    fn write(&self, level: LogLevel, stage: Stage, context: Option<&str>, message: &str) {
        if level < self.threshold {
            return;
        }

        let entry = Self::format_entry(level, stage, context, message);
        if self.timestamps {
            eprintln!("{}", entry);
        } else {
            eprintln!("{}", Self::format_line(level, stage, context, message));
        }

        if let Some(path) = &self.file {
            if let Err(e) = Self::append_to_file(path, &entry) {
                eprintln!("cannot append to log file {}: {}", path.display(), e);
            }
        }
    }

    fn append_to_file(path: &Path, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

pub fn init_logger(threshold: LogLevel, file: Option<&Path>, timestamps: bool) {
    Logger::init(threshold, file.map(Path::to_path_buf), timestamps);
}

fn dispatch(level: LogLevel, stage: Stage, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.write(level, stage, context, message);
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
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a pipeline failure by its error kind.
pub fn classify_failure(err: &StorageError) -> FailureType {
    match err {
        // Gateway errors and timeouts usually mean the portal is briefly unavailable
        StorageError::HttpStatus(502..=504) | StorageError::Timeout(_) => FailureType::Expected,
        // Other HTTP statuses, parse and shape errors suggest an API change
        StorageError::HttpStatus(_)
        | StorageError::Parse(_)
        | StorageError::DataShape(_)
        | StorageError::Config(_) => FailureType::Unexpected,
        StorageError::Network(_) | StorageError::Io(_) | StorageError::Render(_) => {
            FailureType::Unknown
        }
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a stage failure with automatic classification
pub fn log_stage_failure(stage: Stage, operation: &str, err: &StorageError) {
    let failure_type = classify_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => warn(stage, None, &message),
        FailureType::Unexpected => error(stage, None, &message),
        FailureType::Unknown => warn(stage, None, &message),
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a completed run
pub fn log_run_summary(rows_fetched: usize, rows_charted: usize, rows_unmatched: usize) {
    let message = format!(
        "Run complete: {} rows fetched, {} charted, {} unmatched",
        rows_fetched, rows_charted, rows_unmatched
    );

    if rows_unmatched == 0 {
        info(Stage::System, None, &message);
    } else {
        warn(Stage::System, None, &message);
    }
}
