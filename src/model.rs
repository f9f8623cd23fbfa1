//! Core data types for the octopus egg-laying analysis.
//!
//! This module defines the shared domain model imported by all other modules:
//! the daily and weekly records produced along the pipeline, the feature and
//! label tables handed to the classifier, and the pipeline error type.
//! It contains no I/O.

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Name of the laying-flag column (the classifier label).
pub const LABEL_COLUMN: &str = "Puestas";

/// Name of the raw temperature column in the source CSV.
pub const TEMP_COLUMN: &str = "Temp";

/// Display names for label 0 and label 1, in that order.
pub const CLASS_NAMES: [&str; 2] = ["No Laying", "Laying"];

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Mean temperature for a single calendar date.
///
/// `temp` is `None` when the date appeared in the source file but every
/// reading for it was blank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyTemperature {
    pub date: NaiveDate,
    pub temp: Option<f64>,
}

/// Whether any egg laying was observed on a date (0 = no, 1 = yes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayingRecord {
    pub date: NaiveDate,
    pub occurred: u8,
}

/// A date present in both the temperature and the laying series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub temp: Option<f64>,
    pub occurred: u8,
}

/// One calendar week after resampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyRecord {
    /// Last day of the week bucket (the bucket label).
    pub week_ending: NaiveDate,
    /// Mean of the daily temperatures that fell in the week.
    pub temp: f64,
    /// Max of the daily laying flags that fell in the week.
    pub occurred: u8,
}

// ---------------------------------------------------------------------------
// Feature and label tables
// ---------------------------------------------------------------------------

/// One row of engineered features for a week.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub week_ending: NaiveDate,
    /// Lagged temperatures, aligned with `FeatureTable::feature_names`.
    pub lags: Vec<f64>,
    pub occurred: u8,
}

/// The lag-feature table: feature columns plus the laying label.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub feature_names: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Feature block (X) with its chronological index.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub index: Vec<NaiveDate>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Label block (y) with its chronological index.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSeries {
    pub index: Vec<NaiveDate>,
    pub values: Vec<u8>,
}

impl LabelSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Output of the chronological train/test split.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: LabelSeries,
    pub y_test: LabelSeries,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can abort a pipeline run.
///
/// No stage recovers from an error raised by an earlier one; the first
/// error ends the run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// An input file does not exist.
    NotFound(String),
    /// A date, number or header in an input file could not be understood.
    Parse(String),
    /// Empty or degenerate input to a computation (e.g. single-class labels).
    Value(String),
    /// The file exists but could not be read.
    Io(String),
    /// The configuration file is unreadable or holds invalid settings.
    Config(String),
    /// A chart could not be drawn or written.
    Render(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::NotFound(path) => write!(f, "File not found: {}", path),
            PipelineError::Parse(msg) => write!(f, "Parse error: {}", msg),
            PipelineError::Value(msg) => write!(f, "Value error: {}", msg),
            PipelineError::Io(msg) => write!(f, "I/O error: {}", msg),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::Render(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Maps an I/O failure on `path` to `NotFound` or `Io`.
pub fn io_error(path: &std::path::Path, err: std::io::Error) -> PipelineError {
    if err.kind() == std::io::ErrorKind::NotFound {
        PipelineError::NotFound(path.display().to_string())
    } else {
        PipelineError::Io(format!("{}: {}", path.display(), err))
    }
}
