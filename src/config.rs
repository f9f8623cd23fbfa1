//! Pipeline configuration.
//!
//! Settings are read from an optional TOML file (`pipeline.toml` in the
//! working directory). Every section and field has a default, and the
//! defaults reproduce the reference analysis: 2012 onward, weeks ending on
//! Sunday, lags of 2/4/6/8 weeks, a 50/50 chronological split and a
//! depth-3 class-balanced tree seeded with 42.

use chrono::{NaiveDate, Weekday};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classifier::{ClassWeight, DecisionTreeConfig};
use crate::logging::LogLevel;
use crate::model::PipelineError;

/// Config file looked up in the working directory by the binary.
pub const DEFAULT_CONFIG_PATH: &str = "pipeline.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub temperature: TemperatureConfig,
    pub laying: LayingConfig,
    pub resample: ResampleConfig,
    pub features: FeatureConfig,
    pub split: SplitConfig,
    pub model: ModelConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub temperature_path: PathBuf,
    pub laying_path: PathBuf,
    /// Temperature rows before this date are discarded.
    pub series_start: NaiveDate,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            temperature_path: PathBuf::from("data/temperaturapulpos.csv"),
            laying_path: PathBuf::from("data/puestaspulpos.xlsx"),
            series_start: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or_default(),
        }
    }
}

/// Layout of the hourly temperature CSV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemperatureConfig {
    pub delimiter: char,
    pub decimal: char,
    pub year_column: String,
    pub month_column: String,
    pub day_column: String,
    pub hour_column: String,
    pub temp_column: String,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            delimiter: ';',
            decimal: ',',
            year_column: "Ano".to_string(),
            month_column: "Mes".to_string(),
            day_column: "Dia".to_string(),
            hour_column: "Hora".to_string(),
            temp_column: crate::model::TEMP_COLUMN.to_string(),
        }
    }
}

/// What to do when a Feb 29 template row meets a non-leap year column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapDayPolicy {
    /// Skip the cell if it holds no laying count, fail if it holds one.
    SkipEmpty,
    /// Always fail.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayingConfig {
    /// Worksheet to read; the first sheet when unset.
    pub sheet: Option<String>,
    pub date_column: String,
    /// Data rows kept below the header (366 covers leap years).
    pub max_rows: usize,
    pub leap_day_policy: LeapDayPolicy,
    /// Field separator used when the laying sheet is a CSV export.
    pub csv_delimiter: char,
}

impl Default for LayingConfig {
    fn default() -> Self {
        Self {
            sheet: None,
            date_column: "Fecha".to_string(),
            max_rows: 366,
            leap_day_policy: LeapDayPolicy::SkipEmpty,
            csv_delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleConfig {
    pub week_ending: Weekday,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { week_ending: Weekday::Sun }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureConfig {
    /// Lag offsets, in weeks.
    pub lags: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: crate::analysis::features::DEFAULT_LAGS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    pub train_ratio: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { train_ratio: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub class_weight: ClassWeight,
    pub random_seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let tree = DecisionTreeConfig::default();
        Self {
            max_depth: tree.max_depth,
            min_samples_split: tree.min_samples_split,
            class_weight: tree.class_weight,
            random_seed: tree.random_seed,
        }
    }
}

impl ModelConfig {
    pub fn tree_config(&self) -> DecisionTreeConfig {
        DecisionTreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            class_weight: self.class_weight,
            random_seed: self.random_seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub render_plots: bool,
    pub output_dir: PathBuf,
    /// Print the fitted tree as indented text after the report.
    pub print_tree: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            render_plots: true,
            output_dir: PathBuf::from("plots"),
            print_tree: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            timestamps: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl PipelineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the config file at `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| crate::model::io_error(path, e))?;
        Self::from_toml_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reads the config file at `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, PipelineError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.features.lags.is_empty() {
            return Err(PipelineError::Config("features.lags must not be empty".into()));
        }
        let ratio = self.split.train_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PipelineError::Config(format!(
                "split.train_ratio must lie strictly between 0 and 1, got {}",
                ratio
            )));
        }
        if self.model.max_depth == 0 {
            return Err(PipelineError::Config("model.max_depth must be at least 1".into()));
        }
        if self.model.min_samples_split < 2 {
            return Err(PipelineError::Config("model.min_samples_split must be at least 2".into()));
        }
        if self.laying.max_rows == 0 {
            return Err(PipelineError::Config("laying.max_rows must be at least 1".into()));
        }
        if self.temperature.delimiter == self.temperature.decimal {
            return Err(PipelineError::Config(
                "temperature.delimiter and temperature.decimal must differ".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_analysis() {
        let config = PipelineConfig::default();
        assert_eq!(config.data.series_start, NaiveDate::from_ymd_opt(2012, 1, 1).unwrap());
        assert_eq!(config.temperature.delimiter, ';');
        assert_eq!(config.temperature.decimal, ',');
        assert_eq!(config.laying.max_rows, 366);
        assert_eq!(config.laying.date_column, "Fecha");
        assert_eq!(config.resample.week_ending, Weekday::Sun);
        assert_eq!(config.features.lags, vec![2, 4, 6, 8]);
        assert_eq!(config.split.train_ratio, 0.5);
        assert_eq!(config.model.max_depth, 3);
        assert_eq!(config.model.class_weight, ClassWeight::Balanced);
        assert_eq!(config.model.random_seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = PipelineConfig::from_toml_str("").expect("empty config is valid");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [features]
            lags = [1, 3]

            [split]
            train_ratio = 0.6

            [resample]
            week_ending = "Sat"

            [laying]
            leap_day_policy = "fail"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.features.lags, vec![1, 3]);
        assert_eq!(config.split.train_ratio, 0.6);
        assert_eq!(config.resample.week_ending, Weekday::Sat);
        assert_eq!(config.laying.leap_day_policy, LeapDayPolicy::Fail);
        assert_eq!(config.model.max_depth, 3);
        assert_eq!(config.laying.max_rows, 366);
    }

    #[test]
    fn test_invalid_ratio_is_rejected() {
        for ratio in ["0.0", "1.0", "1.5", "-0.2"] {
            let text = format!("[split]\ntrain_ratio = {}", ratio);
            let result = PipelineConfig::from_toml_str(&text);
            assert!(
                matches!(result, Err(PipelineError::Config(_))),
                "ratio {} should be rejected, got {:?}",
                ratio,
                result
            );
        }
    }

    #[test]
    fn test_empty_lags_are_rejected() {
        let result = PipelineConfig::from_toml_str("[features]\nlags = []");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = PipelineConfig::from_toml_str("[model]\nmax_dept = 4");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PipelineConfig::load_or_default(&dir.path().join("pipeline.toml"))
            .expect("defaults");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[report]\nrender_plots = false\n").expect("write");
        let config = PipelineConfig::load(&path).expect("load");
        assert!(!config.report.render_plots);
    }

    #[test]
    fn test_model_config_converts_to_tree_config() {
        let tree = ModelConfig::default().tree_config();
        assert_eq!(tree, DecisionTreeConfig::default());
    }
}
