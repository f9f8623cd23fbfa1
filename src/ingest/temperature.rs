/// Hourly temperature CSV loader
///
/// Reads the raw temperature export (one row per reading, `;`-separated
/// with decimal commas), builds a calendar date from the year/month/day
/// columns and reduces it to one mean temperature per day.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::TemperatureConfig;
use crate::logging::{self, Stage};
use crate::model::{DailyTemperature, PipelineError, io_error};

// ============================================================================
// Loader
// ============================================================================

/// Load the temperature file and aggregate it to daily means, keeping dates
/// on or after `series_start`.
pub fn load_temperature(
    path: &Path,
    config: &TemperatureConfig,
    series_start: NaiveDate,
) -> Result<Vec<DailyTemperature>, PipelineError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let context = path.display().to_string();

    let readings = parse_temperature_csv(&text, config)?;
    logging::debug(
        Stage::Temperature,
        Some(&context),
        &format!("parsed {} raw readings", readings.len()),
    );

    let daily = daily_means(&readings, series_start);
    logging::log_stage_summary(Stage::Temperature, "daily aggregation", readings.len(), daily.len());
    Ok(daily)
}

// ============================================================================
// Parsing
// ============================================================================

/// One reading from the source file. Hour is dropped on parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub date: NaiveDate,
    pub temp: Option<f64>,
}

struct ColumnIndex {
    year: usize,
    month: usize,
    day: usize,
    temp: usize,
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_start_matches('\u{feff}').trim_matches('"').trim()
}

fn locate_columns(header: &str, config: &TemperatureConfig) -> Result<ColumnIndex, PipelineError> {
    let names: Vec<&str> = header.split(config.delimiter).map(clean_field).collect();
    let find = |wanted: &str| -> Result<usize, PipelineError> {
        names
            .iter()
            .position(|n| *n == wanted)
            .ok_or_else(|| PipelineError::Parse(format!("missing column '{}' in header", wanted)))
    };
    // The hour column is not read, but a file without it is malformed.
    find(&config.hour_column)?;
    Ok(ColumnIndex {
        year: find(&config.year_column)?,
        month: find(&config.month_column)?,
        day: find(&config.day_column)?,
        temp: find(&config.temp_column)?,
    })
}

/// Builds the date the way the source export expects it: year followed by
/// month and day zero-padded to two digits, read back as `YYYYMMDD`.
pub fn build_date(year: &str, month: &str, day: &str) -> Result<NaiveDate, PipelineError> {
    let parse_part = |name: &str, raw: &str| -> Result<u32, PipelineError> {
        raw.parse::<u32>()
            .map_err(|_| PipelineError::Parse(format!("invalid {} '{}'", name, raw)))
    };
    let y = parse_part("year", year)?;
    let m = parse_part("month", month)?;
    let d = parse_part("day", day)?;

    let stamp = format!("{}{:02}{:02}", y, m, d);
    NaiveDate::parse_from_str(&stamp, "%Y%m%d")
        .map_err(|_| PipelineError::Parse(format!("invalid calendar date {}-{}-{}", year, month, day)))
}

/// Parses a locale-formatted number (e.g. `18,75` with a decimal comma).
/// Blank cells are missing values.
pub fn parse_decimal(raw: &str, decimal: char) -> Result<Option<f64>, PipelineError> {
    let raw = clean_field(raw);
    if raw.is_empty() {
        return Ok(None);
    }
    let normalized: String = raw
        .chars()
        .map(|c| if c == decimal { '.' } else { c })
        .collect();
    normalized
        .parse::<f64>()
        .map(Some)
        .map_err(|_| PipelineError::Parse(format!("invalid number '{}'", raw)))
}

/// Parse the CSV body into dated readings. The first line must be the header.
pub fn parse_temperature_csv(
    text: &str,
    config: &TemperatureConfig,
) -> Result<Vec<TemperatureReading>, PipelineError> {
    let mut lines = text.lines().enumerate();
    let header = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line,
            None => return Err(PipelineError::Parse("temperature file is empty".into())),
        }
    };
    let columns = locate_columns(header, config)?;

    let mut readings = Vec::new();
    for (i, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;
        let fields: Vec<&str> = line.split(config.delimiter).map(clean_field).collect();
        let field = |idx: usize| -> Result<&str, PipelineError> {
            fields.get(idx).copied().ok_or_else(|| {
                PipelineError::Parse(format!("line {}: expected at least {} fields", line_no, idx + 1))
            })
        };

        let date = build_date(field(columns.year)?, field(columns.month)?, field(columns.day)?)
            .map_err(|e| PipelineError::Parse(format!("line {}: {}", line_no, strip_prefix(&e))))?;
        let temp = parse_decimal(field(columns.temp)?, config.decimal)
            .map_err(|e| PipelineError::Parse(format!("line {}: {}", line_no, strip_prefix(&e))))?;

        readings.push(TemperatureReading { date, temp });
    }
    Ok(readings)
}

fn strip_prefix(err: &PipelineError) -> String {
    match err {
        PipelineError::Parse(msg) => msg.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Average all readings per calendar date and keep dates on or after
/// `series_start`. Blank readings do not count toward the mean.
pub fn daily_means(readings: &[TemperatureReading], series_start: NaiveDate) -> Vec<DailyTemperature> {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for reading in readings {
        let entry = by_date.entry(reading.date).or_insert((0.0, 0));
        if let Some(t) = reading.temp {
            entry.0 += t;
            entry.1 += 1;
        }
    }

    by_date
        .range(series_start..)
        .map(|(&date, &(sum, count))| DailyTemperature {
            date,
            temp: if count > 0 { Some(sum / count as f64) } else { None },
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
