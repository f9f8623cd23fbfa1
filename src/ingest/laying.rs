/// Egg-laying spreadsheet loader
///
/// The laying workbook holds one row per day of the year and one column per
/// observation year:
///
/// ```text
///   Fecha       2012  2013  2014  Unnamed: 4
///   01/01/2000           1
///   02/01/2000     2
///   ...
/// ```
///
/// `Fecha` is a template day/month (its year is a placeholder). Cells hold
/// laying counts or are blank. The loader reshapes the grid into one binary
/// flag per real calendar date.
///
/// Workbooks (xlsx/xls/ods) are read through calamine; a `.csv` export of
/// the same sheet is also accepted.

use calamine::{Data, DataType, Reader, open_workbook_auto};
use chrono::{Datelike, Duration, NaiveDate};
use std::path::Path;

use crate::config::{LayingConfig, LeapDayPolicy};
use crate::logging::{self, Stage};
use crate::model::{LayingRecord, PipelineError, io_error};

// ============================================================================
// Cell Model
// ============================================================================

/// A spreadsheet cell, reduced to what the loader cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl SheetCell {
    /// Header text of a column. Whole-number headers (years stored as
    /// numbers) render without a fractional part.
    fn header_name(&self) -> String {
        match self {
            SheetCell::Empty => String::new(),
            SheetCell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            SheetCell::Number(n) => n.to_string(),
            SheetCell::Text(s) => s.trim().to_string(),
            SheetCell::Date(d) => d.to_string(),
        }
    }

    /// Laying count with missing cells filled as 0. Text that is not a
    /// number still counts as an observation.
    fn count(&self) -> f64 {
        match self {
            SheetCell::Empty => 0.0,
            SheetCell::Number(n) => *n,
            SheetCell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.replace(',', ".").parse::<f64>().unwrap_or(1.0)
                }
            }
            SheetCell::Date(_) => 1.0,
        }
    }
}

fn cell_from_data(data: &Data) -> SheetCell {
    match data {
        Data::Empty => SheetCell::Empty,
        Data::Int(i) => SheetCell::Number(*i as f64),
        Data::Float(f) => SheetCell::Number(*f),
        Data::Bool(b) => SheetCell::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => SheetCell::Text(s.clone()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_date() {
            Some(d) => SheetCell::Date(d),
            None => SheetCell::Text(data.to_string()),
        },
        Data::DurationIso(s) => SheetCell::Text(s.clone()),
        Data::Error(_) => SheetCell::Empty,
    }
}

// ============================================================================
// Readers
// ============================================================================

/// Load the laying sheet at `path` and reshape it into binary daily flags.
pub fn load_laying_events(path: &Path, config: &LayingConfig) -> Result<Vec<LayingRecord>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::NotFound(path.display().to_string()));
    }
    let context = path.display().to_string();

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let grid = if is_csv {
        let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        parse_csv_grid(&text, config.csv_delimiter)
    } else {
        read_workbook_grid(path, config.sheet.as_deref())?
    };
    logging::debug(
        Stage::Laying,
        Some(&context),
        &format!("read {} rows from laying sheet", grid.len()),
    );

    let records = parse_laying_grid(&grid, config)?;
    logging::log_stage_summary(
        Stage::Laying,
        "reshape to daily flags",
        grid.len().saturating_sub(1),
        records.len(),
    );
    Ok(records)
}

fn read_workbook_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<SheetCell>>, PipelineError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PipelineError::Parse(format!("{}: {}", path.display(), e)))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::Parse(format!("{}: workbook has no sheets", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PipelineError::Parse(format!("{} [{}]: {}", path.display(), sheet_name, e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect())
}

/// Split a CSV export into cells. Numbers become `Number`, blanks `Empty`,
/// everything else `Text` (template dates are resolved later).
pub fn parse_csv_grid(text: &str, delimiter: char) -> Vec<Vec<SheetCell>> {
    text.lines()
        .map(|line| {
            line.split(delimiter)
                .map(|raw| {
                    let raw = raw.trim().trim_start_matches('\u{feff}').trim_matches('"').trim();
                    if raw.is_empty() {
                        SheetCell::Empty
                    } else if let Ok(n) = raw.parse::<f64>() {
                        SheetCell::Number(n)
                    } else {
                        SheetCell::Text(raw.to_string())
                    }
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// Reshaping
// ============================================================================

/// Columns pandas would have labelled `Unnamed: N` (blank headers), or that
/// already carry that label from an earlier export.
pub fn is_unnamed_column(name: &str) -> bool {
    name.is_empty() || name.starts_with("Unnamed")
}

/// Year columns: headers that are plain integers.
fn year_from_header(name: &str) -> Option<i32> {
    name.parse::<i32>().ok()
}

/// Days between the Excel epoch (1899-12-30) and a serial date.
fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Resolve a template-date cell. `Ok(None)` means the cell is blank.
pub fn template_date(cell: &SheetCell) -> Result<Option<NaiveDate>, PipelineError> {
    match cell {
        SheetCell::Empty => Ok(None),
        SheetCell::Date(d) => Ok(Some(*d)),
        SheetCell::Number(n) => from_excel_serial(*n)
            .map(Some)
            .ok_or_else(|| PipelineError::Parse(format!("invalid serial date {}", n))),
        SheetCell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"] {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return Ok(Some(d));
                }
            }
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Ok(Some(dt.date()));
            }
            // Day/month only: borrow a leap placeholder year so 29/02 resolves.
            if let Ok(d) = NaiveDate::parse_from_str(&format!("{}/2000", s), "%d/%m/%Y") {
                return Ok(Some(d));
            }
            Err(PipelineError::Parse(format!("invalid template date '{}'", s)))
        }
    }
}

fn is_leap_day(date: NaiveDate) -> bool {
    date.month() == 2 && date.day() == 29
}

/// Reshape the wide laying grid (header row first) into binary daily flags.
///
/// Output order is year-major: every day of the first year column, then the
/// next year column, and so on.
pub fn parse_laying_grid(grid: &[Vec<SheetCell>], config: &LayingConfig) -> Result<Vec<LayingRecord>, PipelineError> {
    let header = grid
        .first()
        .ok_or_else(|| PipelineError::Parse("laying sheet is empty".into()))?;
    let names: Vec<String> = header.iter().map(SheetCell::header_name).collect();

    let date_col = names
        .iter()
        .position(|n| *n == config.date_column)
        .ok_or_else(|| PipelineError::Parse(format!("missing '{}' column", config.date_column)))?;

    let year_cols: Vec<(usize, i32)> = names
        .iter()
        .enumerate()
        .filter(|(i, n)| *i != date_col && !is_unnamed_column(n))
        .filter_map(|(i, n)| year_from_header(n).map(|y| (i, y)))
        .collect();

    let body: Vec<&Vec<SheetCell>> = grid.iter().skip(1).take(config.max_rows).collect();

    let templates = body
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cell = row.get(date_col).unwrap_or(&SheetCell::Empty);
            template_date(cell).map_err(|e| match e {
                PipelineError::Parse(msg) => PipelineError::Parse(format!("row {}: {}", i + 2, msg)),
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(body.len() * year_cols.len());
    for &(col, year) in &year_cols {
        for (row, template) in body.iter().zip(&templates) {
            let Some(template) = template else {
                continue;
            };
            let count = row.get(col).unwrap_or(&SheetCell::Empty).count();

            let date = match template.with_year(year) {
                Some(d) => d,
                None if is_leap_day(*template)
                    && config.leap_day_policy == LeapDayPolicy::SkipEmpty
                    && count == 0.0 =>
                {
                    logging::debug(Stage::Laying, None, &format!("skipped empty Feb 29 for {}", year));
                    continue;
                }
                None => {
                    return Err(PipelineError::Parse(format!(
                        "{} does not exist in {} (laying count {})",
                        template.format("%d/%m"),
                        year,
                        count
                    )));
                }
            };

            records.push(LayingRecord {
                date,
                occurred: binarize(count),
            });
        }
    }
    Ok(records)
}

/// Any nonzero count is a laying event.
pub fn binarize(count: f64) -> u8 {
    if count != 0.0 { 1 } else { 0 }
}

// ============================================================================
// Tests
// ============================================================================
