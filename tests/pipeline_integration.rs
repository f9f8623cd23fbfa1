/// Integration tests for the full laying analysis run
///
/// Each test writes a small synthetic temperature CSV and laying sheet into a
/// temp directory, points a `PipelineConfig` at them and runs every stage.
///
/// Run with: cargo test --test pipeline_integration

use chrono::{Datelike, Duration, NaiveDate};
use octopus_laying::config::PipelineConfig;
use octopus_laying::model::PipelineError;
use octopus_laying::pipeline;
use octopus_laying::report::plots::{PREDICTIONS_FILE, TREE_FILE};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Four readings a day with a seasonal cycle peaking in late summer.
/// Written with decimal commas and unpadded month/day like the field export.
fn write_temperature_csv(path: &Path, first: NaiveDate, last: NaiveDate) {
    let mut text = String::from("Ano;Mes;Dia;Hora;Temp\n");
    let mut day = first;
    while day <= last {
        let season = (2.0 * PI * (day.ordinal() as f64 - 120.0) / 365.0).sin();
        for hour in [0, 6, 12, 18] {
            let temp = 17.0 + 4.0 * season + hour as f64 * 0.05;
            let formatted = format!("{:.2}", temp).replace('.', ",");
            text.push_str(&format!(
                "{};{};{};{};{}\n",
                day.year(),
                day.month(),
                day.day(),
                hour,
                formatted
            ));
        }
        day += Duration::days(1);
    }
    fs::write(path, text).unwrap();
}

/// Template column over the leap year 2000, one column per year, a blank
/// trailing column and a totals row past the 366 day rows.
fn write_laying_csv(path: &Path, years: &[i32]) {
    let mut text = String::from("Fecha");
    for y in years {
        text.push_str(&format!(",{}", y));
    }
    text.push_str(",Unnamed: 3\n");

    let mut day = ymd(2000, 1, 1);
    while day.year() == 2000 {
        text.push_str(&day.format("%d/%m/%Y").to_string());
        for _ in years {
            let count = if (6..=8).contains(&day.month()) { 3 } else { 0 };
            text.push_str(&format!(",{}", count));
        }
        text.push_str(",\n");
        day += Duration::days(1);
    }
    text.push_str("Total");
    for _ in years {
        text.push_str(",276");
    }
    text.push_str(",\n");
    fs::write(path, text).unwrap();
}

fn config_for(dir: &TempDir, render_plots: bool) -> PipelineConfig {
    let toml = format!(
        r#"
[data]
temperature_path = "{temp}"
laying_path = "{laying}"

[laying]
csv_delimiter = ","

[report]
render_plots = {render}
output_dir = "{plots}"
print_tree = true
"#,
        temp = dir.path().join("temperatura.csv").display(),
        laying = dir.path().join("puestas.csv").display(),
        plots = dir.path().join("plots").display(),
        render = render_plots,
    );
    PipelineConfig::from_toml_str(&toml).expect("fixture config should parse")
}

fn two_year_fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_temperature_csv(&dir.path().join("temperatura.csv"), ymd(2011, 12, 20), ymd(2013, 12, 31));
    write_laying_csv(&dir.path().join("puestas.csv"), &[2012, 2013]);
    dir
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_full_run_produces_report_and_charts() {
    let dir = two_year_fixture();
    let config = config_for(&dir, true);

    let outcome = pipeline::run(&config).expect("pipeline should succeed");

    // 2012-01-01 (a Sunday) through the week ending 2014-01-05.
    assert_eq!(outcome.weekly_rows, 106);
    assert_eq!(outcome.feature_rows, outcome.weekly_rows - 8);
    assert_eq!(outcome.train_rows, outcome.feature_rows / 2);
    assert_eq!(outcome.train_rows + outcome.test_rows, outcome.feature_rows);
    assert_eq!(outcome.predictions.len(), outcome.test_rows);

    assert!((0.0..=1.0).contains(&outcome.balanced_accuracy));
    assert_eq!(outcome.report.total_support(), outcome.test_rows);
    assert!(outcome.tree.depth() <= 3);
    assert_eq!(outcome.tree.feature_names().len(), 4);

    let plots = dir.path().join("plots");
    assert_eq!(outcome.charts, vec![plots.join(PREDICTIONS_FILE), plots.join(TREE_FILE)]);
    for chart in &outcome.charts {
        let svg = fs::read_to_string(chart).unwrap();
        assert!(svg.contains("<svg"), "{} is not an SVG", chart.display());
    }
}

#[test]
fn test_seasonal_signal_is_learned() {
    let dir = two_year_fixture();
    let outcome = pipeline::run(&config_for(&dir, false)).unwrap();

    // Both years share the same season, so the second is easy to predict.
    assert!(
        outcome.balanced_accuracy > 0.8,
        "balanced accuracy {}",
        outcome.balanced_accuracy
    );
    assert!(outcome.report.classes[1].support > 0);
}

#[test]
fn test_runs_are_deterministic() {
    let dir = two_year_fixture();
    let config = config_for(&dir, false);

    let first = pipeline::run(&config).unwrap();
    let second = pipeline::run(&config).unwrap();
    assert_eq!(first.predictions, second.predictions);
    assert_eq!(first.tree.nodes(), second.tree.nodes());
}

#[test]
fn test_disabled_rendering_writes_nothing() {
    let dir = two_year_fixture();
    let outcome = pipeline::run(&config_for(&dir, false)).unwrap();

    assert!(outcome.charts.is_empty());
    assert!(!dir.path().join("plots").exists());
}

#[test]
fn test_missing_temperature_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_laying_csv(&dir.path().join("puestas.csv"), &[2012]);

    let err = pipeline::run(&config_for(&dir, false)).unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(ref p) if p.contains("temperatura.csv")), "{:?}", err);
}

#[test]
fn test_missing_laying_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_temperature_csv(&dir.path().join("temperatura.csv"), ymd(2012, 1, 1), ymd(2012, 3, 1));

    let err = pipeline::run(&config_for(&dir, false)).unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(ref p) if p.contains("puestas.csv")), "{:?}", err);
}

#[test]
fn test_too_few_weeks_for_lags_is_value_error() {
    let dir = tempfile::tempdir().unwrap();
    write_temperature_csv(&dir.path().join("temperatura.csv"), ymd(2012, 1, 1), ymd(2012, 1, 31));
    write_laying_csv(&dir.path().join("puestas.csv"), &[2012]);

    let err = pipeline::run(&config_for(&dir, false)).unwrap_err();
    assert!(matches!(err, PipelineError::Value(_)), "{:?}", err);
}
