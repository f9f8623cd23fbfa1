//! End-to-end analysis run
//!
//! Loads both input files, builds the weekly lag-feature table, splits it
//! chronologically, fits the tree on the earlier half, scores it on the later
//! half and optionally renders the charts. Each stage prints a progress line
//! and logs a row-count summary.

use std::path::PathBuf;

use crate::analysis::features::create_lag_features;
use crate::analysis::merge::build_weekly_table;
use crate::analysis::split::time_series_split;
use crate::classifier::DecisionTree;
use crate::config::PipelineConfig;
use crate::ingest::{load_laying_events, load_temperature};
use crate::logging::{self, Stage};
use crate::model::{CLASS_NAMES, PipelineError};
use crate::report::metrics::{ClassificationReport, balanced_accuracy, classification_report};
use crate::report::{self, plots};

/// Everything a run produces, for callers that want more than the console.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub weekly_rows: usize,
    pub feature_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub tree: DecisionTree,
    pub predictions: Vec<u8>,
    pub report: ClassificationReport,
    pub balanced_accuracy: f64,
    /// SVG files written; empty when rendering is disabled.
    pub charts: Vec<PathBuf>,
}

pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome, PipelineError> {
    config.validate()?;

    // ------------------------------------------------------------------
    // Step 1: ingest, merge, features
    // ------------------------------------------------------------------
    println!("Step 1: Processing data and creating features...");
    let temps = load_temperature(
        &config.data.temperature_path,
        &config.temperature,
        config.data.series_start,
    )?;
    let laying = load_laying_events(&config.data.laying_path, &config.laying)?;

    let weekly = build_weekly_table(&temps, &laying, config.resample.week_ending);
    logging::log_stage_summary(Stage::Merge, "weekly resampling", temps.len().min(laying.len()), weekly.len());

    let table = create_lag_features(&weekly, &config.features.lags)?;
    logging::log_stage_summary(Stage::Features, "lag features", weekly.len(), table.len());
    if table.is_empty() {
        return Err(PipelineError::Value(format!(
            "{} weeks are not enough for lags {:?}",
            weekly.len(),
            config.features.lags
        )));
    }

    // ------------------------------------------------------------------
    // Step 2: split
    // ------------------------------------------------------------------
    println!("Step 2: Splitting data into training and test sets...");
    let split = time_series_split(&table, config.split.train_ratio)?;
    logging::info(
        Stage::Split,
        None,
        &format!("{} training weeks, {} test weeks", split.x_train.len(), split.x_test.len()),
    );
    let test_laying = split.y_test.values.iter().filter(|&&v| v == 1).count();
    if test_laying == 0 || test_laying == split.y_test.len() {
        logging::warn(
            Stage::Split,
            None,
            "test weeks contain a single class; balanced accuracy is capped at 0.5",
        );
    }

    // ------------------------------------------------------------------
    // Step 3: fit and evaluate
    // ------------------------------------------------------------------
    println!("Step 3: Training model and evaluating performance...");
    let tree = DecisionTree::fit(&config.model.tree_config(), &split.x_train, &split.y_train)?;
    logging::info(
        Stage::Model,
        None,
        &format!("fitted tree with depth {} and {} leaves", tree.depth(), tree.n_leaves()),
    );

    let predictions = tree.predict(&split.x_test)?;
    let evaluation = classification_report(&split.y_test.values, &predictions)?;
    let score = balanced_accuracy(&split.y_test.values, &predictions)?;
    report::print_evaluation(&evaluation, score);

    if config.report.print_tree {
        println!("\n--- Decision Tree ---");
        print!("{}", tree.export_text(&CLASS_NAMES));
    }

    // ------------------------------------------------------------------
    // Step 4: charts
    // ------------------------------------------------------------------
    let charts = if config.report.render_plots {
        println!("\nStep 4: Generating visualizations...");
        let paths = plots::render_charts(
            &config.report.output_dir,
            &split.y_train,
            &split.y_test,
            &predictions,
            &tree,
            &CLASS_NAMES,
        )?;
        for path in &paths {
            logging::info(Stage::Report, Some(&path.display().to_string()), "chart written");
        }
        paths
    } else {
        logging::debug(Stage::Report, None, "chart rendering disabled");
        Vec::new()
    };

    Ok(PipelineOutcome {
        weekly_rows: weekly.len(),
        feature_rows: table.len(),
        train_rows: split.x_train.len(),
        test_rows: split.x_test.len(),
        tree,
        predictions,
        report: evaluation,
        balanced_accuracy: score,
        charts,
    })
}
