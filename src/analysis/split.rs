//! Chronological train/test split.
//!
//! Rows are never shuffled: the first `floor(ratio * n)` weeks train the
//! model and the remaining weeks test it, so no test week precedes a
//! training week.

use crate::model::{FeatureMatrix, FeatureRow, FeatureTable, LabelSeries, PipelineError, TrainTestSplit};

pub fn time_series_split(table: &FeatureTable, train_ratio: f64) -> Result<TrainTestSplit, PipelineError> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(PipelineError::Value(format!(
            "train ratio must lie strictly between 0 and 1, got {}",
            train_ratio
        )));
    }

    let cut = (table.len() as f64 * train_ratio).floor() as usize;
    let (train, test) = table.rows.split_at(cut.min(table.len()));

    let features = |rows: &[FeatureRow]| FeatureMatrix {
        feature_names: table.feature_names.clone(),
        index: rows.iter().map(|r| r.week_ending).collect(),
        rows: rows.iter().map(|r| r.lags.clone()).collect(),
    };
    let labels = |rows: &[FeatureRow]| LabelSeries {
        index: rows.iter().map(|r| r.week_ending).collect(),
        values: rows.iter().map(|r| r.occurred).collect(),
    };

    Ok(TrainTestSplit {
        x_train: features(train),
        x_test: features(test),
        y_train: labels(train),
        y_test: labels(test),
    })
}
