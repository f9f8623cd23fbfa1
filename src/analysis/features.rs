//! Lagged temperature features.
//!
//! Each lag `k` adds a column `Temp_Lag_{k}w` holding the temperature from
//! `k` rows earlier in the weekly table. The shift runs along the row index,
//! not the calendar, so a gap between two weeks counts as one step.

use crate::model::{FeatureRow, FeatureTable, PipelineError, WeeklyRecord};

/// Lag offsets in weeks used when none are configured.
pub const DEFAULT_LAGS: [usize; 4] = [2, 4, 6, 8];

pub fn lag_column_name(lag: usize) -> String {
    format!("Temp_Lag_{}w", lag)
}

/// Build the lag-feature table from the weekly series.
///
/// The first `max(lags)` weeks lack a full history and are discarded, so the
/// output has `weekly.len() - max(lags)` rows (none if the series is
/// shorter). The raw weekly temperature is not carried over.
pub fn create_lag_features(weekly: &[WeeklyRecord], lags: &[usize]) -> Result<FeatureTable, PipelineError> {
    let max_lag = lags
        .iter()
        .copied()
        .max()
        .ok_or_else(|| PipelineError::Value("at least one lag is required".into()))?;

    let rows = weekly
        .iter()
        .enumerate()
        .skip(max_lag)
        .map(|(i, week)| FeatureRow {
            week_ending: week.week_ending,
            lags: lags.iter().map(|&lag| weekly[i - lag].temp).collect(),
            occurred: week.occurred,
        })
        .collect();

    Ok(FeatureTable {
        feature_names: lags.iter().map(|&lag| lag_column_name(lag)).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn weekly_series(temps: &[f64]) -> Vec<WeeklyRecord> {
        let first = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap();
        temps
            .iter()
            .enumerate()
            .map(|(i, &temp)| WeeklyRecord {
                week_ending: first + Duration::weeks(i as i64),
                temp,
                occurred: (i % 3 == 0) as u8,
            })
            .collect()
    }

    #[test]
    fn test_lags_two_and_four_on_ten_weeks() {
        let temps: Vec<f64> = (10..20).map(f64::from).collect();
        let weekly = weekly_series(&temps);
        let table = create_lag_features(&weekly, &[2, 4]).unwrap();

        assert_eq!(table.feature_names, vec!["Temp_Lag_2w", "Temp_Lag_4w"]);
        assert_eq!(table.len(), 6);

        // Weeks 0-3 lack a 4-week history.
        assert_eq!(table.rows[0].week_ending, weekly[4].week_ending);
        for week in &weekly[..4] {
            assert!(table.rows.iter().all(|r| r.week_ending != week.week_ending));
        }

        let last = table.rows.last().unwrap();
        assert_eq!(last.week_ending, weekly[9].week_ending);
        assert_eq!(last.lags, vec![17.0, 15.0]);
    }

    #[test]
    fn test_every_lag_matches_the_shifted_source_row() {
        let temps: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin() * 5.0 + 18.0).collect();
        let weekly = weekly_series(&temps);
        let lags = DEFAULT_LAGS;
        let table = create_lag_features(&weekly, &lags).unwrap();

        assert_eq!(table.len(), weekly.len() - 8);
        for (offset, row) in table.rows.iter().enumerate() {
            let i = offset + 8;
            assert_eq!(row.occurred, weekly[i].occurred);
            for (k, &lag) in lags.iter().enumerate() {
                assert_eq!(row.lags[k], weekly[i - lag].temp);
            }
        }
    }

    #[test]
    fn test_default_column_names() {
        let table = create_lag_features(&weekly_series(&[1.0; 12]), &DEFAULT_LAGS).unwrap();
        assert_eq!(
            table.feature_names,
            vec!["Temp_Lag_2w", "Temp_Lag_4w", "Temp_Lag_6w", "Temp_Lag_8w"]
        );
    }

    #[test]
    fn test_series_shorter_than_max_lag_yields_no_rows() {
        let table = create_lag_features(&weekly_series(&[1.0, 2.0, 3.0]), &[2, 4]).unwrap();
        assert!(table.is_empty());
        let table = create_lag_features(&weekly_series(&[1.0, 2.0, 3.0, 4.0]), &[2, 4]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_empty_lag_list_is_value_error() {
        let err = create_lag_features(&weekly_series(&[1.0]), &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Value(_)));
    }
}
