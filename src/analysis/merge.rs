//! Daily join and weekly resampling.
//!
//! The temperature and laying series are aligned with an inner join on the
//! calendar date, so any date missing from either side is dropped. The
//! joined days are then bucketed into calendar weeks ending on a fixed
//! weekday: temperature is averaged, the laying flag takes the max.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

use crate::model::{DailyObservation, DailyTemperature, LayingRecord, WeeklyRecord};

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Keep only the dates present in both series, in ascending date order.
///
/// A date listed more than once in the laying series keeps the max flag.
pub fn inner_join(temps: &[DailyTemperature], laying: &[LayingRecord]) -> Vec<DailyObservation> {
    let mut flags: BTreeMap<NaiveDate, u8> = BTreeMap::new();
    for record in laying {
        let flag = flags.entry(record.date).or_insert(0);
        *flag = (*flag).max(record.occurred);
    }

    let mut joined: Vec<DailyObservation> = temps
        .iter()
        .filter_map(|t| {
            flags.get(&t.date).map(|&occurred| DailyObservation {
                date: t.date,
                temp: t.temp,
                occurred,
            })
        })
        .collect();
    joined.sort_by_key(|o| o.date);
    joined
}

// ---------------------------------------------------------------------------
// Resample
// ---------------------------------------------------------------------------

/// Label of the week bucket containing `date`: the first `week_ending` day
/// on or after it.
pub fn week_ending_for(date: NaiveDate, week_ending: Weekday) -> NaiveDate {
    let target = week_ending.num_days_from_monday() as i64;
    let current = date.weekday().num_days_from_monday() as i64;
    date + Duration::days((target - current).rem_euclid(7))
}

#[derive(Default)]
struct WeekBucket {
    temp_sum: f64,
    temp_count: usize,
    occurred: u8,
}

/// Bucket daily observations into weeks.
///
/// Weeks in which no day carried a temperature have no mean and are
/// dropped, as are weeks with no observations at all (they never appear).
pub fn resample_weekly(daily: &[DailyObservation], week_ending: Weekday) -> Vec<WeeklyRecord> {
    let mut buckets: BTreeMap<NaiveDate, WeekBucket> = BTreeMap::new();
    for obs in daily {
        let bucket = buckets.entry(week_ending_for(obs.date, week_ending)).or_default();
        if let Some(t) = obs.temp {
            bucket.temp_sum += t;
            bucket.temp_count += 1;
        }
        bucket.occurred = bucket.occurred.max(obs.occurred);
    }

    buckets
        .into_iter()
        .filter(|(_, b)| b.temp_count > 0)
        .map(|(week, b)| WeeklyRecord {
            week_ending: week,
            temp: b.temp_sum / b.temp_count as f64,
            occurred: b.occurred,
        })
        .collect()
}

/// Join both daily series and resample the result to weeks.
pub fn build_weekly_table(
    temps: &[DailyTemperature],
    laying: &[LayingRecord],
    week_ending: Weekday,
) -> Vec<WeeklyRecord> {
    resample_weekly(&inner_join(temps, laying), week_ending)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
