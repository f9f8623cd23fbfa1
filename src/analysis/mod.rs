/// Table transformations between ingest and modeling.
///
/// Everything here is a pure function over owned rows; no I/O.
///
/// Submodules:
/// - `merge`   : inner join of the daily series and weekly resampling.
/// - `features`: lagged temperature features.
/// - `split`   : chronological train/test split.

pub mod features;
pub mod merge;
pub mod split;
