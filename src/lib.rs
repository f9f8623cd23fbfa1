/// Octopus egg-laying analysis.
///
/// Reads an hourly water-temperature series and a per-day laying sheet,
/// aggregates both to weeks, derives lagged temperature features and fits a
/// shallow decision tree that predicts whether laying occurs in a week.
///
/// Modules:
/// - `config`    : TOML pipeline settings.
/// - `logging`   : stage-tagged console/file logging.
/// - `model`     : shared record types and `PipelineError`.
/// - `ingest`    : temperature and laying file loaders.
/// - `analysis`  : join, weekly resampling, lag features, split.
/// - `classifier`: the decision tree.
/// - `report`    : metrics and charts.
/// - `pipeline`  : end-to-end run.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
