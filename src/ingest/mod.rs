/// Input file loaders.
///
/// - `temperature`: hourly temperature CSV reduced to daily means.
/// - `laying`     : per-day-of-year laying sheet reshaped to daily flags.

pub mod laying;
pub mod temperature;

pub use laying::load_laying_events;
pub use temperature::load_temperature;
