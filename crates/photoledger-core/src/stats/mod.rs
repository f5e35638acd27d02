//! Aggregate review statistics per group.

mod cache;
mod model;

pub use cache::StatisticsCache;
pub use model::{DEFAULT_HEAT_THRESHOLDS, GroupSummary, SessionCounts};
