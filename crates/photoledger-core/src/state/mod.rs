//! Durable review state.
//!
//! Review state lives in four JSON blobs, one per concern:
//! - per-item review state, keyed by item id
//! - per-group completion snapshots
//! - the set of ids waiting for physical deletion
//! - per-group in-progress counters
//!
//! Reads never fail: a missing or undecodable blob reads as empty.

mod model;
mod repository;

pub use model::GroupCompletionState;
pub use repository::StateRepository;
