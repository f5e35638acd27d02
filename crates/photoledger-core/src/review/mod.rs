//! Swipe-style review of one group.
//!
//! A [`ReviewSession`] holds the deck of items still to review, the kept and
//! staged lists, and the decision history. Deciding, undoing, restoring and
//! committing all go through it; every operation returns a [`SessionEvent`]
//! describing what changed.
//!
//! # Example
//!
//! ```ignore
//! let mut session = ReviewSession::open(key, library, repository, statistics).await;
//! while let Some(item) = session.top().cloned() {
//!     session.apply_decision(Decision::Keep(item)).await;
//!     session.pop_top_card();
//! }
//! ```

mod bookkeeping;
mod model;
mod session;

pub use bookkeeping::DeletionRequest;
pub use model::{Decision, DeletionReceipt, SessionEvent};
pub use session::ReviewSession;
