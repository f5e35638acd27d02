//! Review session data models.

use crate::library::{DeletionOutcome, Item, ReviewStatus};

/// A disposition recorded for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Keep the item.
    Keep(Item),
    /// Stage the item for deletion.
    Delete(Item),
}

impl Decision {
    /// The item the decision is about.
    #[must_use]
    pub const fn item(&self) -> &Item {
        match self {
            Self::Keep(item) | Self::Delete(item) => item,
        }
    }

    /// Status the item takes when the decision is applied.
    #[must_use]
    pub const fn status(&self) -> ReviewStatus {
        match self {
            Self::Keep(_) => ReviewStatus::Kept,
            Self::Delete(_) => ReviewStatus::StagedForDeletion,
        }
    }

    /// Whether this is a delete decision.
    #[must_use]
    pub const fn is_delete(&self) -> bool {
        matches!(self, Self::Delete(_))
    }
}

/// What a session operation changed.
///
/// Returned by every mutating [`ReviewSession`](super::ReviewSession)
/// operation so callers can refresh their views explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Nothing changed: empty history, unknown ids, or a repeated decision.
    Unchanged,
    /// A decision was recorded.
    Decided {
        /// The recorded decision.
        decision: Decision,
        /// Whether it was the group's last undecided item.
        completed: bool,
    },
    /// The last decision was taken back.
    Undone {
        /// The decision that was removed from history.
        decision: Decision,
        /// Whether the item went back into the deck. False when it had
        /// already left the session through a restore or a commit.
        requeued: bool,
    },
    /// Staged items went back to the head of the deck.
    Restored {
        /// Number of items restored.
        count: usize,
    },
    /// Physically deleted items left the session.
    Removed {
        /// Number of items removed.
        count: usize,
    },
    /// The session was re-partitioned against persisted state.
    Refreshed,
}

/// Ids and outcome of a finished physical deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReceipt {
    /// Ids the deletion was requested for.
    pub ids: Vec<String>,
    /// What the library reported.
    pub outcome: DeletionOutcome,
}
