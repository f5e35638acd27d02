//! Persisted state models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::library::GroupKey;
use crate::stats::GroupSummary;

/// Snapshot written when a group's deck runs out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCompletionState {
    /// Group the snapshot belongs to.
    pub key: GroupKey,
    /// Number of items in the group.
    pub total: usize,
    /// Items reviewed.
    pub reviewed: usize,
    /// Items kept.
    pub kept: usize,
    /// Items staged for deletion.
    pub staged_for_deletion: usize,
    /// Items reviewed without a disposition.
    pub skipped: usize,
    /// Whether every item had been reviewed.
    pub is_completed: bool,
    /// When the snapshot was taken.
    pub last_updated: DateTime<Utc>,
}

impl GroupCompletionState {
    /// Snapshot a summary at the given time.
    #[must_use]
    pub const fn from_summary(summary: &GroupSummary, last_updated: DateTime<Utc>) -> Self {
        Self {
            key: summary.key,
            total: summary.total,
            reviewed: summary.reviewed(),
            kept: summary.kept,
            staged_for_deletion: summary.staged_for_deletion,
            skipped: summary.skipped,
            is_completed: summary.is_completed(),
            last_updated,
        }
    }

    /// The summary this snapshot was taken from.
    #[must_use]
    pub const fn summary(&self) -> GroupSummary {
        GroupSummary {
            key: self.key,
            total: self.total,
            kept: self.kept,
            staged_for_deletion: self.staged_for_deletion,
            skipped: self.skipped,
        }
    }
}
