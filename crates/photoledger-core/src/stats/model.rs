//! Statistics data models.

use serde::{Deserialize, Serialize};

use crate::library::{GroupKey, Item};

/// Group total thresholds for heat levels 0 through 6.
pub const DEFAULT_HEAT_THRESHOLDS: [usize; 7] = [0, 150, 300, 600, 900, 1200, 1500];

/// Review progress of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group these counts belong to.
    pub key: GroupKey,
    /// Number of items in the group.
    pub total: usize,
    /// Items kept.
    pub kept: usize,
    /// Items staged for deletion.
    pub staged_for_deletion: usize,
    /// Items reviewed without a disposition.
    pub skipped: usize,
}

impl GroupSummary {
    /// An empty summary for a group.
    #[must_use]
    pub const fn empty(key: GroupKey) -> Self {
        Self {
            key,
            total: 0,
            kept: 0,
            staged_for_deletion: 0,
            skipped: 0,
        }
    }

    /// Count a group's items after the persisted overlay has been applied.
    #[must_use]
    pub fn from_items<'a>(key: GroupKey, items: impl IntoIterator<Item = &'a Item>) -> Self {
        items.into_iter().fold(Self::empty(key), |mut summary, item| {
            summary.total += 1;
            if item.is_kept {
                summary.kept += 1;
            } else if item.is_staged_for_deletion {
                summary.staged_for_deletion += 1;
            } else if item.is_skipped() {
                summary.skipped += 1;
            }
            summary
        })
    }

    /// Items that have any review status.
    #[must_use]
    pub const fn reviewed(&self) -> usize {
        self.kept + self.staged_for_deletion + self.skipped
    }

    /// Items still waiting for a decision.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total.saturating_sub(self.reviewed())
    }

    /// Fraction of the group reviewed, 0 for an empty group.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.reviewed() as f64 / self.total as f64
    }

    /// Whether every item has been reviewed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.reviewed() >= self.total
    }

    /// Heat level of the group's size against ascending thresholds.
    ///
    /// The level is the index of the last threshold not above `total`,
    /// capped at `max_level`.
    #[must_use]
    pub fn heat_level(&self, thresholds: &[usize], max_level: usize) -> usize {
        thresholds
            .iter()
            .rposition(|&threshold| threshold <= self.total)
            .unwrap_or(0)
            .min(max_level)
    }
}

/// Sizes of an open review session, fed to the statistics cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounts {
    /// Group the session reviews.
    pub key: GroupKey,
    /// Group total as fixed when the session opened.
    pub total: usize,
    /// Items kept.
    pub kept: usize,
    /// Items staged for deletion.
    pub staged: usize,
    /// Items reviewed without a disposition.
    pub skipped: usize,
}

impl From<SessionCounts> for GroupSummary {
    fn from(counts: SessionCounts) -> Self {
        Self {
            key: counts.key,
            total: counts.total,
            kept: counts.kept,
            staged_for_deletion: counts.staged,
            skipped: counts.skipped,
        }
    }
}
