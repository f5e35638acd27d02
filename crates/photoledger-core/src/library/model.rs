//! Media library data models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Review state of a single media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Not yet reviewed; the item belongs in the deck.
    #[default]
    Unreviewed,
    /// The user decided to keep the item.
    Kept,
    /// The item is staged for deletion and can still be restored.
    StagedForDeletion,
    /// Reviewed without a disposition. No engine operation produces this yet.
    Skipped,
}

impl ReviewStatus {
    /// Whether the item counts as reviewed.
    #[must_use]
    pub const fn is_reviewed(self) -> bool {
        !matches!(self, Self::Unreviewed)
    }

    /// Stable string form used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unreviewed => "unreviewed",
            Self::Kept => "kept",
            Self::StagedForDeletion => "staged_for_deletion",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media item as seen by the review engine.
///
/// `is_kept` and `is_staged_for_deletion` mirror `status` so callers can
/// filter without matching. They are only ever changed together with the
/// status through [`Item::set_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier assigned by the media library.
    pub id: String,
    /// Creation timestamp, if the library knows it.
    pub created_at: Option<DateTime<Utc>>,
    /// Current review status.
    pub status: ReviewStatus,
    /// Mirrors `status == Kept`.
    pub is_kept: bool,
    /// Mirrors `status == StagedForDeletion`.
    pub is_staged_for_deletion: bool,
}

impl Item {
    /// Create an unreviewed item.
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            created_at,
            status: ReviewStatus::Unreviewed,
            is_kept: false,
            is_staged_for_deletion: false,
        }
    }

    /// Set the status and its mirrored flags.
    pub const fn set_status(&mut self, status: ReviewStatus) {
        self.status = status;
        self.is_kept = matches!(status, ReviewStatus::Kept);
        self.is_staged_for_deletion = matches!(status, ReviewStatus::StagedForDeletion);
    }

    /// Consume the item and return it with the given status.
    #[must_use]
    pub fn with_status(mut self, status: ReviewStatus) -> Self {
        self.set_status(status);
        self
    }

    /// Consume the item and return it reset to unreviewed.
    #[must_use]
    pub fn reset(self) -> Self {
        self.with_status(ReviewStatus::Unreviewed)
    }

    /// Whether the item still waits for a decision.
    ///
    /// Persisted state may carry flags that disagree with the status; an
    /// item only belongs in the deck when neither flag is set.
    #[must_use]
    pub const fn is_pending_review(&self) -> bool {
        matches!(self.status, ReviewStatus::Unreviewed)
            && !self.is_kept
            && !self.is_staged_for_deletion
    }

    /// Whether the item was reviewed without a keep/delete disposition.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self.status, ReviewStatus::Skipped)
            && !self.is_kept
            && !self.is_staged_for_deletion
    }
}

/// Chronological bucket that items are triaged within.
///
/// `Ord` is ascending by year then month; display order is the reverse
/// (newest group first), see [`GroupKey::display_cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
}

impl GroupKey {
    /// Create a group key.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Group key for a timestamp, bucketed in the local calendar.
    #[must_use]
    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        let local = at.with_timezone(&Local);
        Self::new(local.year(), local.month())
    }

    /// Ordering used for display: newest group first.
    #[must_use]
    pub fn display_cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.cmp(self)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.month)
    }
}

/// Error returned when a group key string is not `YYYY/MM`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid group key: {0:?}")]
pub struct ParseGroupKeyError(String);

impl FromStr for GroupKey {
    type Err = ParseGroupKeyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ParseGroupKeyError(s.to_string());
        let (year, month) = s.split_once('/').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self::new(year, month))
    }
}

// Serialized as its display string so it can key JSON objects.
impl Serialize for GroupKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GroupKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Raw asset record as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Stable identifier.
    pub id: String,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification timestamp, used for grouping when the creation
    /// date is missing.
    pub modified_at: Option<DateTime<Utc>>,
}

impl MediaAsset {
    /// Create an asset record.
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            created_at,
            modified_at: None,
        }
    }

    /// Set the modification timestamp.
    #[must_use]
    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    /// Timestamp that decides the asset's group.
    #[must_use]
    pub fn grouping_date(&self) -> DateTime<Utc> {
        self.created_at
            .or(self.modified_at)
            .unwrap_or_else(Utc::now)
    }

    /// The unreviewed item for this asset.
    #[must_use]
    pub fn to_item(&self) -> Item {
        Item::new(self.id.clone(), self.created_at)
    }
}

/// Result of an irreversible deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The user confirmed and the items were deleted.
    Confirmed,
    /// The user dismissed the platform confirmation.
    Cancelled,
    /// The deletion failed.
    Failed(String),
}

impl DeletionOutcome {
    /// Whether the deletion went through.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}
