//! Cross-group statistics cache.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::model::{GroupSummary, SessionCounts};
use crate::library::{GroupKey, Item, MediaLibrary};
use crate::state::StateRepository;

/// Cache of per-group summaries shared by every review session.
///
/// Two update paths keep it current:
/// - [`StatisticsCache::record_session`] stores the counts of an open
///   session, O(1), on every decision.
/// - [`StatisticsCache::recompute`] re-reads the group from the library and
///   the persisted overlay. Use it when persisted state changed outside the
///   session, never on the per-decision path.
///
/// Each summary is replaced as a whole under the lock, so readers never see
/// a half-updated entry.
#[derive(Default)]
pub struct StatisticsCache {
    summaries: Mutex<HashMap<GroupKey, GroupSummary>>,
}

impl StatisticsCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached summary of a group.
    #[must_use]
    pub fn get(&self, key: GroupKey) -> Option<GroupSummary> {
        self.lock().get(&key).copied()
    }

    /// Store a summary, replacing the group's previous one.
    pub fn store(&self, summary: GroupSummary) {
        self.lock().insert(summary.key, summary);
    }

    /// Drop a group's summary.
    pub fn invalidate(&self, key: GroupKey) {
        self.lock().remove(&key);
    }

    /// Store the summary implied by an open session's counts.
    pub fn record_session(&self, counts: SessionCounts) -> GroupSummary {
        let summary = GroupSummary::from(counts);
        self.store(summary);
        summary
    }

    /// Rebuild one group's summary from the library and persisted state.
    pub async fn recompute<L>(
        &self,
        key: GroupKey,
        library: &L,
        repository: &StateRepository,
    ) -> GroupSummary
    where
        L: MediaLibrary + ?Sized,
    {
        let persisted = repository.asset_review_states().await;
        let summary = summarize(key, library, &persisted);
        debug!(
            "Recomputed {key}: total {}, reviewed {}",
            summary.total,
            summary.reviewed()
        );

        let mut summaries = self.lock();
        if summary.total == 0 {
            summaries.remove(&key);
        } else {
            summaries.insert(key, summary);
        }
        summary
    }

    /// Build summaries for every group the library knows about.
    ///
    /// Replaces the whole cache and returns the non-empty summaries in
    /// display order.
    pub async fn load_all<L>(&self, library: &L, repository: &StateRepository) -> Vec<GroupSummary>
    where
        L: MediaLibrary + ?Sized,
    {
        let persisted = repository.asset_review_states().await;
        let fresh: HashMap<GroupKey, GroupSummary> = library
            .group_keys()
            .into_iter()
            .map(|key| (key, summarize(key, library, &persisted)))
            .filter(|(_, summary)| summary.total > 0)
            .collect();
        debug!("Loaded summaries for {} groups", fresh.len());

        *self.lock() = fresh;
        self.summaries()
    }

    /// Non-empty cached summaries, newest group first.
    #[must_use]
    pub fn summaries(&self) -> Vec<GroupSummary> {
        let mut summaries: Vec<GroupSummary> = self
            .lock()
            .values()
            .filter(|summary| summary.total > 0)
            .copied()
            .collect();
        summaries.sort_by(|a, b| a.key.display_cmp(&b.key));
        summaries
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GroupKey, GroupSummary>> {
        self.summaries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn summarize<L>(key: GroupKey, library: &L, persisted: &HashMap<String, Item>) -> GroupSummary
where
    L: MediaLibrary + ?Sized,
{
    let items = library.fetch_group(key);
    let overlaid = items
        .iter()
        .map(|item| persisted.get(&item.id).unwrap_or(item));
    GroupSummary::from_items(key, overlaid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::library::{InMemoryLibrary, MediaAsset, ReviewStatus};
    use chrono::{TimeZone, Utc};

    fn library() -> InMemoryLibrary {
        let at = |month, day| Some(Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap());
        InMemoryLibrary::new([
            MediaAsset::new("a", at(1, 5)),
            MediaAsset::new("b", at(1, 6)),
            MediaAsset::new("c", at(1, 7)),
            MediaAsset::new("d", at(2, 5)),
        ])
    }

    #[test]
    fn test_record_session_replaces_summary() {
        let cache = StatisticsCache::new();
        let key = GroupKey::new(2024, 1);
        let counts = SessionCounts {
            key,
            total: 10,
            kept: 4,
            staged: 3,
            skipped: 0,
        };

        let summary = cache.record_session(counts);
        assert_eq!(summary.remaining(), 3);
        assert_eq!(cache.get(key), Some(summary));

        cache.invalidate(key);
        assert_eq!(cache.get(key), None);
    }

    #[tokio::test]
    async fn test_recompute_overlays_persisted_state() {
        let library = library();
        let repo = StateRepository::in_memory().await.unwrap();
        let cache = StatisticsCache::new();
        let key = GroupKey::new(2024, 1);

        repo.save_asset_review_state(&Item::new("a", None).with_status(ReviewStatus::Kept))
            .await
            .unwrap();
        repo.save_asset_review_state(
            &Item::new("b", None).with_status(ReviewStatus::StagedForDeletion),
        )
        .await
        .unwrap();

        let summary = cache.recompute(key, &library, &repo).await;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.staged_for_deletion, 1);
        assert_eq!(summary.remaining(), 1);
        assert_eq!(cache.get(key), Some(summary));
    }

    #[tokio::test]
    async fn test_recompute_sees_exclusions() {
        let library = library();
        let repo = StateRepository::in_memory().await.unwrap();
        let cache = StatisticsCache::new();
        let key = GroupKey::new(2024, 2);

        cache.recompute(key, &library, &repo).await;
        assert_eq!(cache.get(key).unwrap().total, 1);

        library.apply_exclusion(&["d".to_string()]);
        let summary = cache.recompute(key, &library, &repo).await;
        assert_eq!(summary.total, 0);
        assert_eq!(cache.get(key), None);
    }

    #[tokio::test]
    async fn test_load_all_in_display_order() {
        let library = library();
        let repo = StateRepository::in_memory().await.unwrap();
        let cache = StatisticsCache::new();

        let summaries = cache.load_all(&library, &repo).await;
        let keys: Vec<_> = summaries.iter().map(|s| s.key).collect();
        assert_eq!(keys, vec![GroupKey::new(2024, 2), GroupKey::new(2024, 1)]);
        assert_eq!(summaries[1].total, 3);
        assert_eq!(cache.summaries(), summaries);
    }
}
