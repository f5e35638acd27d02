//! Engine handle tying library, persistence and statistics together.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::library::{GroupKey, MediaLibrary};
use crate::review::ReviewSession;
use crate::state::{GroupCompletionState, StateRepository};
use crate::stats::{DEFAULT_HEAT_THRESHOLDS, GroupSummary, StatisticsCache};
use crate::{Error, Result};

/// Shared handles for reviewing one media library.
///
/// Cloning is cheap: every clone points at the same library, repository and
/// statistics cache.
pub struct ReviewEngine<L> {
    library: Arc<L>,
    repository: Arc<StateRepository>,
    statistics: Arc<StatisticsCache>,
    heat_thresholds: Vec<usize>,
}

impl<L> Clone for ReviewEngine<L> {
    fn clone(&self) -> Self {
        Self {
            library: Arc::clone(&self.library),
            repository: Arc::clone(&self.repository),
            statistics: Arc::clone(&self.statistics),
            heat_thresholds: self.heat_thresholds.clone(),
        }
    }
}

impl<L: MediaLibrary> ReviewEngine<L> {
    /// Create an engine over an already opened repository.
    pub fn new(library: L, repository: StateRepository) -> Self {
        Self {
            library: Arc::new(library),
            repository: Arc::new(repository),
            statistics: Arc::new(StatisticsCache::new()),
            heat_thresholds: DEFAULT_HEAT_THRESHOLDS.to_vec(),
        }
    }

    /// Open the database named by the settings and create an engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created, its path
    /// is not valid UTF-8, or the database cannot be opened.
    pub async fn open(settings: &Settings, library: L) -> Result<Self> {
        tokio::fs::create_dir_all(settings.data_dir()).await?;

        let db_path = settings.database_path();
        let db_path = db_path
            .to_str()
            .ok_or_else(|| Error::Config(format!("Non UTF-8 database path: {db_path:?}")))?;
        let repository = StateRepository::new(db_path).await?;
        info!("Opened review database at {db_path}");

        Ok(Self::new(library, repository).with_heat_thresholds(settings.heat_thresholds.clone()))
    }

    /// Replace the heat-level thresholds.
    #[must_use]
    pub fn with_heat_thresholds(mut self, thresholds: Vec<usize>) -> Self {
        self.heat_thresholds = thresholds;
        self
    }

    /// The media library.
    #[must_use]
    pub const fn library(&self) -> &Arc<L> {
        &self.library
    }

    /// The state repository.
    #[must_use]
    pub const fn repository(&self) -> &Arc<StateRepository> {
        &self.repository
    }

    /// The statistics cache.
    #[must_use]
    pub const fn statistics(&self) -> &Arc<StatisticsCache> {
        &self.statistics
    }

    /// Summaries of every non-empty group, newest first.
    pub async fn load_summaries(&self) -> Vec<GroupSummary> {
        self.statistics
            .load_all(self.library.as_ref(), &self.repository)
            .await
    }

    /// Open a review session for a group.
    pub async fn open_session(&self, key: GroupKey) -> ReviewSession<L> {
        ReviewSession::open(
            key,
            Arc::clone(&self.library),
            Arc::clone(&self.repository),
            Arc::clone(&self.statistics),
        )
        .await
    }

    /// Recompute one group's summary from the library and persisted state.
    pub async fn refresh_group(&self, key: GroupKey) -> GroupSummary {
        self.statistics
            .recompute(key, self.library.as_ref(), &self.repository)
            .await
    }

    /// Heat level of a group's size under the configured thresholds.
    #[must_use]
    pub fn heat_level(&self, summary: &GroupSummary) -> usize {
        summary.heat_level(
            &self.heat_thresholds,
            self.heat_thresholds.len().saturating_sub(1),
        )
    }

    /// Forget every review of a group.
    ///
    /// Erases the review state and pending deletions of the group's items,
    /// its completion snapshot and its progress, then recomputes its
    /// summary. Sessions already open on the group keep their in-memory
    /// state until [`ReviewSession::refresh`].
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted state cannot be written.
    pub async fn reset_group(&self, key: GroupKey) -> Result<GroupSummary> {
        let ids: Vec<String> = self
            .library
            .fetch_group(key)
            .into_iter()
            .map(|item| item.id)
            .collect();

        self.repository.forget_assets(&ids).await?;
        self.repository.clear_group_completion(key).await?;
        self.repository.clear_review_progress(key).await?;
        info!("Reset review of {key} ({} items)", ids.len());

        Ok(self.refresh_group(key).await)
    }

    /// Completion snapshot of a group, if it was ever completed.
    pub async fn group_completion(&self, key: GroupKey) -> Option<GroupCompletionState> {
        self.repository.group_completion(key).await
    }

    /// Number of items reviewed in a group's unfinished session.
    pub async fn review_progress(&self, key: GroupKey) -> usize {
        self.repository.review_progress(key).await
    }

    /// Ids staged for deletion across every group.
    pub async fn pending_deletion_ids(&self) -> BTreeSet<String> {
        self.repository.pending_deletion_ids().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::library::{InMemoryLibrary, MediaAsset};
    use crate::review::Decision;
    use chrono::{TimeZone, Utc};

    const KEY: GroupKey = GroupKey::new(2023, 11);

    async fn engine(count: u32) -> ReviewEngine<InMemoryLibrary> {
        let assets = (1..=count).map(|day| {
            MediaAsset::new(
                format!("n{day}"),
                Some(Utc.with_ymd_and_hms(2023, 11, day, 12, 0, 0).unwrap()),
            )
        });
        ReviewEngine::new(
            InMemoryLibrary::new(assets),
            StateRepository::in_memory().await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_heat_level_uses_thresholds() {
        let engine = engine(3).await.with_heat_thresholds(vec![0, 2, 5]);
        let summary = engine.load_summaries().await.pop().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(engine.heat_level(&summary), 1);
    }

    #[tokio::test]
    async fn test_sessions_share_statistics() {
        let engine = engine(2).await;
        let mut session = engine.open_session(KEY).await;
        let item = session.top().cloned().unwrap();
        session.apply_decision(Decision::Keep(item)).await;

        let cached = engine.statistics().get(KEY).unwrap();
        assert_eq!(cached.kept, 1);
        assert_eq!(cached.remaining(), 1);
    }

    #[tokio::test]
    async fn test_reset_group_forgets_reviews() {
        let engine = engine(2).await;
        let mut session = engine.open_session(KEY).await;
        while let Some(item) = session.top().cloned() {
            session.apply_decision(Decision::Delete(item)).await;
            session.pop_top_card();
        }
        assert!(engine.group_completion(KEY).await.unwrap().is_completed);
        assert_eq!(engine.pending_deletion_ids().await.len(), 2);

        let summary = engine.reset_group(KEY).await.unwrap();
        assert_eq!(summary.reviewed(), 0);
        assert_eq!(engine.group_completion(KEY).await, None);
        assert!(engine.pending_deletion_ids().await.is_empty());

        let reopened = engine.open_session(KEY).await;
        assert_eq!(reopened.deck().len(), 2);
    }
}
