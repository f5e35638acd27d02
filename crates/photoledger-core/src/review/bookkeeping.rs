//! Committing staged deletions.
//!
//! A commit has two halves. The physical deletion may wait on the user for
//! an arbitrary time, so it runs through an owned [`DeletionRequest`] that
//! does not borrow the session. Its [`DeletionReceipt`] is then handed back
//! to [`ReviewSession::acknowledge_deletion`], which does the bookkeeping
//! against whatever the session looks like by then.

use std::sync::Arc;

use tracing::{info, warn};

use super::model::{DeletionReceipt, SessionEvent};
use super::session::{ReviewSession, log_failure};
use crate::library::{DeletionOutcome, MediaLibrary};

/// Physical deletion of a set of staged ids, detached from its session.
pub struct DeletionRequest<L> {
    library: Arc<L>,
    ids: Vec<String>,
}

impl<L: MediaLibrary> DeletionRequest<L> {
    /// Ids this request will delete.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Whether there is nothing to delete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ask the library to delete the ids.
    ///
    /// An empty request is confirmed without calling the library.
    pub async fn execute(self) -> DeletionReceipt {
        let outcome = if self.ids.is_empty() {
            DeletionOutcome::Confirmed
        } else {
            self.library.physical_delete(&self.ids).await
        };
        DeletionReceipt {
            ids: self.ids,
            outcome,
        }
    }
}

impl<L: MediaLibrary> ReviewSession<L> {
    /// Prepare the physical deletion of staged items.
    ///
    /// Ids that are not currently staged are dropped from the request.
    #[must_use]
    pub fn deletion_request(&self, ids: &[String]) -> DeletionRequest<L> {
        let mut staged: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if self.staged_position(id).is_some() && !staged.contains(id) {
                staged.push(id.clone());
            }
        }
        DeletionRequest {
            library: Arc::clone(self.library()),
            ids: staged,
        }
    }

    /// Apply the outcome of a physical deletion to the session.
    ///
    /// On confirmation the ids are excluded from the library, their
    /// persisted state and pending-deletion entries are erased, and they
    /// leave the session wherever they sit by now: staged, or back in the
    /// deck or kept after a restore. Cancellation and failure change
    /// nothing.
    pub async fn acknowledge_deletion(&mut self, receipt: DeletionReceipt) -> SessionEvent {
        match receipt.outcome {
            DeletionOutcome::Confirmed => {
                if receipt.ids.is_empty() {
                    return SessionEvent::Unchanged;
                }
                self.library().apply_exclusion(&receipt.ids);
                log_failure(
                    self.repository().forget_assets(&receipt.ids).await,
                    "deleted assets",
                );
                info!(
                    "Committed deletion of {} assets from {}",
                    receipt.ids.len(),
                    self.key()
                );
                self.remove_deleted_assets(&receipt.ids).await
            }
            DeletionOutcome::Cancelled => {
                info!("Deletion of {} assets cancelled", receipt.ids.len());
                SessionEvent::Unchanged
            }
            DeletionOutcome::Failed(reason) => {
                warn!("Failed to delete {} assets: {reason}", receipt.ids.len());
                SessionEvent::Unchanged
            }
        }
    }

    /// Physically delete staged items and apply the outcome.
    ///
    /// Returns what the library reported. Staged items are untouched unless
    /// the outcome is [`DeletionOutcome::Confirmed`].
    pub async fn commit_deletion(&mut self, ids: &[String]) -> DeletionOutcome {
        let receipt = self.deletion_request(ids).execute().await;
        let outcome = receipt.outcome.clone();
        self.acknowledge_deletion(receipt).await;
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::Future;
    use std::sync::Mutex;

    use super::*;
    use crate::library::{GroupKey, InMemoryLibrary, Item, MediaAsset};
    use crate::review::Decision;
    use crate::state::StateRepository;
    use crate::stats::StatisticsCache;
    use chrono::{TimeZone, Utc};

    /// Library that answers every deletion with a fixed outcome.
    struct ScriptedLibrary {
        inner: InMemoryLibrary,
        outcome: DeletionOutcome,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl MediaLibrary for ScriptedLibrary {
        fn group_keys(&self) -> Vec<GroupKey> {
            self.inner.group_keys()
        }

        fn fetch_group(&self, key: GroupKey) -> Vec<Item> {
            self.inner.fetch_group(key)
        }

        fn apply_exclusion(&self, ids: &[String]) {
            self.inner.apply_exclusion(ids);
        }

        fn lift_exclusion(&self, ids: &[String]) {
            self.inner.lift_exclusion(ids);
        }

        fn physical_delete(&self, ids: &[String]) -> impl Future<Output = DeletionOutcome> + Send {
            self.calls.lock().unwrap().push(ids.to_vec());
            let outcome = self.outcome.clone();
            async move { outcome }
        }
    }

    const KEY: GroupKey = GroupKey::new(2024, 5);

    async fn session(outcome: DeletionOutcome) -> ReviewSession<ScriptedLibrary> {
        let assets = (1..=3).map(|day| {
            MediaAsset::new(
                format!("p{day}"),
                Some(Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()),
            )
        });
        let library = Arc::new(ScriptedLibrary {
            inner: InMemoryLibrary::new(assets),
            outcome,
            calls: Mutex::new(Vec::new()),
        });
        let repository = Arc::new(StateRepository::in_memory().await.unwrap());
        ReviewSession::open(KEY, library, repository, Arc::new(StatisticsCache::new())).await
    }

    async fn stage_top(session: &mut ReviewSession<ScriptedLibrary>) -> String {
        let item = session.top().cloned().unwrap();
        session.apply_decision(Decision::Delete(item.clone())).await;
        session.pop_top_card();
        item.id
    }

    #[tokio::test]
    async fn test_request_keeps_only_staged_ids() {
        let mut session = session(DeletionOutcome::Confirmed).await;
        let staged = stage_top(&mut session).await;

        let request = session.deletion_request(&[
            staged.clone(),
            "p1".to_string(),
            staged.clone(),
            "missing".to_string(),
        ]);
        assert_eq!(request.ids(), [staged]);
    }

    #[tokio::test]
    async fn test_confirmed_commit_clears_staged() {
        let mut session = session(DeletionOutcome::Confirmed).await;
        let id = stage_top(&mut session).await;

        let outcome = session.commit_deletion(std::slice::from_ref(&id)).await;
        assert!(outcome.is_confirmed());
        assert!(session.staged().is_empty());
        assert_eq!(session.total(), 2);
        assert!(session.library().inner.excluded_ids().contains(&id));
        assert!(session.repository().pending_deletion_ids().await.is_empty());
        assert_eq!(session.repository().asset_review_state(&id).await, None);
    }

    #[tokio::test]
    async fn test_cancelled_commit_changes_nothing() {
        let mut session = session(DeletionOutcome::Cancelled).await;
        let id = stage_top(&mut session).await;

        let outcome = session.commit_deletion(std::slice::from_ref(&id)).await;
        assert_eq!(outcome, DeletionOutcome::Cancelled);
        assert_eq!(session.staged_position(&id), Some(0));
        assert_eq!(session.total(), 3);
        assert!(session.library().inner.excluded_ids().is_empty());
        assert!(session.repository().pending_deletion_ids().await.contains(&id));
    }

    #[tokio::test]
    async fn test_failed_commit_changes_nothing() {
        let mut session = session(DeletionOutcome::Failed("denied".to_string())).await;
        let id = stage_top(&mut session).await;

        let outcome = session.commit_deletion(std::slice::from_ref(&id)).await;
        assert_eq!(outcome, DeletionOutcome::Failed("denied".to_string()));
        assert_eq!(session.staged().len(), 1);
        assert!(session.repository().asset_review_state(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_empty_commit_skips_library() {
        let mut session = session(DeletionOutcome::Failed("unused".to_string())).await;

        let outcome = session.commit_deletion(&["p1".to_string()]).await;
        assert!(outcome.is_confirmed());
        assert!(session.library().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receipt_applies_after_restore() {
        let mut session = session(DeletionOutcome::Confirmed).await;
        let first = stage_top(&mut session).await;
        let second = stage_top(&mut session).await;

        let request = session.deletion_request(&[first.clone(), second.clone()]);
        session.restore_assets(std::slice::from_ref(&first)).await;
        let receipt = request.execute().await;

        let event = session.acknowledge_deletion(receipt).await;
        assert_eq!(event, SessionEvent::Removed { count: 2 });
        assert!(session.staged().is_empty());
        assert!(session.deck().iter().all(|item| item.id != first));
        assert_eq!(session.total(), 1);
        assert_eq!(session.summary().remaining(), 1);
        assert_eq!(session.repository().asset_review_state(&first).await, None);
    }
}
