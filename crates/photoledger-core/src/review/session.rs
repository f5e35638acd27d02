//! Per-group review session.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::model::{Decision, SessionEvent};
use crate::Result;
use crate::library::{GroupKey, Item, MediaLibrary};
use crate::state::StateRepository;
use crate::stats::{GroupSummary, SessionCounts, StatisticsCache};

type DecisionCallback = Box<dyn Fn(&Decision) + Send + Sync>;
type CompletionCallback = Box<dyn Fn(GroupKey) + Send + Sync>;

/// Working set for reviewing one group.
///
/// The session owns:
/// - `deck`: unreviewed items, head first
/// - `history`: recorded decisions, for undo
/// - `kept`: items kept
/// - `staged`: items staged for deletion, with `staged_index` mapping each
///   id to its position
///
/// `staged` is the ground truth and `staged_index` is derived from it. The
/// index is rebuilt in full after every removal from `staged`.
///
/// Mutating operations take `&mut self`, so a session is never mutated
/// concurrently. Persistence writes are best-effort: a failed write is
/// logged and the in-memory change stands.
pub struct ReviewSession<L> {
    key: GroupKey,
    library: Arc<L>,
    repository: Arc<StateRepository>,
    statistics: Arc<StatisticsCache>,
    /// Group total, fixed at open and shrunk only by physical deletion.
    total: usize,
    deck: VecDeque<Item>,
    history: Vec<Decision>,
    kept: Vec<Item>,
    kept_ids: HashSet<String>,
    staged: Vec<Item>,
    staged_index: HashMap<String, usize>,
    skipped: Vec<Item>,
    on_decision: Option<DecisionCallback>,
    on_complete: Option<CompletionCallback>,
}

impl<L: MediaLibrary> ReviewSession<L> {
    /// Open a session for a group.
    ///
    /// Fetches the group (exclusions applied), overlays persisted review
    /// state, and partitions the items into deck, kept and staged.
    pub async fn open(
        key: GroupKey,
        library: Arc<L>,
        repository: Arc<StateRepository>,
        statistics: Arc<StatisticsCache>,
    ) -> Self {
        let fetched = library.fetch_group(key);
        let persisted = repository.asset_review_states().await;

        let mut session = Self {
            key,
            library,
            repository,
            statistics,
            total: 0,
            deck: VecDeque::new(),
            history: Vec::new(),
            kept: Vec::new(),
            kept_ids: HashSet::new(),
            staged: Vec::new(),
            staged_index: HashMap::new(),
            skipped: Vec::new(),
            on_decision: None,
            on_complete: None,
        };
        session.partition(overlay(fetched, &persisted));
        session.record_statistics();

        info!(
            "Opened review session for {key}: {} to review, {} kept, {} staged",
            session.deck.len(),
            session.kept.len(),
            session.staged.len()
        );
        session
    }

    /// Set the callback invoked after every recorded decision.
    pub fn set_on_decision(&mut self, callback: impl Fn(&Decision) + Send + Sync + 'static) {
        self.on_decision = Some(Box::new(callback));
    }

    /// Set the callback invoked when the group's last item is decided.
    pub fn set_on_complete(&mut self, callback: impl Fn(GroupKey) + Send + Sync + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Record a decision.
    ///
    /// Does not touch the deck: the caller pops the decided card with
    /// [`ReviewSession::pop_top_card`] once it has left the screen. An item
    /// that is already kept or staged is not decided twice, and an item that
    /// is not in the deck is not decided at all.
    pub async fn apply_decision(&mut self, decision: Decision) -> SessionEvent {
        let id = decision.item().id.clone();
        if self.kept_ids.contains(&id) || self.staged_index.contains_key(&id) {
            debug!("Ignoring repeated decision for {id} in {}", self.key);
            return SessionEvent::Unchanged;
        }
        if !self.deck_contains(&id) {
            debug!("Ignoring decision for {id}: not in the deck of {}", self.key);
            return SessionEvent::Unchanged;
        }

        self.history.push(decision.clone());
        let item = decision.item().clone().with_status(decision.status());
        match &decision {
            Decision::Keep(_) => {
                self.kept_ids.insert(id.clone());
                self.kept.push(item.clone());
                log_failure(
                    self.repository.save_asset_review_state(&item).await,
                    "kept state",
                );
            }
            Decision::Delete(_) => {
                self.staged_index.insert(id.clone(), self.staged.len());
                self.staged.push(item.clone());
                log_failure(
                    self.repository.save_asset_review_state(&item).await,
                    "staged state",
                );
                log_failure(
                    self.repository
                        .add_pending_deletions(std::slice::from_ref(&id))
                        .await,
                    "pending deletion",
                );
            }
        }
        debug!("Recorded {} for {id} in {}", item.status, self.key);

        self.persist_progress().await;
        let summary = self.record_statistics();

        let completed = self.is_last_undecided(&id);
        if completed {
            self.persist_completion(&summary).await;
        }

        self.notify_decision(&decision);
        if completed {
            self.notify_complete();
        }

        SessionEvent::Decided {
            decision,
            completed,
        }
    }

    /// Remove the head of the deck, if any.
    pub fn pop_top_card(&mut self) -> Option<Item> {
        self.deck.pop_front()
    }

    /// Take back the most recent decision and put its item back on top of
    /// the deck.
    pub async fn undo_last(&mut self) -> SessionEvent {
        let Some(decision) = self.history.pop() else {
            return SessionEvent::Unchanged;
        };
        let id = decision.item().id.clone();

        let removed = match &decision {
            Decision::Keep(_) => self.take_kept(&id),
            Decision::Delete(_) => self.take_staged(std::slice::from_ref(&id)).pop(),
        };
        let Some(item) = removed else {
            debug!("Undo for {id} in {}: item already left the session", self.key);
            return SessionEvent::Undone {
                decision,
                requeued: false,
            };
        };

        let item = item.reset();
        // A decided card may still be on screen, waiting to be popped.
        if self.deck.front().is_none_or(|top| top.id != id) {
            self.deck.push_front(item.clone());
        }

        log_failure(
            self.repository.save_asset_review_state(&item).await,
            "reset state",
        );
        if decision.is_delete() {
            log_failure(
                self.repository
                    .remove_pending_deletions(std::slice::from_ref(&id))
                    .await,
                "pending deletion removal",
            );
        }
        self.persist_progress().await;
        self.record_statistics();

        debug!("Undid decision for {id} in {}", self.key);
        SessionEvent::Undone {
            decision,
            requeued: true,
        }
    }

    /// Move staged items back to the head of the deck.
    ///
    /// Restored items keep their relative staged order. Ids that are not
    /// staged in this session have their exclusion lifted, and their
    /// persisted state is erased only if it is staged for deletion: a
    /// persisted keep is never touched.
    pub async fn restore_assets(&mut self, ids: &[String]) -> SessionEvent {
        self.library.lift_exclusion(ids);

        let restored: Vec<Item> = self.take_staged(ids).into_iter().map(Item::reset).collect();
        let count = restored.len();

        let persisted = self.repository.asset_review_states().await;
        let forgotten: Vec<String> = ids
            .iter()
            .filter(|id| {
                restored.iter().any(|item| &item.id == *id)
                    || persisted
                        .get(id.as_str())
                        .is_some_and(|item| item.is_staged_for_deletion)
            })
            .cloned()
            .collect();

        for item in restored.into_iter().rev() {
            self.deck.push_front(item);
        }

        if !forgotten.is_empty() {
            log_failure(
                self.repository.forget_assets(&forgotten).await,
                "restored assets",
            );
        }
        self.persist_progress().await;
        self.record_statistics();

        info!("Restored {count} of {} requested assets in {}", ids.len(), self.key);
        if count == 0 {
            SessionEvent::Unchanged
        } else {
            SessionEvent::Restored { count }
        }
    }

    /// Drop items that were physically deleted.
    ///
    /// Staged items go through the staged index. An id that moved back to
    /// the deck or into kept since the deletion was requested is dropped
    /// from there as well, so the session never holds an item the library
    /// no longer has. The group total shrinks by the number of distinct
    /// ids dropped and the group's statistics are recomputed in full.
    pub async fn remove_deleted_assets(&mut self, ids: &[String]) -> SessionEvent {
        let mut dropped: HashSet<String> = self
            .take_staged(ids)
            .into_iter()
            .map(|item| item.id)
            .collect();

        let deleted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.deck.retain(|item| {
            let gone = deleted.contains(item.id.as_str());
            if gone {
                dropped.insert(item.id.clone());
            }
            !gone
        });
        self.kept.retain(|item| {
            let gone = deleted.contains(item.id.as_str());
            if gone {
                dropped.insert(item.id.clone());
            }
            !gone
        });
        self.kept_ids.retain(|id| !deleted.contains(id.as_str()));

        let count = dropped.len();
        self.total = self.total.saturating_sub(count);

        self.persist_progress().await;
        self.statistics
            .recompute(self.key, self.library.as_ref(), &self.repository)
            .await;

        info!("Removed {count} deleted assets from {}", self.key);
        if count == 0 {
            SessionEvent::Unchanged
        } else {
            SessionEvent::Removed { count }
        }
    }

    /// Re-partition the session's items against fresh persisted state.
    ///
    /// Used after persisted state was edited outside this session. Items are
    /// not re-fetched from the library and history is kept.
    pub async fn refresh(&mut self) -> SessionEvent {
        let persisted = self.repository.asset_review_states().await;
        // A decided card awaiting its pop is in the deck and in kept or
        // staged; keep the decided copy.
        let mut seen = HashSet::new();
        let items: Vec<Item> = std::mem::take(&mut self.kept)
            .into_iter()
            .chain(std::mem::take(&mut self.staged))
            .chain(std::mem::take(&mut self.skipped))
            .chain(std::mem::take(&mut self.deck))
            .filter(|item| seen.insert(item.id.clone()))
            .collect();

        self.partition(overlay(items, &persisted));
        self.record_statistics();
        SessionEvent::Refreshed
    }

    // Accessors

    /// Group this session reviews.
    #[must_use]
    pub const fn key(&self) -> GroupKey {
        self.key
    }

    /// Unreviewed items, head first.
    #[must_use]
    pub const fn deck(&self) -> &VecDeque<Item> {
        &self.deck
    }

    /// Next item to review.
    #[must_use]
    pub fn top(&self) -> Option<&Item> {
        self.deck.front()
    }

    /// Recorded decisions, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Decision] {
        &self.history
    }

    /// Kept items, in decision order.
    #[must_use]
    pub fn kept(&self) -> &[Item] {
        &self.kept
    }

    /// Items staged for deletion, in staging order.
    #[must_use]
    pub fn staged(&self) -> &[Item] {
        &self.staged
    }

    /// Ids staged for deletion, in staging order.
    #[must_use]
    pub fn staged_ids(&self) -> Vec<String> {
        self.staged.iter().map(|item| item.id.clone()).collect()
    }

    /// Position of an id in the staged list.
    #[must_use]
    pub fn staged_position(&self, id: &str) -> Option<usize> {
        self.staged_index.get(id).copied()
    }

    /// Items reviewed without a disposition.
    #[must_use]
    pub fn skipped(&self) -> &[Item] {
        &self.skipped
    }

    /// Current group total.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Whether undo has anything to take back.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Sizes of the session.
    #[must_use]
    pub fn counts(&self) -> SessionCounts {
        SessionCounts {
            key: self.key,
            total: self.total,
            kept: self.kept.len(),
            staged: self.staged.len(),
            skipped: self.skipped.len(),
        }
    }

    /// Summary of the session's group.
    #[must_use]
    pub fn summary(&self) -> GroupSummary {
        GroupSummary::from(self.counts())
    }

    /// Fraction of the session's items decided, 1.0 for an empty session.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        let decided = self.kept.len() + self.staged.len();
        let total = decided + self.deck.len();
        if total == 0 {
            return 1.0;
        }
        decided as f64 / total as f64
    }

    // Internals

    pub(super) fn library(&self) -> &Arc<L> {
        &self.library
    }

    pub(super) fn repository(&self) -> &StateRepository {
        &self.repository
    }

    fn partition(&mut self, items: Vec<Item>) {
        self.total = items.len();
        self.deck.clear();
        self.kept.clear();
        self.staged.clear();
        self.skipped.clear();

        for item in items {
            if item.is_pending_review() {
                self.deck.push_back(item);
            } else if item.is_kept {
                self.kept.push(item);
            } else if item.is_staged_for_deletion {
                self.staged.push(item);
            } else {
                self.skipped.push(item);
            }
        }

        self.kept_ids = self.kept.iter().map(|item| item.id.clone()).collect();
        self.rebuild_staged_index();
    }

    fn deck_contains(&self, id: &str) -> bool {
        self.deck.front().is_some_and(|top| top.id == id)
            || self.deck.iter().any(|item| item.id == id)
    }

    fn take_kept(&mut self, id: &str) -> Option<Item> {
        if !self.kept_ids.remove(id) {
            return None;
        }
        let position = self.kept.iter().rposition(|item| item.id == id)?;
        Some(self.kept.remove(position))
    }

    /// Remove the given ids from `staged`, returning the removed items in
    /// staged order. Unknown ids are skipped.
    fn take_staged(&mut self, ids: &[String]) -> Vec<Item> {
        let mut positions: Vec<usize> = ids
            .iter()
            .filter_map(|id| self.staged_index.get(id).copied())
            .collect();
        if positions.is_empty() {
            return Vec::new();
        }
        positions.sort_unstable();
        positions.dedup();

        // Descending, so earlier positions stay valid.
        let mut removed: Vec<Item> = positions
            .iter()
            .rev()
            .map(|&position| self.staged.remove(position))
            .collect();
        removed.reverse();

        self.rebuild_staged_index();
        removed
    }

    fn rebuild_staged_index(&mut self) {
        self.staged_index = self
            .staged
            .iter()
            .enumerate()
            .map(|(position, item)| (item.id.clone(), position))
            .collect();
        debug_assert_eq!(
            self.staged_index.len(),
            self.staged.len(),
            "staged list holds duplicate ids"
        );
    }

    /// Whether no undecided item is left once `id` leaves the deck.
    fn is_last_undecided(&self, id: &str) -> bool {
        match self.deck.len() {
            0 => true,
            1 => self.deck.front().is_some_and(|top| top.id == id),
            _ => false,
        }
    }

    fn record_statistics(&self) -> GroupSummary {
        self.statistics.record_session(self.counts())
    }

    async fn persist_progress(&self) {
        let reviewed = self.kept.len() + self.staged.len();
        log_failure(
            self.repository.save_review_progress(self.key, reviewed).await,
            "review progress",
        );
    }

    async fn persist_completion(&self, summary: &GroupSummary) {
        log_failure(
            self.repository.save_group_completion(summary).await,
            "group completion",
        );
        log_failure(
            self.repository.clear_review_progress(self.key).await,
            "review progress reset",
        );
        info!("Completed review of {}", self.key);
    }

    fn notify_decision(&self, decision: &Decision) {
        if let Some(callback) = &self.on_decision
            && catch_unwind(AssertUnwindSafe(|| callback(decision))).is_err()
        {
            warn!("Decision callback panicked for {}", self.key);
        }
    }

    fn notify_complete(&self) {
        if let Some(callback) = &self.on_complete
            && catch_unwind(AssertUnwindSafe(|| callback(self.key))).is_err()
        {
            warn!("Completion callback panicked for {}", self.key);
        }
    }
}

/// Replace fetched items with their persisted review state, if any.
fn overlay(items: Vec<Item>, persisted: &HashMap<String, Item>) -> Vec<Item> {
    items
        .into_iter()
        .map(|item| persisted.get(&item.id).cloned().unwrap_or(item))
        .collect()
}

pub(super) fn log_failure(result: Result<()>, what: &str) {
    if let Err(e) = result {
        warn!("Failed to persist {what}: {e}");
    }
}
