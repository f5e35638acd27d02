//! In-process media library.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use super::MediaLibrary;
use super::model::{DeletionOutcome, GroupKey, Item, MediaAsset};

/// A [`MediaLibrary`] backed by a list of asset records.
///
/// Like a platform fetch result, the grouped snapshot is taken when the
/// library is built and only refreshed by [`InMemoryLibrary::reload`].
/// Physically deleted assets therefore stay in the snapshot until the next
/// reload, which is what the exclusion set is for.
pub struct InMemoryLibrary {
    state: RwLock<LibraryState>,
}

#[derive(Default)]
struct LibraryState {
    /// Durable collection keyed by id.
    assets: HashMap<String, MediaAsset>,
    /// Grouped snapshot, newest first within each group.
    groups: HashMap<GroupKey, Vec<Item>>,
    /// Soft-deletion blacklist.
    excluded: HashSet<String>,
}

impl LibraryState {
    fn rebuild_groups(&mut self) {
        let mut dated: HashMap<GroupKey, Vec<(chrono::DateTime<chrono::Utc>, Item)>> =
            HashMap::new();
        for asset in self.assets.values() {
            let date = asset.grouping_date();
            dated
                .entry(GroupKey::from_datetime(&date))
                .or_default()
                .push((date, asset.to_item()));
        }

        self.groups = dated
            .into_iter()
            .map(|(key, mut entries)| {
                entries.sort_by(|(a_date, a), (b_date, b)| {
                    b_date.cmp(a_date).then_with(|| a.id.cmp(&b.id))
                });
                (key, entries.into_iter().map(|(_, item)| item).collect())
            })
            .collect();
    }
}

impl InMemoryLibrary {
    /// Build a library from asset records.
    #[must_use]
    pub fn new(assets: impl IntoIterator<Item = MediaAsset>) -> Self {
        let mut state = LibraryState {
            assets: assets
                .into_iter()
                .map(|asset| (asset.id.clone(), asset))
                .collect(),
            ..LibraryState::default()
        };
        state.rebuild_groups();
        debug!(
            "Loaded {} assets into {} groups",
            state.assets.len(),
            state.groups.len()
        );

        Self {
            state: RwLock::new(state),
        }
    }

    /// Refresh the grouped snapshot from the durable collection.
    ///
    /// Exclusions for ids that no longer exist are dropped for good.
    pub fn reload(&self) {
        let mut state = self.write();
        state.rebuild_groups();
        let LibraryState {
            assets, excluded, ..
        } = &mut *state;
        excluded.retain(|id| assets.contains_key(id));
        info!(
            "Reloaded library: {} assets, {} excluded",
            assets.len(),
            excluded.len()
        );
    }

    /// Whether the durable collection still holds an asset.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().assets.contains_key(id)
    }

    /// Currently excluded ids.
    #[must_use]
    pub fn excluded_ids(&self) -> HashSet<String> {
        self.read().excluded.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, LibraryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LibraryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MediaLibrary for InMemoryLibrary {
    fn group_keys(&self) -> Vec<GroupKey> {
        self.read().groups.keys().copied().collect()
    }

    fn fetch_group(&self, key: GroupKey) -> Vec<Item> {
        let state = self.read();
        state
            .groups
            .get(&key)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| !state.excluded.contains(&item.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn apply_exclusion(&self, ids: &[String]) {
        self.write().excluded.extend(ids.iter().cloned());
    }

    fn lift_exclusion(&self, ids: &[String]) {
        let mut state = self.write();
        for id in ids {
            state.excluded.remove(id);
        }
    }

    async fn physical_delete(&self, ids: &[String]) -> DeletionOutcome {
        let mut state = self.write();
        let removed = ids
            .iter()
            .filter(|id| state.assets.remove(id.as_str()).is_some())
            .count();
        info!("Physically deleted {removed} of {} requested assets", ids.len());
        DeletionOutcome::Confirmed
    }
}
