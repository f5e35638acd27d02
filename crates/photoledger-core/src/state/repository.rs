//! Review state repository backed by `SQLite`.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::model::GroupCompletionState;
use crate::Result;
use crate::library::{GroupKey, Item};
use crate::stats::GroupSummary;

const ASSET_REVIEW_STATES: &str = "asset_review_states";
const GROUP_COMPLETION_STATES: &str = "group_completion_states";
const PENDING_DELETION_IDS: &str = "pending_deletion_ids";
const REVIEW_PROGRESS: &str = "review_progress";

const UPSERT_BLOB: &str = r"
    INSERT INTO state_blobs (key, value, updated_at)
    VALUES (?, ?, CURRENT_TIMESTAMP)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
";

/// Repository for per-item review state and per-group bookkeeping.
///
/// Every write is a read-modify-write of one blob. Writes are serialized
/// through an async mutex so sessions sharing the repository never lose
/// each other's updates.
pub struct StateRepository {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl StateRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self::with_pool(pool);
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        // A single connection that never expires: each in-memory connection
        // is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self::with_pool(pool);
        repo.initialize().await?;
        Ok(repo)
    }

    fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS state_blobs (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Asset review states

    /// Persisted review state of every item that has one.
    pub async fn asset_review_states(&self) -> HashMap<String, Item> {
        self.read_blob(ASSET_REVIEW_STATES).await
    }

    /// Persisted review state of one item.
    pub async fn asset_review_state(&self, id: &str) -> Option<Item> {
        self.asset_review_states().await.remove(id)
    }

    /// Save an item's review state, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_asset_review_state(&self, item: &Item) -> Result<()> {
        self.update_blob(ASSET_REVIEW_STATES, |states: &mut HashMap<String, Item>| {
            states.insert(item.id.clone(), item.clone());
        })
        .await
    }

    /// Erase the review state of the given items.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn remove_asset_review_states(&self, ids: &[String]) -> Result<()> {
        self.update_blob(ASSET_REVIEW_STATES, |states: &mut HashMap<String, Item>| {
            for id in ids {
                states.remove(id);
            }
        })
        .await
    }

    // Pending deletions

    /// Ids staged for deletion across all groups.
    pub async fn pending_deletion_ids(&self) -> BTreeSet<String> {
        self.read_blob(PENDING_DELETION_IDS).await
    }

    /// Add ids to the pending-deletion set.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn add_pending_deletions(&self, ids: &[String]) -> Result<()> {
        self.update_blob(PENDING_DELETION_IDS, |pending: &mut BTreeSet<String>| {
            pending.extend(ids.iter().cloned());
        })
        .await
    }

    /// Remove ids from the pending-deletion set.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn remove_pending_deletions(&self, ids: &[String]) -> Result<()> {
        self.update_blob(PENDING_DELETION_IDS, |pending: &mut BTreeSet<String>| {
            for id in ids {
                pending.remove(id);
            }
        })
        .await
    }

    /// Erase review state and pending-deletion entries for the given ids in
    /// a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; neither blob changes in that case.
    pub async fn forget_assets(&self, ids: &[String]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut states: HashMap<String, Item> = self.read_blob(ASSET_REVIEW_STATES).await;
        let mut pending: BTreeSet<String> = self.read_blob(PENDING_DELETION_IDS).await;
        for id in ids {
            states.remove(id);
            pending.remove(id);
        }

        let states = serde_json::to_string(&states)?;
        let pending = serde_json::to_string(&pending)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(UPSERT_BLOB)
            .bind(ASSET_REVIEW_STATES)
            .bind(&states)
            .execute(&mut *tx)
            .await?;
        sqlx::query(UPSERT_BLOB)
            .bind(PENDING_DELETION_IDS)
            .bind(&pending)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Forgot review state for {} assets", ids.len());
        Ok(())
    }

    // Group completion

    /// Completion snapshot of a group, if one was saved.
    pub async fn group_completion(&self, key: GroupKey) -> Option<GroupCompletionState> {
        let mut states: HashMap<GroupKey, GroupCompletionState> =
            self.read_blob(GROUP_COMPLETION_STATES).await;
        states.remove(&key)
    }

    /// Save a completion snapshot for the summary's group.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_group_completion(&self, summary: &GroupSummary) -> Result<()> {
        let state = GroupCompletionState::from_summary(summary, Utc::now());
        self.update_blob(
            GROUP_COMPLETION_STATES,
            |states: &mut HashMap<GroupKey, GroupCompletionState>| {
                states.insert(state.key, state);
            },
        )
        .await
    }

    /// Remove a group's completion snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn clear_group_completion(&self, key: GroupKey) -> Result<()> {
        self.update_blob(
            GROUP_COMPLETION_STATES,
            |states: &mut HashMap<GroupKey, GroupCompletionState>| {
                states.remove(&key);
            },
        )
        .await
    }

    // Review progress

    /// Number of items reviewed in a group's unfinished session, 0 if none.
    pub async fn review_progress(&self, key: GroupKey) -> usize {
        let progress: HashMap<GroupKey, usize> = self.read_blob(REVIEW_PROGRESS).await;
        progress.get(&key).copied().unwrap_or(0)
    }

    /// Save a group's in-progress counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_review_progress(&self, key: GroupKey, reviewed: usize) -> Result<()> {
        self.update_blob(REVIEW_PROGRESS, |progress: &mut HashMap<GroupKey, usize>| {
            progress.insert(key, reviewed);
        })
        .await
    }

    /// Remove a group's in-progress counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn clear_review_progress(&self, key: GroupKey) -> Result<()> {
        self.update_blob(REVIEW_PROGRESS, |progress: &mut HashMap<GroupKey, usize>| {
            progress.remove(&key);
        })
        .await
    }

    // Blob plumbing

    /// Read and decode a blob, falling back to the default on any failure.
    async fn read_blob<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let row = match sqlx::query("SELECT value FROM state_blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                warn!("Failed to read {key}, using empty state: {e}");
                return T::default();
            }
        };

        let Some(row) = row else {
            return T::default();
        };
        let raw: String = row.get("value");

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Corrupt {key} blob, treating as empty: {e}");
            T::default()
        })
    }

    async fn write_blob<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let raw = serde_json::to_string(value)?;
        sqlx::query(UPSERT_BLOB)
            .bind(key)
            .bind(&raw)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_blob<T, F>(&self, key: &str, update: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T),
    {
        let _guard = self.write_lock.lock().await;
        let mut value: T = self.read_blob(key).await;
        update(&mut value);
        self.write_blob(key, &value).await
    }

    /// Overwrite a blob with raw text, bypassing encoding.
    #[cfg(test)]
    async fn write_raw(&self, key: &str, raw: &str) -> Result<()> {
        sqlx::query(UPSERT_BLOB)
            .bind(key)
            .bind(raw)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
