//! Media library access.
//!
//! The review engine never talks to a platform photo framework directly. It
//! goes through [`MediaLibrary`], which supplies items grouped by month,
//! keeps the soft-deletion exclusion set, and performs the one irreversible
//! operation: physical deletion.
//!
//! # Example
//!
//! ```ignore
//! use photoledger_core::library::{InMemoryLibrary, MediaAsset, MediaLibrary};
//!
//! let library = InMemoryLibrary::new(assets);
//! for key in library.group_keys() {
//!     let items = library.fetch_group(key);
//! }
//! ```

mod memory;
mod model;

use std::future::Future;

pub use memory::InMemoryLibrary;
pub use model::{DeletionOutcome, GroupKey, Item, MediaAsset, ParseGroupKeyError, ReviewStatus};

/// Source of media items, grouped by month.
///
/// Implementations use interior mutability: a library is shared between the
/// engine and every open session behind an `Arc`.
pub trait MediaLibrary: Send + Sync {
    /// Keys of every group that currently has items, in any order.
    fn group_keys(&self) -> Vec<GroupKey>;

    /// Items of one group, newest first, with excluded ids removed.
    fn fetch_group(&self, key: GroupKey) -> Vec<Item>;

    /// Hide ids from every group view without touching the collection.
    fn apply_exclusion(&self, ids: &[String]);

    /// Make previously excluded ids visible again.
    fn lift_exclusion(&self, ids: &[String]);

    /// Irreversibly delete items from the collection.
    ///
    /// The platform may ask the user to confirm, so the call can be
    /// cancelled as well as fail.
    fn physical_delete(&self, ids: &[String]) -> impl Future<Output = DeletionOutcome> + Send;
}
