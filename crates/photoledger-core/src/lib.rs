//! # photoledger-core
//!
//! Review engine for cleaning up a photo library one month at a time.
//!
//! This crate provides:
//! - Month grouping over a pluggable media library
//! - **Review sessions** - swipe-style keep/delete decisions with undo
//! - Two-phase deletion: stage, restore, then commit physically
//! - Per-group statistics and heat levels
//! - Durable review state (`SQLite`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
mod error;
pub mod library;
pub mod review;
pub mod state;
pub mod stats;

pub use config::Settings;
pub use engine::ReviewEngine;
pub use error::{Error, Result};
pub use library::{
    DeletionOutcome, GroupKey, InMemoryLibrary, Item, MediaAsset, MediaLibrary, ReviewStatus,
};
pub use review::{Decision, DeletionReceipt, DeletionRequest, ReviewSession, SessionEvent};
pub use state::{GroupCompletionState, StateRepository};
pub use stats::{GroupSummary, SessionCounts, StatisticsCache};
