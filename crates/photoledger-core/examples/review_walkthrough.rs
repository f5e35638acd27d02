#![allow(clippy::expect_used, clippy::uninlined_format_args)]
//! Example: review one month of a small library end to end
//!
//! Builds an in-memory library, reviews its newest month by alternating
//! keep and delete, restores one staged photo, then commits the rest.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=photoledger_core=debug cargo run --package photoledger-core --example review_walkthrough
//! ```
//!
//! Review state is written to `PHOTOLEDGER_DATA_DIR` if set, otherwise to a
//! scratch directory under the system temp dir.

use std::env;
use std::path::PathBuf;

use chrono::{Duration, TimeZone, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photoledger_core::{Decision, InMemoryLibrary, MediaAsset, ReviewEngine, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoledger_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = env::var("PHOTOLEDGER_DATA_DIR")
        .map_or_else(|_| env::temp_dir().join("photoledger-walkthrough"), PathBuf::from);
    let settings = Settings {
        data_dir: Some(data_dir),
        heat_thresholds: vec![0, 2, 4, 8],
        ..Settings::default()
    };

    // Two months of photos, one every other day.
    let start = Utc
        .with_ymd_and_hms(2024, 4, 1, 9, 0, 0)
        .single()
        .expect("valid start date");
    let assets = (0..30).map(|n| {
        MediaAsset::new(format!("IMG_{:04}", n), Some(start + Duration::days(n * 2)))
    });

    let engine = ReviewEngine::open(&settings, InMemoryLibrary::new(assets)).await?;
    println!("Database: {}", settings.database_path().display());

    let summaries = engine.load_summaries().await;
    for summary in &summaries {
        println!(
            "{}  {:>3} photos  {:>3} reviewed  heat {}",
            summary.key,
            summary.total,
            summary.reviewed(),
            engine.heat_level(summary)
        );
    }

    let Some(newest) = summaries.first() else {
        println!("Nothing to review");
        return Ok(());
    };

    let mut session = engine.open_session(newest.key).await;
    session.set_on_complete(|key| println!("Finished reviewing {}", key));

    let mut keep = true;
    while let Some(item) = session.top().cloned() {
        let decision = if keep {
            Decision::Keep(item)
        } else {
            Decision::Delete(item)
        };
        session.apply_decision(decision).await;
        session.pop_top_card();
        keep = !keep;
    }
    println!(
        "Kept {}, staged {} for deletion",
        session.kept().len(),
        session.staged().len()
    );

    if let Some(first) = session.staged_ids().first().cloned() {
        session.restore_assets(&[first.clone()]).await;
        println!("Restored {} for another look", first);
    }

    let outcome = session.commit_deletion(&session.staged_ids()).await;
    let summary = session.summary();
    println!(
        "Commit {:?}: {} photos left in {}, {:.0}% reviewed",
        outcome,
        summary.total,
        summary.key,
        summary.completion_rate() * 100.0
    );

    Ok(())
}
