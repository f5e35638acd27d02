//! Property tests for review session invariants.

use std::collections::HashSet;
use std::future::Future;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use photoledger_core::{
    Decision, DeletionOutcome, GroupKey, InMemoryLibrary, MediaAsset, ReviewEngine, ReviewSession,
    SessionEvent, StateRepository,
};

const KEY: GroupKey = GroupKey::new(2022, 3);

#[derive(Debug, Clone)]
enum Op {
    Keep,
    Delete,
    Undo,
    Restore(usize),
    Remove(usize),
    Commit,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Keep),
        3 => Just(Op::Delete),
        2 => Just(Op::Undo),
        1 => any::<usize>().prop_map(Op::Restore),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => Just(Op::Commit),
    ]
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

async fn open(size: u32) -> (ReviewEngine<InMemoryLibrary>, ReviewSession<InMemoryLibrary>) {
    let assets = (1..=size).map(|n| {
        MediaAsset::new(
            format!("img{n}"),
            Some(Utc.with_ymd_and_hms(2022, 3, 1, 0, n, 0).unwrap()),
        )
    });
    let engine = ReviewEngine::new(
        InMemoryLibrary::new(assets),
        StateRepository::in_memory().await.unwrap(),
    );
    let session = engine.open_session(KEY).await;
    (engine, session)
}

/// Apply one operation, returning the ids it physically removed.
async fn apply(session: &mut ReviewSession<InMemoryLibrary>, op: &Op) -> Vec<String> {
    match op {
        Op::Keep | Op::Delete => {
            let Some(item) = session.top().cloned() else {
                return Vec::new();
            };
            let decision = if matches!(op, Op::Keep) {
                Decision::Keep(item)
            } else {
                Decision::Delete(item)
            };
            session.apply_decision(decision).await;
            session.pop_top_card();
            Vec::new()
        }
        Op::Undo => {
            session.undo_last().await;
            Vec::new()
        }
        Op::Restore(pick) => {
            let staged = session.staged_ids();
            if !staged.is_empty() {
                let id = staged[pick % staged.len()].clone();
                session.restore_assets(&[id]).await;
            }
            Vec::new()
        }
        Op::Remove(pick) => {
            let staged = session.staged_ids();
            if staged.is_empty() {
                return Vec::new();
            }
            let id = staged[pick % staged.len()].clone();
            let event = session.remove_deleted_assets(std::slice::from_ref(&id)).await;
            assert_eq!(event, SessionEvent::Removed { count: 1 });
            vec![id]
        }
        Op::Commit => {
            let staged = session.staged_ids();
            let outcome = session.commit_deletion(&staged).await;
            assert_eq!(outcome, DeletionOutcome::Confirmed);
            staged
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    deck: Vec<String>,
    kept: Vec<String>,
    staged: Vec<String>,
    history: usize,
}

fn snapshot(session: &ReviewSession<InMemoryLibrary>) -> Snapshot {
    Snapshot {
        deck: session.deck().iter().map(|item| item.id.clone()).collect(),
        kept: session.kept().iter().map(|item| item.id.clone()).collect(),
        staged: session.staged_ids(),
        history: session.history().len(),
    }
}

/// Every live id sits exactly once in deck, kept or staged.
fn check_invariants(session: &ReviewSession<InMemoryLibrary>, live: &HashSet<String>) {
    let snapshot = snapshot(session);
    let all: Vec<&String> = snapshot
        .deck
        .iter()
        .chain(&snapshot.kept)
        .chain(&snapshot.staged)
        .collect();
    let distinct: HashSet<&String> = all.iter().copied().collect();
    assert_eq!(all.len(), live.len(), "items lost or duplicated");
    let expected: HashSet<&String> = live.iter().collect();
    assert_eq!(distinct, expected, "removed item still present");

    for (position, id) in snapshot.staged.iter().enumerate() {
        assert_eq!(session.staged_position(id), Some(position));
    }

    let summary = session.summary();
    assert_eq!(summary.reviewed() + summary.remaining(), summary.total);
    assert_eq!(summary.total, live.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_items_are_conserved(size in 1u32..12, ops in prop::collection::vec(op(), 0..40)) {
        block_on(async {
            let (_engine, mut session) = open(size).await;
            let mut live: HashSet<String> = (1..=size).map(|n| format!("img{n}")).collect();
            for op in &ops {
                for id in apply(&mut session, op).await {
                    assert!(live.remove(&id), "{id} removed twice");
                }
                check_invariants(&session, &live);
            }
        });
    }

    #[test]
    fn prop_undo_inverts_decision(
        size in 1u32..10,
        ops in prop::collection::vec(op(), 0..20),
        keep in any::<bool>(),
    ) {
        block_on(async {
            let (_engine, mut session) = open(size).await;
            for op in &ops {
                apply(&mut session, op).await;
            }
            let before = snapshot(&session);

            let decision = if keep { Op::Keep } else { Op::Delete };
            apply(&mut session, &decision).await;
            if before.deck.is_empty() {
                return;
            }
            session.undo_last().await;
            assert_eq!(snapshot(&session), before);
        });
    }

    #[test]
    fn prop_restore_then_redecide(size in 1u32..10, decisions in prop::collection::vec(any::<bool>(), 1..10)) {
        block_on(async {
            let (_engine, mut session) = open(size).await;
            for &keep in &decisions {
                apply(&mut session, if keep { &Op::Keep } else { &Op::Delete }).await;
            }
            let counts = session.counts();
            let staged = session.staged_ids();

            session.restore_assets(&staged).await;
            assert!(session.staged().is_empty());
            for _ in 0..staged.len() {
                apply(&mut session, &Op::Delete).await;
            }

            assert_eq!(session.counts(), counts);
            assert_eq!(session.staged_ids(), staged);
        });
    }
}
