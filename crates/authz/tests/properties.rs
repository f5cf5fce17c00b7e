//! Model-based checks of the decision function and enumerations.
//!
//! Random grant/revoke sequences are applied both to the store and to a plain
//! `BTreeSet` of pairs; afterwards every query must agree with the model.

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use teamvis_authz::VisibilityStore;
use teamvis_core::{PermissionEdge, TeamId};
use teamvis_storage::MemoryAdapter;

const TEAMS: i64 = 6;

#[derive(Debug, Clone, Copy)]
enum Op {
    Grant(i64, i64),
    Revoke(i64, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (any::<bool>(), 0..TEAMS, 0..TEAMS).prop_map(|(grant, s, o)| {
        if grant {
            Op::Grant(s, o)
        } else {
            Op::Revoke(s, o)
        }
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

async fn apply(ops: &[Op]) -> (VisibilityStore, MemoryAdapter, BTreeSet<(i64, i64)>) {
    let adapter = MemoryAdapter::new();
    let store = VisibilityStore::open(Arc::new(adapter.clone())).await.unwrap();
    let mut model = BTreeSet::new();

    for op in ops {
        match *op {
            Op::Grant(s, o) => {
                store.grant(s, o).await.unwrap();
                model.insert((s, o));
            }
            Op::Revoke(s, o) => {
                store.revoke(s, o).await.unwrap();
                model.remove(&(s, o));
            }
        }
    }

    (store, adapter, model)
}

proptest! {
    #[test]
    fn decision_matches_model(ops in prop::collection::vec(op_strategy(), 0..64)) {
        runtime().block_on(async {
            let (store, _, model) = apply(&ops).await;
            for s in 0..TEAMS {
                for o in 0..TEAMS {
                    assert_eq!(store.is_permitted(s, o).await, model.contains(&(s, o)), "({s}, {o})");
                }
            }
        });
    }

    #[test]
    fn enumerations_match_decision(ops in prop::collection::vec(op_strategy(), 0..64)) {
        runtime().block_on(async {
            let (store, _, _) = apply(&ops).await;
            for team in 0..TEAMS {
                let mut can_see = BTreeSet::new();
                let mut sees = BTreeSet::new();
                for other in 0..TEAMS {
                    if store.is_permitted(other, team).await {
                        can_see.insert(TeamId(other));
                    }
                    if store.is_permitted(team, other).await {
                        sees.insert(TeamId(other));
                    }
                }
                assert_eq!(store.teams_that_can_see(team).await, can_see);
                assert_eq!(store.teams_that_it_sees(team).await, sees);
            }
        });
    }

    #[test]
    fn listing_and_persistence_match_model(ops in prop::collection::vec(op_strategy(), 0..64)) {
        runtime().block_on(async {
            let (store, adapter, model) = apply(&ops).await;
            let expected: Vec<PermissionEdge> =
                model.iter().map(|&(s, o)| PermissionEdge::new(s, o)).collect();

            let mut listed = store.all_permissions().await;
            listed.sort();
            assert_eq!(listed, expected);

            let reopened = VisibilityStore::open(Arc::new(adapter)).await.unwrap();
            let mut relisted = reopened.all_permissions().await;
            relisted.sort();
            assert_eq!(relisted, expected);
        });
    }

    #[test]
    fn grant_and_revoke_are_idempotent(s in 0..TEAMS, o in 0..TEAMS, seed in prop::collection::vec(op_strategy(), 0..16)) {
        runtime().block_on(async {
            let (once, _, _) = apply(&seed).await;
            let (twice, _, _) = apply(&seed).await;

            once.grant(s, o).await.unwrap();
            twice.grant(s, o).await.unwrap();
            twice.grant(s, o).await.unwrap();
            assert_eq!(once.all_permissions().await, twice.all_permissions().await);

            once.revoke(s, o).await.unwrap();
            twice.revoke(s, o).await.unwrap();
            twice.revoke(s, o).await.unwrap();
            assert_eq!(once.all_permissions().await, twice.all_permissions().await);
        });
    }

    #[test]
    fn grant_then_revoke_is_inverse(s in 0..TEAMS, o in 0..TEAMS, seed in prop::collection::vec(op_strategy(), 0..16)) {
        runtime().block_on(async {
            let (store, _, _) = apply(&seed).await;
            store.grant(s, o).await.unwrap();
            assert!(store.is_permitted(s, o).await);
            store.revoke(s, o).await.unwrap();
            assert!(!store.is_permitted(s, o).await);
        });
    }

    #[test]
    fn grant_is_not_symmetric(s in 0..TEAMS, o in 0..TEAMS) {
        prop_assume!(s != o);
        runtime().block_on(async {
            let (store, _, _) = apply(&[]).await;
            store.grant(s, o).await.unwrap();
            assert!(!store.is_permitted(o, s).await);
        });
    }

    #[test]
    fn grant_is_not_transitive(a in 0..TEAMS, b in 0..TEAMS, c in 0..TEAMS) {
        prop_assume!(a != b && b != c && a != c);
        runtime().block_on(async {
            let (store, _, _) = apply(&[]).await;
            store.grant(a, b).await.unwrap();
            store.grant(b, c).await.unwrap();
            assert!(!store.is_permitted(a, c).await);
        });
    }
}
