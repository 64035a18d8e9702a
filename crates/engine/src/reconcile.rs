// Path: crates/engine/src/reconcile.rs
//! Post-submission reconciliation.
//!
//! The router's [`BatchOutcome`] is never trusted as final. After every
//! attempt both authorities are re-queried and the selected rewards are
//! classified from the fresh snapshot alone.

use claimkit_types::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Classifies `selected` against `next` and lists every state change
/// between `previous` and `next`.
///
/// * claimed in `next`, or no longer listed: `Claimed`
/// * expired in `next`: `Failed(RewardExpired)`
/// * still claimable with an item-level error in `outcome`: `Failed`
/// * anything else (including an unavailable chain): `StillPending`
pub fn reconcile(
    previous: &ClaimableSnapshot,
    next: &ClaimableSnapshot,
    selected: &[RewardId],
    outcome: Option<&BatchOutcome>,
) -> ReconcileDiff {
    let unavailable: BTreeSet<&RewardId> = next.unavailable.iter().map(|u| &u.id).collect();

    let outcomes = selected
        .iter()
        .map(|id| {
            let state = match next.get(id) {
                None if unavailable.contains(id) => ReconciledState::StillPending,
                None => ReconciledState::Claimed,
                Some(r) => match r.state {
                    RewardState::Claimed => ReconciledState::Claimed,
                    RewardState::Expired => ReconciledState::Failed(ClaimError::RewardExpired(id.clone())),
                    _ => match outcome.and_then(|o| o.item_error(id)) {
                        Some(e) => ReconciledState::Failed(e.clone()),
                        None => ReconciledState::StillPending,
                    },
                },
            };
            (id.clone(), state)
        })
        .collect::<BTreeMap<_, _>>();

    let diff = ReconcileDiff {
        outcomes,
        transitions: transitions(previous, next),
        batch_error: outcome.and_then(|o| o.error.clone()),
    };
    tracing::info!(
        target: "reconcile",
        selected = selected.len(),
        claimed = diff.claimed().len(),
        pending = diff.outcomes.values().filter(|s| matches!(s, ReconciledState::StillPending)).count(),
        transitions = diff.transitions.len(),
        "reconciled claim attempt"
    );
    diff
}

/// Rewards whose state differs between the two snapshots, in id order.
pub fn transitions(previous: &ClaimableSnapshot, next: &ClaimableSnapshot) -> Vec<Transition> {
    let before: BTreeMap<RewardId, RewardState> = previous.iter().map(|r| (r.id(), r.state)).collect();
    let after: BTreeMap<RewardId, RewardState> = next.iter().map(|r| (r.id(), r.state)).collect();
    let ids: BTreeSet<&RewardId> = before.keys().chain(after.keys()).collect();

    ids.into_iter()
        .filter_map(|id| {
            let b = before.get(id).copied();
            let a = after.get(id).copied();
            (b != a).then(|| Transition {
                id: id.clone(),
                before: b,
                after: a,
            })
        })
        .collect()
}
