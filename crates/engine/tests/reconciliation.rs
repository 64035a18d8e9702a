// Path: crates/engine/tests/reconciliation.rs

mod common;

use claimkit_test_utils::fixtures::{self, NOW};
use claimkit_test_utils::mocks::SubmitBehavior;
use claimkit_test_utils::{assert_err, assert_ok, assert_reconciled};
use claimkit_types::config::ConfirmationConfig;
use claimkit_types::prelude::*;
use common::{select, Harness};
use std::collections::HashSet;

#[tokio::test]
async fn two_on_chain_rewards_claimed_end_to_end() {
    let h = Harness::new()
        .with_campaign(7, 100)
        .with_campaign(8, 50)
        .with_ledger_reward("quest-bonus", 25);
    let session = fixtures::session();

    let before = h.snapshot().await;
    assert_eq!(before.total, 3);
    assert_eq!(before.blockchain.len(), 2);
    assert_eq!(before.database.len(), 1);

    let ids = [fixtures::on_chain_id(7), fixtures::on_chain_id(8)];
    let items = select(&before, &ids);
    let estimate = match assert_ok!(h.engine.estimate_batch_cost(&session, items.clone()).await) {
        EstimateOutcome::Current(e) => e,
        EstimateOutcome::Superseded => panic!("no competing selection"),
    };
    assert!(estimate.estimated_cost > U256::ZERO);
    assert_eq!(estimate.gas_units, 2 * 80_000);
    assert_eq!(
        estimate.estimated_cost,
        U256::from(estimate.gas_price) * U256::from(estimate.gas_units)
    );

    let (outcome, after, diff) = assert_ok!(
        h.engine
            .claim_and_reconcile(&session, &before, ClaimBatch::new(items).unwrap())
            .await
    );
    assert_eq!(outcome.status(), BatchStatus::Success);
    assert_eq!(h.distributor.submissions(), 1);
    assert_reconciled!(diff, fixtures::on_chain_id(7), ReconciledState::Claimed);
    assert_reconciled!(diff, fixtures::on_chain_id(8), ReconciledState::Claimed);
    assert_eq!(diff.outcomes.len(), 2);

    let ledger_item = after
        .get(&RewardId::ledger("quest-bonus"))
        .expect("ledger reward still listed");
    assert_eq!(ledger_item.state, RewardState::Unclaimed);
    assert_eq!(diff.transitions.len(), 2);
    assert!(diff
        .transitions
        .iter()
        .all(|t| t.after == Some(RewardState::Claimed)));
}

#[tokio::test]
async fn partitions_never_share_an_id() {
    let h = Harness::new()
        .with_campaign(7, 100)
        .with_ledger_reward("7", 25)
        .with_ledger_reward("quest-7", 5);
    let snapshot = h.snapshot().await;
    let on_chain: HashSet<RewardId> = snapshot.blockchain.iter().map(|r| r.id()).collect();
    assert!(snapshot.database.iter().all(|r| !on_chain.contains(&r.id())));
    assert_eq!(snapshot.total, 3);
}

#[tokio::test]
async fn expired_rewards_stay_visible_but_unsubmittable() {
    let h = Harness::new();
    h.distributor.add_campaign(7, fixtures::campaign(7, NOW - 1));
    h.ledger.add_entitlement(fixtures::entitlement(7, 100));

    let snapshot = h.snapshot().await;
    let reward = snapshot
        .get(&fixtures::on_chain_id(7))
        .cloned()
        .expect("expired reward is listed");
    assert_eq!(reward.state, RewardState::Expired);
    assert_eq!(snapshot.claimable().count(), 0);

    let err = assert_err!(ClaimBatch::new(vec![reward]));
    assert!(matches!(err, ClaimError::InvalidBatch(_)), "{err:?}");
}

#[tokio::test]
async fn rewards_expire_as_the_clock_passes_their_deadline() {
    let h = Harness::new();
    h.distributor.add_campaign(7, fixtures::campaign(7, NOW + 10));
    h.ledger.add_entitlement(fixtures::entitlement(7, 100));

    let before = h.snapshot().await;
    assert_eq!(before.claimable().count(), 1);
    h.clock.advance(11);
    let session = fixtures::session();
    let (_, diff) = assert_ok!(h.engine.refresh_and_reconcile(&session, &before, None).await);
    assert!(diff.outcomes.is_empty());
    assert_eq!(
        diff.transitions,
        vec![Transition {
            id: fixtures::on_chain_id(7),
            before: Some(RewardState::Unclaimed),
            after: Some(RewardState::Expired),
        }]
    );
}

#[tokio::test]
async fn superseded_estimate_does_not_overwrite_newer_selection() {
    let h = Harness::new().with_campaign(7, 100).with_campaign(8, 50);
    let snapshot = h.snapshot().await;
    let session = fixtures::session();
    let gate = h.distributor.gate_estimate(7);

    let stale = {
        let engine = h.engine.clone();
        let session = session.clone();
        let items = select(&snapshot, &[fixtures::on_chain_id(7)]);
        tokio::spawn(async move { engine.estimate_batch_cost(&session, items).await })
    };
    while h.distributor.estimate_calls() == 0 {
        tokio::task::yield_now().await;
    }

    let items = select(&snapshot, &[fixtures::on_chain_id(8)]);
    let fresh = match assert_ok!(h.engine.estimate_batch_cost(&session, items).await) {
        EstimateOutcome::Current(e) => e,
        EstimateOutcome::Superseded => panic!("latest selection must win"),
    };

    gate.notify_one();
    let stale = assert_ok!(stale.await.expect("join"));
    assert_eq!(stale, EstimateOutcome::Superseded);
    assert_eq!(h.engine.current_estimate(), Some(fresh));

    h.engine.selection_changed();
    assert_eq!(h.engine.current_estimate(), None);
}

#[tokio::test(start_paused = true)]
async fn timed_out_confirmation_settles_on_a_later_refresh() {
    let h = Harness::with_confirmation(ConfirmationConfig {
        poll_interval_ms: 100,
        timeout_secs: Some(30),
    })
    .with_campaign(7, 100);
    let session = fixtures::session();
    let before = h.snapshot().await;

    h.distributor.set_behavior(SubmitBehavior::NeverConfirm);
    let batch = ClaimBatch::new(select(&before, &[fixtures::on_chain_id(7)])).unwrap();
    let prepared = assert_ok!(h.engine.prepare_claim(&session, batch).await);
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared).await);
    assert_eq!(outcome.error, Some(ClaimError::TransactionTimeout));
    assert_eq!(outcome.status(), BatchStatus::Pending);
    assert_eq!(outcome.pending_count(), 1);

    // Never confirmed: the watch gives up after its polling budget.
    let (_, diff) = assert_ok!(h.engine.watch_until_settled(&session, &before, &outcome).await);
    assert!(diff.has_pending());

    // The transaction lands later; the next watch discovers it.
    h.distributor.mark_claimed(7, fixtures::user());
    let (after, diff) = assert_ok!(h.engine.watch_until_settled(&session, &before, &outcome).await);
    assert!(!diff.has_pending());
    assert_reconciled!(diff, fixtures::on_chain_id(7), ReconciledState::Claimed);
    assert!(after.is_claimed(&fixtures::on_chain_id(7)));
}

#[tokio::test]
async fn ledger_outage_fails_the_refresh() {
    let h = Harness::new().with_ledger_reward("a", 1);
    let before = h.snapshot().await;
    h.ledger.set_unreachable(true);
    let err = assert_err!(
        h.engine
            .refresh_and_reconcile(&fixtures::session(), &before, None)
            .await
    );
    assert!(matches!(err, ClaimError::NetworkError(_)));
    // The last good snapshot is kept.
    assert_eq!(h.engine.latest_snapshot().await, Some(before));
}
