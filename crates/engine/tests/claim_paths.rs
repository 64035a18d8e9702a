// Path: crates/engine/tests/claim_paths.rs

mod common;

use claimkit_test_utils::fixtures::{self, CHAIN_ID};
use claimkit_test_utils::mocks::SubmitBehavior;
use claimkit_test_utils::{assert_err, assert_ok, assert_reconciled};
use claimkit_types::prelude::*;
use common::{select, Harness};

#[tokio::test]
async fn second_submission_of_in_flight_batch_is_rejected() {
    let h = Harness::new().with_campaign(7, 100).with_campaign(8, 50);
    let snapshot = h.snapshot().await;
    let items = select(&snapshot, &[fixtures::on_chain_id(7), fixtures::on_chain_id(8)]);
    let session = fixtures::session();
    let prepared = assert_ok!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(items).unwrap())
            .await
    );

    let gate = h.distributor.gate_confirmations();
    let first = {
        let engine = h.engine.clone();
        let session = session.clone();
        let prepared = prepared.clone();
        tokio::spawn(async move { engine.submit_claim_batch(&session, prepared).await })
    };
    while h.distributor.submissions() == 0 {
        tokio::task::yield_now().await;
    }

    let err = assert_err!(h.engine.submit_claim_batch(&session, prepared.clone()).await);
    assert!(matches!(err, ClaimError::BatchInFlight(_)), "{err:?}");
    let overlapping = select(&snapshot, &[fixtures::on_chain_id(8)]);
    let err = assert_err!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(overlapping).unwrap())
            .await
    );
    assert!(matches!(err, ClaimError::BatchInFlight(_)), "{err:?}");
    assert_eq!(h.distributor.submissions(), 1);

    gate.notify_one();
    let outcome = assert_ok!(first.await.expect("join"));
    assert_eq!(outcome.status(), BatchStatus::Success);
    assert_eq!(h.distributor.submissions(), 1);

    // Resolved; a resubmission now fails on the authoritative claim check
    // instead of the in-flight guard, still without a transaction.
    let err = assert_err!(h.engine.submit_claim_batch(&session, prepared).await);
    assert!(matches!(err, ClaimError::AlreadyClaimed(_)), "{err:?}");
    assert_eq!(h.distributor.submissions(), 1);
}

#[tokio::test]
async fn reverted_batch_leaves_every_item_pending() {
    let h = Harness::new().with_campaign(7, 100).with_campaign(8, 50);
    let before = h.snapshot().await;
    let ids = [fixtures::on_chain_id(7), fixtures::on_chain_id(8)];
    let batch = ClaimBatch::new(select(&before, &ids)).unwrap();
    let session = fixtures::session();

    h.distributor
        .set_behavior(SubmitBehavior::Revert("Invalid proof".into()));
    let prepared = assert_ok!(h.engine.prepare_claim(&session, batch).await);
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared).await);

    assert_eq!(outcome.status(), BatchStatus::Failure);
    assert_eq!(outcome.claimed_count(), 0);
    assert_eq!(
        outcome.error,
        Some(ClaimError::TransactionReverted("Invalid proof".into()))
    );
    assert!(outcome.tx_hash.is_some());

    let (_, diff) = assert_ok!(
        h.engine
            .refresh_and_reconcile(&session, &before, Some(&outcome))
            .await
    );
    for id in &ids {
        assert_reconciled!(diff, id.clone(), ReconciledState::StillPending);
    }
    assert!(!h.distributor.is_claimed(7, fixtures::user()));
    assert!(!h.distributor.is_claimed(8, fixtures::user()));
    assert_eq!(
        diff.batch_error,
        Some(ClaimError::TransactionReverted("Invalid proof".into()))
    );
}

#[tokio::test]
async fn user_rejection_sends_nothing() {
    let h = Harness::new().with_campaign(7, 100);
    let snapshot = h.snapshot().await;
    let session = fixtures::session();
    let batch = ClaimBatch::new(select(&snapshot, &[fixtures::on_chain_id(7)])).unwrap();

    h.distributor.set_behavior(SubmitBehavior::RejectByUser);
    let prepared = assert_ok!(h.engine.prepare_claim(&session, batch).await);
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared).await);
    assert_eq!(outcome.status(), BatchStatus::Failure);
    assert_eq!(outcome.error, Some(ClaimError::UserRejectedTransaction));
    assert_eq!(outcome.tx_hash, None);
    assert_eq!(h.distributor.submissions(), 0);
}

#[tokio::test]
async fn ledger_rejection_is_isolated_to_its_item() {
    let h = Harness::new()
        .with_ledger_reward("a", 10)
        .with_ledger_reward("b", 20)
        .with_ledger_reward("c", 30)
        .with_ledger_reward("d", 40);
    h.ledger.reject("b", "quest not completed");
    let before = h.snapshot().await;
    let ids: Vec<RewardId> = ["a", "b", "c", "d"].into_iter().map(RewardId::ledger).collect();
    let session = fixtures::session();

    let prepared = assert_ok!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(select(&before, &ids)).unwrap())
            .await
    );
    assert!(prepared.estimate().is_none());
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared).await);

    assert_eq!(h.ledger.claim_log(), vec!["a", "b", "c", "d"]);
    assert_eq!(outcome.status(), BatchStatus::PartialSuccess);
    assert_eq!(outcome.claimed_count(), 3);
    assert_eq!(outcome.failed_count(), 1);
    let rejected = ClaimError::LedgerClaimRejected {
        reward_id: "b".into(),
        reason: "quest not completed".into(),
    };
    assert_eq!(outcome.item_error(&RewardId::ledger("b")), Some(&rejected));

    let (next, diff) = assert_ok!(
        h.engine
            .refresh_and_reconcile(&session, &before, Some(&outcome))
            .await
    );
    assert_eq!(next.database.len(), 1);
    assert_eq!(diff.claimed().len(), 3);
    assert_eq!(
        diff.outcomes.get(&RewardId::ledger("b")),
        Some(&ReconciledState::Failed(rejected))
    );
}

#[tokio::test]
async fn lost_ledger_response_is_pending_until_refresh() {
    let h = Harness::new()
        .with_ledger_reward("a", 10)
        .with_ledger_reward("b", 20);
    h.ledger.drop_response("a");
    let before = h.snapshot().await;
    let session = fixtures::session();
    let ids = [RewardId::ledger("a"), RewardId::ledger("b")];

    let prepared = assert_ok!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(select(&before, &ids)).unwrap())
            .await
    );
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared).await);
    assert_eq!(
        outcome.per_item.get(&RewardId::ledger("a")),
        Some(&ItemOutcome::Pending)
    );
    // Not retried.
    assert_eq!(h.ledger.claim_log(), vec!["a", "b"]);

    let (_, diff) = assert_ok!(
        h.engine
            .refresh_and_reconcile(&session, &before, Some(&outcome))
            .await
    );
    assert_reconciled!(diff, RewardId::ledger("a"), ReconciledState::Claimed);
    assert_reconciled!(diff, RewardId::ledger("b"), ReconciledState::Claimed);
}

#[tokio::test]
async fn preconditions_block_submission() {
    let h = Harness::new().with_campaign(7, 100).with_campaign(8, 50);
    let snapshot = h.snapshot().await;
    let session = fixtures::session();
    let item = |c| select(&snapshot, &[fixtures::on_chain_id(c)]);

    // No wallet.
    let err = assert_err!(
        h.engine
            .prepare_claim(&ClaimSession::disconnected(), ClaimBatch::new(item(7)).unwrap())
            .await
    );
    assert_eq!(err, ClaimError::WalletNotConnected);

    // Missing proof rejects the whole batch.
    let mut unproven = item(8);
    if let Some(ClaimPath::OnChain(terms)) = unproven.first_mut().map(|r| &mut r.path) {
        terms.proof = None;
    }
    let mut items = item(7);
    items.extend(unproven);
    let err = assert_err!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(items).unwrap())
            .await
    );
    assert_eq!(err, ClaimError::MissingClaimProof(fixtures::on_chain_id(8)));

    // Paused distributor.
    h.distributor.set_paused(true);
    let err = assert_err!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(item(7)).unwrap())
            .await
    );
    assert_eq!(err, ClaimError::DistributorPaused(CHAIN_ID));
    h.distributor.set_paused(false);

    // Claimed on chain since the snapshot.
    h.distributor.mark_claimed(7, fixtures::user());
    let err = assert_err!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(item(7)).unwrap())
            .await
    );
    assert_eq!(err, ClaimError::AlreadyClaimed(fixtures::on_chain_id(7)));

    assert_eq!(h.distributor.submissions(), 0);
}

#[tokio::test]
async fn undeployed_chain_makes_on_chain_path_unavailable() {
    let h = Harness::new();
    let session = fixtures::session();
    let mut reward = fixtures::on_chain_reward(7, 100);
    if let ClaimPath::OnChain(terms) = &mut reward.path {
        terms.chain_id = 10;
    }
    let err = assert_err!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(vec![reward.clone()]).unwrap())
            .await
    );
    assert_eq!(err, ClaimError::ContractNotDeployed(10));
    let err = assert_err!(h.engine.estimate_batch_cost(&session, vec![reward]).await);
    assert_eq!(err, ClaimError::ContractNotDeployed(10));
}

#[tokio::test]
async fn dropping_a_prepared_claim_has_no_side_effects() {
    let h = Harness::new().with_campaign(7, 100);
    let snapshot = h.snapshot().await;
    let session = fixtures::session();
    let prepared = assert_ok!(
        h.engine
            .prepare_claim(
                &session,
                ClaimBatch::new(select(&snapshot, &[fixtures::on_chain_id(7)])).unwrap()
            )
            .await
    );
    assert!(prepared.estimate().is_some());
    drop(prepared);

    assert_eq!(h.distributor.submissions(), 0);
    let after = h.snapshot().await;
    assert_eq!(after, snapshot);
}

#[tokio::test]
async fn settled_ledger_claim_is_never_resubmitted() {
    let h = Harness::new().with_ledger_reward("a", 10);
    let before = h.snapshot().await;
    let session = fixtures::session();
    let prepared = assert_ok!(
        h.engine
            .prepare_claim(
                &session,
                ClaimBatch::new(select(&before, &[RewardId::ledger("a")])).unwrap()
            )
            .await
    );

    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared.clone()).await);
    assert_eq!(outcome.status(), BatchStatus::Success);
    let (_, diff) = assert_ok!(
        h.engine
            .refresh_and_reconcile(&session, &before, Some(&outcome))
            .await
    );
    assert_reconciled!(diff, RewardId::ledger("a"), ReconciledState::Claimed);

    // The refresh no longer lists "a"; a stale prepared claim must not reach the ledger.
    let err = assert_err!(h.engine.submit_claim_batch(&session, prepared).await);
    assert_eq!(err, ClaimError::AlreadyClaimed(RewardId::ledger("a")));
    assert_eq!(h.ledger.claim_log(), vec!["a"]);
}

#[tokio::test]
async fn refresh_during_confirmation_reports_claim_submitted() {
    let h = Harness::new().with_campaign(7, 100);
    let before = h.snapshot().await;
    let session = fixtures::session();
    let id = fixtures::on_chain_id(7);
    let prepared = assert_ok!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(select(&before, &[id.clone()])).unwrap())
            .await
    );

    h.distributor
        .set_behavior(SubmitBehavior::Revert("Invalid proof".into()));
    let gate = h.distributor.gate_confirmations();
    let submit = {
        let engine = h.engine.clone();
        let session = session.clone();
        tokio::spawn(async move { engine.submit_claim_batch(&session, prepared).await })
    };
    while h.distributor.submissions() == 0 {
        tokio::task::yield_now().await;
    }

    let during = h.snapshot().await;
    assert_eq!(during.get(&id).map(|r| r.state), Some(RewardState::ClaimSubmitted));
    assert!(during.claimable().next().is_none());

    gate.notify_one();
    let outcome = assert_ok!(submit.await.expect("join"));
    assert_eq!(outcome.status(), BatchStatus::Failure);

    // The revert is remembered until the reward settles, and it stays claimable.
    let after = h.snapshot().await;
    let failed = after.get(&id).cloned().expect("still listed");
    assert_eq!(failed.state, RewardState::Failed);
    assert!(failed.is_claimable());

    h.distributor.set_behavior(SubmitBehavior::Succeed);
    gate.notify_one();
    let retry = assert_ok!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(vec![failed]).unwrap())
            .await
    );
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, retry).await);
    assert_eq!(outcome.status(), BatchStatus::Success);
    let settled = h.snapshot().await;
    assert_eq!(settled.get(&id).map(|r| r.state), Some(RewardState::Claimed));
}

#[tokio::test]
async fn ledger_auth_expiring_mid_batch_fails_the_remaining_items() {
    let h = Harness::new()
        .with_ledger_reward("a", 10)
        .with_ledger_reward("b", 20)
        .with_ledger_reward("c", 30);
    let before = h.snapshot().await;
    let session = fixtures::session();
    let ids: Vec<RewardId> = ["a", "b", "c"].into_iter().map(RewardId::ledger).collect();
    let prepared = assert_ok!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(select(&before, &ids)).unwrap())
            .await
    );

    h.ledger.expire_auth_after(1);
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared).await);

    assert_eq!(h.ledger.claim_log(), vec!["a", "b", "c"]);
    assert_eq!(outcome.status(), BatchStatus::PartialSuccess);
    assert_eq!(
        outcome.per_item.get(&RewardId::ledger("a")),
        Some(&ItemOutcome::Claimed)
    );
    for id in ["b", "c"] {
        assert_eq!(
            outcome.item_error(&RewardId::ledger(id)),
            Some(&ClaimError::LedgerAuthExpired)
        );
    }

    // Re-authentication is the caller's job; the refresh fails and the last
    // snapshot is kept.
    let err = assert_err!(
        h.engine
            .refresh_and_reconcile(&session, &before, Some(&outcome))
            .await
    );
    assert_eq!(err, ClaimError::LedgerAuthExpired);
    assert_eq!(h.engine.latest_snapshot().await, Some(before));
}

#[tokio::test]
async fn pause_between_prepare_and_submit_sends_nothing() {
    let h = Harness::new().with_campaign(7, 100);
    let snapshot = h.snapshot().await;
    let session = fixtures::session();
    let prepared = assert_ok!(
        h.engine
            .prepare_claim(
                &session,
                ClaimBatch::new(select(&snapshot, &[fixtures::on_chain_id(7)])).unwrap()
            )
            .await
    );

    h.distributor.set_paused(true);
    let err = assert_err!(h.engine.submit_claim_batch(&session, prepared).await);
    assert_eq!(err, ClaimError::DistributorPaused(CHAIN_ID));
    assert!(err.is_precondition());
    assert_eq!(h.distributor.submissions(), 0);
}

#[tokio::test]
async fn send_time_simulation_failure_is_reported_in_the_outcome() {
    let h = Harness::new().with_campaign(7, 100).with_campaign(8, 50);
    let before = h.snapshot().await;
    let session = fixtures::session();
    let ids = [fixtures::on_chain_id(7), fixtures::on_chain_id(8)];
    let prepared = assert_ok!(
        h.engine
            .prepare_claim(&session, ClaimBatch::new(select(&before, &ids)).unwrap())
            .await
    );

    h.distributor
        .set_behavior(SubmitBehavior::FailSimulation("Campaign ended".into()));
    let outcome = assert_ok!(h.engine.submit_claim_batch(&session, prepared).await);
    assert_eq!(outcome.status(), BatchStatus::Failure);
    assert_eq!(
        outcome.error,
        Some(ClaimError::SimulationFailed("Campaign ended".into()))
    );
    assert_eq!(outcome.tx_hash, None);
    assert_eq!(outcome.pending_count(), 2);
    assert_eq!(h.distributor.submissions(), 0);

    let (next, diff) = assert_ok!(
        h.engine
            .refresh_and_reconcile(&session, &before, Some(&outcome))
            .await
    );
    for id in &ids {
        assert_reconciled!(diff, id.clone(), ReconciledState::StillPending);
        assert_eq!(next.get(id).map(|r| r.state), Some(RewardState::Failed));
    }
    assert_eq!(
        diff.batch_error,
        Some(ClaimError::SimulationFailed("Campaign ended".into()))
    );
}
