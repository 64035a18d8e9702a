// Path: crates/engine/src/router.rs
//! Claim path routing.
//!
//! On-chain batches go out as one atomic transaction: they succeed or fail
//! as a whole. Ledger batches are claimed one item at a time, in order, and
//! each item's failure is isolated from the others.

use crate::estimate::GasEstimator;
use claimkit_api::{CampaignSource, ChainRegistry, ClaimCall, Confirmation, LedgerSource};
use claimkit_telemetry::{claim_metrics, time::Timer};
use claimkit_types::config::{ConfirmationConfig, GasConfig};
use claimkit_types::prelude::*;
use dashmap::DashSet;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A batch that passed every precondition and is ready to submit.
///
/// Preparing never sends anything; dropping a `PreparedClaim` is how a
/// caller aborts between estimate and submission.
#[derive(Debug, Clone)]
pub struct PreparedClaim {
    batch: ClaimBatch,
    calls: Vec<ClaimCall>,
    estimate: Option<CostEstimate>,
}

impl PreparedClaim {
    pub fn batch(&self) -> &ClaimBatch {
        &self.batch
    }

    /// The cost estimate; `None` for ledger batches, which cost no gas.
    pub fn estimate(&self) -> Option<&CostEstimate> {
        self.estimate.as_ref()
    }
}

/// Removes its rewards from the in-flight set when dropped.
struct InFlightGuard {
    set: Arc<DashSet<RewardId>>,
    ids: Vec<RewardId>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        for id in &self.ids {
            self.set.remove(id);
        }
    }
}

/// Routes prepared batches to the claim path their source implies.
///
/// A reward belongs to at most one in-flight submission at a time, so two
/// overlapping selections can never both reach an authority.
#[derive(Clone)]
pub struct ClaimRouter {
    chains: ChainRegistry,
    ledger: Arc<dyn LedgerSource>,
    estimator: GasEstimator,
    max_batch_size: usize,
    confirmation: ConfirmationConfig,
    in_flight: Arc<DashSet<RewardId>>,
}

impl std::fmt::Debug for ClaimRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimRouter")
            .field("chains", &self.chains)
            .field("max_batch_size", &self.max_batch_size)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl ClaimRouter {
    pub fn new(
        chains: ChainRegistry,
        ledger: Arc<dyn LedgerSource>,
        gas: &GasConfig,
        confirmation: ConfirmationConfig,
    ) -> Self {
        Self {
            chains,
            ledger,
            estimator: GasEstimator::new(gas),
            max_batch_size: gas.max_batch_size,
            confirmation,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// True while any reward of `batch` is being submitted or confirmed.
    pub fn is_in_flight(&self, batch: &ClaimBatch) -> bool {
        batch.ids().iter().any(|id| self.in_flight.contains(id))
    }

    /// True while `id` is part of a submission that has not resolved.
    pub fn is_reward_in_flight(&self, id: &RewardId) -> bool {
        self.in_flight.contains(id)
    }

    fn acquire(&self, batch: &ClaimBatch) -> Result<InFlightGuard, ClaimError> {
        let mut guard = InFlightGuard {
            set: self.in_flight.clone(),
            ids: Vec::with_capacity(batch.len()),
        };
        for id in batch.ids() {
            if !self.in_flight.insert(id.clone()) {
                // Dropping the guard releases what was taken so far.
                return Err(ClaimError::BatchInFlight(batch.key()));
            }
            guard.ids.push(id);
        }
        Ok(guard)
    }

    /// Runs every precondition check and, for on-chain batches, the cost
    /// estimate. Nothing is sent.
    pub async fn prepare(
        &self,
        session: &ClaimSession,
        batch: ClaimBatch,
        latest: Option<&ClaimableSnapshot>,
    ) -> Result<PreparedClaim, ClaimError> {
        let account = session.require_account()?;
        if self.is_in_flight(&batch) {
            return Err(ClaimError::BatchInFlight(batch.key()));
        }
        ensure_unsettled(&batch, latest)?;

        match (batch.source(), batch.chain_id()) {
            (RewardSource::OnChain, Some(chain_id)) => {
                if batch.len() > self.max_batch_size {
                    return Err(ClaimError::InvalidBatch(format!(
                        "{} items exceed the maximum batch size of {}",
                        batch.len(),
                        self.max_batch_size
                    )));
                }
                let source = self.chains.resolve(chain_id)?;
                let calls = claim_calls(&batch)?;
                ensure_claimable(source.as_ref(), account, &batch, &calls).await?;
                let estimate = self
                    .estimator
                    .estimate(source.as_ref(), account, batch.items())
                    .await?;
                Ok(PreparedClaim {
                    batch,
                    calls,
                    estimate: Some(estimate),
                })
            }
            (RewardSource::OnChain, None) => Err(ClaimError::InvalidBatch(
                "on-chain batch without a chain id".into(),
            )),
            (RewardSource::Ledger, _) => {
                session.require_bearer()?;
                Ok(PreparedClaim {
                    batch,
                    calls: Vec::new(),
                    estimate: None,
                })
            }
        }
    }

    /// Submits a prepared batch and waits for its outcome.
    ///
    /// `latest` is the most recent refresh: rewards it reports claimed, or
    /// no longer lists, are never submitted again.
    ///
    /// An `Err` means a precondition failed and nothing was sent. Once a
    /// submission is attempted every failure is reported inside the
    /// [`BatchOutcome`], because the caller must reconcile it.
    pub async fn submit(
        &self,
        session: &ClaimSession,
        prepared: PreparedClaim,
        latest: Option<&ClaimableSnapshot>,
    ) -> Result<BatchOutcome, ClaimError> {
        let account = session.require_account()?;
        let _guard = self.acquire(&prepared.batch)?;
        ensure_unsettled(&prepared.batch, latest)?;
        let outcome = match prepared.batch.chain_id() {
            Some(chain_id) => {
                self.submit_on_chain(session, account, chain_id, &prepared)
                    .await?
            }
            None => self.submit_ledger(session, &prepared.batch).await?,
        };
        record_outcome(&outcome);
        Ok(outcome)
    }

    async fn submit_on_chain(
        &self,
        session: &ClaimSession,
        account: Address,
        chain_id: u64,
        prepared: &PreparedClaim,
    ) -> Result<BatchOutcome, ClaimError> {
        let batch = &prepared.batch;
        let source = self.chains.resolve(chain_id)?;
        // The chain may have moved since prepare.
        ensure_claimable(source.as_ref(), account, batch, &prepared.calls).await?;

        claim_metrics().inc_batches_submitted("on_chain");
        let sent = match prepared.calls.as_slice() {
            [single] => source.claim_reward(session, single).await,
            calls => source.batch_claim_rewards(session, calls).await,
        };
        let tx_hash = match sent {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(target: "router", chain_id, batch = %batch.key(), error = %e, "claim transaction not sent");
                return Ok(uniform_outcome(batch, ItemOutcome::Pending, None, Some(e)));
            }
        };
        tracing::info!(target: "router", chain_id, %tx_hash, items = batch.len(), "claim transaction submitted");

        let confirmation = {
            let _timer = Timer::new(claim_metrics());
            source
                .await_confirmation(tx_hash, self.confirmation.timeout())
                .await
        };
        Ok(match confirmation {
            Ok(Confirmation::Confirmed { block_number }) => {
                tracing::info!(target: "router", chain_id, %tx_hash, block_number, "claim transaction confirmed");
                uniform_outcome(batch, ItemOutcome::Claimed, Some(tx_hash), None)
            }
            Ok(Confirmation::Reverted { reason }) => {
                let reason = reason.unwrap_or_else(|| "execution reverted".to_string());
                tracing::warn!(target: "router", chain_id, %tx_hash, %reason, "claim transaction reverted");
                uniform_outcome(
                    batch,
                    ItemOutcome::Pending,
                    Some(tx_hash),
                    Some(ClaimError::TransactionReverted(reason)),
                )
            }
            Err(e) => {
                tracing::warn!(target: "router", chain_id, %tx_hash, error = %e, "claim confirmation unknown");
                uniform_outcome(batch, ItemOutcome::Pending, Some(tx_hash), Some(e))
            }
        })
    }

    async fn submit_ledger(
        &self,
        session: &ClaimSession,
        batch: &ClaimBatch,
    ) -> Result<BatchOutcome, ClaimError> {
        session.require_bearer()?;
        claim_metrics().inc_batches_submitted("ledger");

        let mut per_item = BTreeMap::new();
        for item in batch.items() {
            let ClaimPath::Ledger(terms) = &item.path else {
                return Err(ClaimError::InvalidBatch(format!(
                    "{} is not a ledger reward",
                    item.id()
                )));
            };
            let outcome = match self.ledger.claim(session, &terms.reward_id).await {
                Ok(()) => {
                    tracing::info!(target: "router", reward_id = %terms.reward_id, "ledger claim accepted");
                    ItemOutcome::Claimed
                }
                Err(e) if e.is_ambiguous() => {
                    // The claim may have been committed; only a refresh can tell.
                    tracing::warn!(target: "router", reward_id = %terms.reward_id, error = %e, "ledger claim outcome unknown");
                    ItemOutcome::Pending
                }
                Err(e) => {
                    tracing::warn!(target: "router", reward_id = %terms.reward_id, error = %e, "ledger claim failed");
                    ItemOutcome::Failed(e)
                }
            };
            per_item.insert(item.id(), outcome);
        }
        Ok(BatchOutcome {
            batch_key: batch.key(),
            source: RewardSource::Ledger,
            per_item,
            tx_hash: None,
            error: None,
        })
    }
}

/// Refuses rewards the latest refresh already saw settled.
fn ensure_unsettled(batch: &ClaimBatch, latest: Option<&ClaimableSnapshot>) -> Result<(), ClaimError> {
    let Some(snapshot) = latest else {
        return Ok(());
    };
    match batch.ids().into_iter().find(|id| snapshot.is_settled(id)) {
        Some(id) => Err(ClaimError::AlreadyClaimed(id)),
        None => Ok(()),
    }
}

fn claim_calls(batch: &ClaimBatch) -> Result<Vec<ClaimCall>, ClaimError> {
    batch.items().iter().map(ClaimCall::for_reward).collect()
}

/// Rejects the batch when the distributor is paused or already reports an
/// item claimed.
async fn ensure_claimable(
    source: &dyn CampaignSource,
    account: Address,
    batch: &ClaimBatch,
    calls: &[ClaimCall],
) -> Result<(), ClaimError> {
    if source.is_paused().await? {
        return Err(ClaimError::DistributorPaused(source.chain_id()));
    }
    for (item, call) in batch.items().iter().zip(calls) {
        if source.has_claimed(call.campaign_id, account).await? {
            return Err(ClaimError::AlreadyClaimed(item.id()));
        }
    }
    Ok(())
}

fn uniform_outcome(
    batch: &ClaimBatch,
    item: ItemOutcome,
    tx_hash: Option<B256>,
    error: Option<ClaimError>,
) -> BatchOutcome {
    BatchOutcome {
        batch_key: batch.key(),
        source: batch.source(),
        per_item: batch.ids().into_iter().map(|id| (id, item.clone())).collect(),
        tx_hash,
        error,
    }
}

fn record_outcome(outcome: &BatchOutcome) {
    let source = match outcome.source {
        RewardSource::OnChain => "on_chain",
        RewardSource::Ledger => "ledger",
    };
    let metrics = claim_metrics();
    metrics.inc_item_outcomes(source, "claimed", outcome.claimed_count() as u64);
    metrics.inc_item_outcomes(source, "pending", outcome.pending_count() as u64);
    metrics.inc_item_outcomes(source, "failed", outcome.failed_count() as u64);
    if let Some(e) = &outcome.error {
        metrics.inc_error(e.code());
    }
    for e in outcome.per_item.values().filter_map(|o| match o {
        ItemOutcome::Failed(e) => Some(e),
        _ => None,
    }) {
        metrics.inc_error(e.code());
    }
    tracing::info!(
        target: "router",
        batch = %outcome.batch_key,
        status = ?outcome.status(),
        claimed = outcome.claimed_count(),
        pending = outcome.pending_count(),
        failed = outcome.failed_count(),
        "claim batch finished"
    );
}
