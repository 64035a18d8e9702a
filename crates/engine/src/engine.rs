// Path: crates/engine/src/engine.rs
//! The caller-facing reward engine.

use crate::aggregate::SourceAggregator;
use crate::estimate::{EstimateTracker, GasEstimator};
use crate::reconcile::reconcile;
use crate::router::{ClaimRouter, PreparedClaim};
use claimkit_api::{ChainRegistry, Clock, LedgerSource, SystemClock};
use claimkit_types::config::{EngineConfig, GasConfig, RefreshConfig};
use claimkit_types::prelude::*;
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Ties the aggregator, router, estimator and reconciliation together.
///
/// The engine keeps the most recent snapshot so that preparation and
/// submission can refuse rewards the latest refresh already reports as
/// claimed. Snapshots it hands out overlay its own view of each unclaimed
/// reward: `ClaimSubmitted` while a submission is unresolved, `Failed`
/// after an attempt that definitely did not go through.
pub struct RewardEngine {
    aggregator: SourceAggregator,
    router: ClaimRouter,
    chains: ChainRegistry,
    estimator: GasEstimator,
    estimates: EstimateTracker,
    refresh: RefreshConfig,
    latest: RwLock<Option<ClaimableSnapshot>>,
    failed: DashSet<RewardId>,
}

impl RewardEngine {
    /// Builds an engine on the system clock.
    pub fn new(chains: ChainRegistry, ledger: Arc<dyn LedgerSource>, config: &EngineConfig) -> Self {
        Self::with_clock(chains, ledger, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        chains: ChainRegistry,
        ledger: Arc<dyn LedgerSource>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self::from_parts(
            chains,
            ledger,
            clock,
            &config.gas,
            config.confirmation.clone(),
            config.refresh.clone(),
        )
    }

    /// Builds an engine from individual config sections.
    pub fn from_parts(
        chains: ChainRegistry,
        ledger: Arc<dyn LedgerSource>,
        clock: Arc<dyn Clock>,
        gas: &GasConfig,
        confirmation: claimkit_types::config::ConfirmationConfig,
        refresh: RefreshConfig,
    ) -> Self {
        Self {
            aggregator: SourceAggregator::new(ledger.clone(), chains.clone(), clock),
            router: ClaimRouter::new(chains.clone(), ledger, gas, confirmation),
            chains,
            estimator: GasEstimator::new(gas),
            estimates: EstimateTracker::new(),
            refresh,
            latest: RwLock::new(None),
            failed: DashSet::new(),
        }
    }

    /// Queries both authorities and returns the aggregated snapshot.
    pub async fn fetch_claimable_rewards(
        &self,
        session: &ClaimSession,
    ) -> Result<ClaimableSnapshot, ClaimError> {
        let snapshot = self.overlay_attempts(self.aggregator.fetch(session).await?);
        *self.latest.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn overlay_attempts(&self, snapshot: ClaimableSnapshot) -> ClaimableSnapshot {
        let mark = |reward: ClaimableReward| {
            if reward.state != RewardState::Unclaimed {
                return reward;
            }
            let id = reward.id();
            if self.router.is_reward_in_flight(&id) {
                reward.with_state(RewardState::ClaimSubmitted)
            } else if self.failed.contains(&id) {
                reward.with_state(RewardState::Failed)
            } else {
                reward
            }
        };
        let snapshot = ClaimableSnapshot {
            blockchain: snapshot.blockchain.into_iter().map(mark).collect(),
            database: snapshot.database.into_iter().map(mark).collect(),
            ..snapshot
        };
        // Forget failures the authorities have since settled.
        self.failed.retain(|id| !snapshot.is_settled(id));
        snapshot
    }

    fn record_attempt(&self, outcome: &BatchOutcome) {
        let definite_failure = outcome.error.as_ref().is_some_and(|e| !e.is_ambiguous());
        for (id, item) in &outcome.per_item {
            match item {
                ItemOutcome::Failed(_) => {
                    self.failed.insert(id.clone());
                }
                ItemOutcome::Pending if definite_failure => {
                    self.failed.insert(id.clone());
                }
                ItemOutcome::Pending | ItemOutcome::Claimed => {
                    self.failed.remove(id);
                }
            }
        }
    }

    /// The snapshot of the most recent successful fetch.
    pub async fn latest_snapshot(&self) -> Option<ClaimableSnapshot> {
        self.latest.read().await.clone()
    }

    /// Estimates the cost of claiming `items` on chain.
    ///
    /// Each call starts a new selection; if another call (or
    /// [`selection_changed`](Self::selection_changed)) happens before this
    /// one finishes, the result is [`EstimateOutcome::Superseded`].
    pub async fn estimate_batch_cost(
        &self,
        session: &ClaimSession,
        items: Vec<ClaimableReward>,
    ) -> Result<EstimateOutcome, ClaimError> {
        let ticket = self.estimates.begin();
        let user = session.require_account()?;
        let batch = ClaimBatch::new(items)?;
        let Some(chain_id) = batch.chain_id() else {
            return Err(ClaimError::InvalidBatch("ledger claims cost no gas".into()));
        };
        let source = self.chains.resolve(chain_id)?;
        let estimate = self
            .estimator
            .estimate(source.as_ref(), user, batch.items())
            .await?;
        Ok(self.estimates.publish(ticket, estimate))
    }

    /// Marks the current selection as changed; in-flight estimates go stale.
    pub fn selection_changed(&self) {
        self.estimates.invalidate();
    }

    /// The estimate published for the current selection, if any.
    pub fn current_estimate(&self) -> Option<CostEstimate> {
        self.estimates.latest()
    }

    /// Validates `batch` and estimates its cost without sending anything.
    pub async fn prepare_claim(
        &self,
        session: &ClaimSession,
        batch: ClaimBatch,
    ) -> Result<PreparedClaim, ClaimError> {
        let latest = self.latest.read().await.clone();
        self.router
            .prepare(session, batch, latest.as_ref())
            .await
            .inspect_err(log_refusal)
    }

    /// Submits a prepared batch along its claim path.
    ///
    /// Rewards the latest refresh reports claimed, or no longer lists, are
    /// refused with `AlreadyClaimed` even when `prepared` predates that
    /// refresh.
    pub async fn submit_claim_batch(
        &self,
        session: &ClaimSession,
        prepared: PreparedClaim,
    ) -> Result<BatchOutcome, ClaimError> {
        let latest = self.latest.read().await.clone();
        let outcome = self
            .router
            .submit(session, prepared, latest.as_ref())
            .await
            .inspect_err(log_refusal)?;
        self.record_attempt(&outcome);
        Ok(outcome)
    }

    /// Re-runs the full aggregation and diffs it against `previous`.
    ///
    /// The selection is the outcome's items, or empty when there is no
    /// outcome (a plain refresh that only reports transitions).
    pub async fn refresh_and_reconcile(
        &self,
        session: &ClaimSession,
        previous: &ClaimableSnapshot,
        outcome: Option<&BatchOutcome>,
    ) -> Result<(ClaimableSnapshot, ReconcileDiff), ClaimError> {
        let selected: Vec<RewardId> = outcome
            .map(|o| o.per_item.keys().cloned().collect())
            .unwrap_or_default();
        let next = self.fetch_claimable_rewards(session).await?;
        let diff = reconcile(previous, &next, &selected, outcome);
        Ok((next, diff))
    }

    /// Refreshes on the configured interval while any selected item is still
    /// pending, up to the configured number of polls.
    ///
    /// Returns the last snapshot and diff; callers inspect
    /// [`ReconcileDiff::has_pending`] to tell whether it settled.
    pub async fn watch_until_settled(
        &self,
        session: &ClaimSession,
        previous: &ClaimableSnapshot,
        outcome: &BatchOutcome,
    ) -> Result<(ClaimableSnapshot, ReconcileDiff), ClaimError> {
        let interval = Duration::from_secs(self.refresh.interval_secs);
        let mut polls = 0u32;
        loop {
            polls += 1;
            let (next, diff) = self
                .refresh_and_reconcile(session, previous, Some(outcome))
                .await?;
            if !diff.has_pending() || polls >= self.refresh.max_polls {
                if diff.has_pending() {
                    tracing::warn!(target: "reconcile", polls, batch = %outcome.batch_key, "claim still pending after polling budget");
                }
                return Ok((next, diff));
            }
            tracing::debug!(target: "reconcile", polls, "claim still pending; waiting for next refresh");
            tokio::time::sleep(interval).await;
        }
    }

    /// Claims `batch` end to end: prepare, submit, then reconcile against
    /// the snapshot the batch was selected from.
    pub async fn claim_and_reconcile(
        &self,
        session: &ClaimSession,
        previous: &ClaimableSnapshot,
        batch: ClaimBatch,
    ) -> Result<(BatchOutcome, ClaimableSnapshot, ReconcileDiff), ClaimError> {
        let prepared = self.prepare_claim(session, batch).await?;
        let outcome = self.submit_claim_batch(session, prepared).await?;
        let (next, diff) = self
            .refresh_and_reconcile(session, previous, Some(&outcome))
            .await?;
        Ok((outcome, next, diff))
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }
}

fn log_refusal(e: &ClaimError) {
    if e.is_precondition() {
        tracing::info!(target: "router", code = e.code(), error = %e, "claim refused; nothing was sent");
    } else {
        tracing::warn!(target: "router", code = e.code(), error = %e, "claim not submitted");
    }
}

impl std::fmt::Debug for RewardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardEngine")
            .field("router", &self.router)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}
