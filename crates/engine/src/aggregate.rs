// Path: crates/engine/src/aggregate.rs
//! Builds one [`ClaimableSnapshot`] from both reward authorities.

use claimkit_api::{ChainRegistry, Clock, LedgerSource};
use claimkit_telemetry::claim_metrics;
use claimkit_types::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Queries the ledger and every referenced distributor, then aggregates.
#[derive(Clone)]
pub struct SourceAggregator {
    ledger: Arc<dyn LedgerSource>,
    chains: ChainRegistry,
    clock: Arc<dyn Clock>,
}

impl SourceAggregator {
    pub fn new(ledger: Arc<dyn LedgerSource>, chains: ChainRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            chains,
            clock,
        }
    }

    /// Runs a full aggregation pass for the session's account.
    ///
    /// A ledger failure fails the pass: without the listing there is no
    /// source of proofs and no ledger view. Per-entitlement contract failures
    /// only make that entitlement unavailable.
    pub async fn fetch(&self, session: &ClaimSession) -> Result<ClaimableSnapshot, ClaimError> {
        let user = session.require_account()?;
        let listing = match self.ledger.fetch_claimable(session, user).await {
            Ok(listing) => listing,
            Err(e) => {
                claim_metrics().inc_refreshes("error");
                claim_metrics().inc_error(e.code());
                return Err(e);
            }
        };
        let (on_chain, unavailable) =
            resolve_entitlements(&self.chains, user, listing.entitlements).await;
        let snapshot = aggregate(on_chain, listing.rewards, unavailable, self.clock.now());

        claim_metrics().inc_refreshes("ok");
        record_snapshot_metrics(&snapshot);
        tracing::debug!(
            target: "aggregate",
            blockchain = snapshot.blockchain.len(),
            database = snapshot.database.len(),
            unavailable = snapshot.unavailable.len(),
            "aggregation pass complete"
        );
        Ok(snapshot)
    }

    /// The clock deadlines are evaluated against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// Checks each entitlement against its chain's distributor.
///
/// The contract is authoritative for deadline, token and claim status; the
/// entitlement contributes the amount and the Merkle proof.
pub async fn resolve_entitlements(
    chains: &ChainRegistry,
    user: Address,
    entitlements: Vec<Entitlement>,
) -> (Vec<ClaimableReward>, Vec<UnavailableReward>) {
    let mut rewards = Vec::with_capacity(entitlements.len());
    let mut unavailable = Vec::new();

    for entitlement in entitlements {
        let id = entitlement.id();
        match resolve_one(chains, user, &entitlement).await {
            Ok(reward) => rewards.push(reward),
            Err(reason) => {
                tracing::warn!(target: "aggregate", %id, %reason, "entitlement unavailable");
                unavailable.push(UnavailableReward { id, reason });
            }
        }
    }
    (rewards, unavailable)
}

async fn resolve_one(
    chains: &ChainRegistry,
    user: Address,
    entitlement: &Entitlement,
) -> Result<ClaimableReward, String> {
    let source = chains
        .resolve(entitlement.chain_id)
        .map_err(|e| e.to_string())?;
    let campaign = source
        .get_campaign(entitlement.campaign_id)
        .await
        .map_err(|e| e.to_string())?;
    let claimed = source
        .has_claimed(entitlement.campaign_id, user)
        .await
        .map_err(|e| e.to_string())?;
    if !campaign.is_active && !claimed {
        return Err(format!("campaign {} is not active", entitlement.campaign_id));
    }

    Ok(ClaimableReward {
        amount: entitlement.amount,
        deadline: Some(campaign.deadline),
        state: if claimed {
            RewardState::Claimed
        } else {
            RewardState::Unclaimed
        },
        path: ClaimPath::OnChain(OnChainTerms {
            chain_id: entitlement.chain_id,
            campaign_id: entitlement.campaign_id,
            quest_id: entitlement.quest_id.clone(),
            reward_token: campaign.reward_token,
            proof: entitlement.proof.clone(),
        }),
    })
}

/// Concatenates both partitions and annotates deadlines.
///
/// No cross-source merging happens: the partitions are disjoint by
/// construction. Unclaimed rewards past their deadline are kept and marked
/// `expired`. Duplicate ids within a partition keep the first occurrence.
pub fn aggregate(
    on_chain: Vec<ClaimableReward>,
    ledger: Vec<ClaimableReward>,
    unavailable: Vec<UnavailableReward>,
    now: Timestamp,
) -> ClaimableSnapshot {
    let blockchain = annotate(dedupe(on_chain, RewardSource::OnChain), now);
    let database = annotate(dedupe(ledger, RewardSource::Ledger), now);
    let total = blockchain.len() + database.len();
    ClaimableSnapshot {
        blockchain,
        database,
        unavailable,
        total,
        taken_at: now,
    }
}

fn dedupe(rewards: Vec<ClaimableReward>, expected: RewardSource) -> Vec<ClaimableReward> {
    let mut seen = HashSet::with_capacity(rewards.len());
    rewards
        .into_iter()
        .filter(|r| {
            if r.source() != expected {
                tracing::warn!(target: "aggregate", id = %r.id(), "reward listed under the wrong source; dropped");
                return false;
            }
            let fresh = seen.insert(r.id());
            if !fresh {
                tracing::warn!(target: "aggregate", id = %r.id(), "duplicate reward id; keeping first");
            }
            fresh
        })
        .collect()
}

fn annotate(rewards: Vec<ClaimableReward>, now: Timestamp) -> Vec<ClaimableReward> {
    rewards
        .into_iter()
        .map(|r| {
            if r.state == RewardState::Unclaimed && r.is_past_deadline(now) {
                r.with_state(RewardState::Expired)
            } else {
                r
            }
        })
        .collect()
}

fn record_snapshot_metrics(snapshot: &ClaimableSnapshot) {
    let states = [
        RewardState::Unclaimed,
        RewardState::Claimed,
        RewardState::Expired,
    ];
    for (source, rewards) in [
        ("on_chain", &snapshot.blockchain),
        ("ledger", &snapshot.database),
    ] {
        for state in states {
            let count = rewards.iter().filter(|r| r.state == state).count() as u64;
            claim_metrics().set_snapshot_rewards(source, state.as_str(), count);
        }
    }
}
