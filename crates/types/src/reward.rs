// Path: crates/types/src/reward.rs
//! The claimable reward data model shared by adapters, the engine and the CLI.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Which authority issued a reward and therefore which claim path it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardSource {
    /// A Merkle-distributor campaign on some chain.
    OnChain,
    /// A backend-issued ledger reward.
    Ledger,
}

impl fmt::Display for RewardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnChain => f.write_str("on_chain"),
            Self::Ledger => f.write_str("ledger"),
        }
    }
}

/// Stable identifier of a claimable reward.
///
/// On-chain and ledger ids are different variants, so the two partitions of
/// a snapshot can never share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RewardId {
    /// A campaign allocation: `(chain_id, campaign_id, quest_id)`.
    OnChain {
        /// The chain the distributor lives on.
        chain_id: u64,
        /// The distributor's campaign id.
        campaign_id: U256,
        /// The quest the campaign pays for.
        quest_id: String,
    },
    /// An opaque ledger-issued id.
    Ledger {
        /// The backend's reward id.
        id: String,
    },
}

impl RewardId {
    /// Builds an on-chain id.
    pub fn on_chain(chain_id: u64, campaign_id: U256, quest_id: impl Into<String>) -> Self {
        Self::OnChain {
            chain_id,
            campaign_id,
            quest_id: quest_id.into(),
        }
    }

    /// Builds a ledger id.
    pub fn ledger(id: impl Into<String>) -> Self {
        Self::Ledger { id: id.into() }
    }

    /// The source this id belongs to.
    pub fn source(&self) -> RewardSource {
        match self {
            Self::OnChain { .. } => RewardSource::OnChain,
            Self::Ledger { .. } => RewardSource::Ledger,
        }
    }
}

impl fmt::Display for RewardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnChain {
                chain_id,
                campaign_id,
                quest_id,
            } => write!(f, "onchain:{chain_id}:{campaign_id}:{quest_id}"),
            Self::Ledger { id } => write!(f, "ledger:{id}"),
        }
    }
}

/// Lifecycle state of a reward as last observed from its authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardState {
    /// Claimable now.
    Unclaimed,
    /// A claim has been submitted but the authority has not confirmed it.
    ClaimSubmitted,
    /// The authority reports the reward claimed.
    Claimed,
    /// The deadline passed while the reward was unclaimed.
    Expired,
    /// The last claim attempt failed; the reward may be claimed again.
    Failed,
}

impl RewardState {
    /// The snake_case name used on the wire and in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::ClaimSubmitted => "claim_submitted",
            Self::Claimed => "claimed",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

/// A Merkle inclusion proof for a `(user, amount)` leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProof {
    /// The amount committed in the leaf.
    pub leaf_amount: U256,
    /// Sibling hashes, leaf to root.
    pub siblings: Vec<B256>,
}

impl ClaimProof {
    /// True when the proof carries no sibling hashes.
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

/// Claim-path specific fields of an on-chain reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainTerms {
    /// The chain the distributor lives on.
    pub chain_id: u64,
    /// The distributor's campaign id.
    pub campaign_id: U256,
    /// The quest the campaign pays for.
    pub quest_id: String,
    /// The ERC-20 paid out by the campaign.
    pub reward_token: Address,
    /// Merkle proof published for this user, if any.
    pub proof: Option<ClaimProof>,
}

/// Claim-path specific fields of a ledger reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTerms {
    /// The backend's reward id.
    pub reward_id: String,
    /// The quest the reward was issued for, when the backend reports one.
    #[serde(default)]
    pub quest_id: Option<String>,
    /// Free-form label shown to the user.
    #[serde(default)]
    pub title: Option<String>,
}

/// The claim path of a reward together with its path-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ClaimPath {
    /// Claimed through the distributor contract.
    OnChain(OnChainTerms),
    /// Claimed through the ledger API.
    Ledger(LedgerTerms),
}

/// A single reward as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimableReward {
    /// Token quantity in the smallest unit.
    pub amount: U256,
    /// Absolute expiry; `None` never expires.
    pub deadline: Option<Timestamp>,
    /// State as last observed from the authority.
    pub state: RewardState,
    /// Claim-path data.
    pub path: ClaimPath,
}

impl ClaimableReward {
    /// The stable id of this reward.
    pub fn id(&self) -> RewardId {
        match &self.path {
            ClaimPath::OnChain(t) => RewardId::on_chain(t.chain_id, t.campaign_id, &t.quest_id),
            ClaimPath::Ledger(t) => RewardId::ledger(&t.reward_id),
        }
    }

    /// The authority that issued this reward.
    pub fn source(&self) -> RewardSource {
        match self.path {
            ClaimPath::OnChain(_) => RewardSource::OnChain,
            ClaimPath::Ledger(_) => RewardSource::Ledger,
        }
    }

    /// The chain id for on-chain rewards.
    pub fn chain_id(&self) -> Option<u64> {
        match &self.path {
            ClaimPath::OnChain(t) => Some(t.chain_id),
            ClaimPath::Ledger(_) => None,
        }
    }

    /// True when the deadline is strictly before `now`.
    pub fn is_past_deadline(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|d| now > d)
    }

    /// Unclaimed rewards, and rewards whose last attempt failed, may enter
    /// a batch.
    pub fn is_claimable(&self) -> bool {
        matches!(self.state, RewardState::Unclaimed | RewardState::Failed)
    }

    /// A copy of this reward in a different state. Snapshots are never
    /// mutated in place.
    pub fn with_state(&self, state: RewardState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// On-chain campaign record as returned by `getCampaign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignInfo {
    /// The ERC-20 paid out.
    pub reward_token: Address,
    /// Total pool size.
    pub total_rewards: U256,
    /// Amount already paid out.
    pub claimed_rewards: U256,
    /// Committed Merkle root.
    pub merkle_root: B256,
    /// Claim deadline (unix seconds).
    pub deadline: Timestamp,
    /// Whether the campaign accepts claims.
    pub is_active: bool,
    /// The quest the campaign pays for.
    pub quest_id: String,
}

impl CampaignInfo {
    /// Pool amount not yet paid out.
    pub fn remaining(&self) -> U256 {
        self.total_rewards.saturating_sub(self.claimed_rewards)
    }
}

/// A backend-published on-chain allocation for one user. It becomes a
/// [`ClaimableReward`] once checked against the distributor contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// The chain the distributor lives on.
    pub chain_id: u64,
    /// The distributor's campaign id.
    pub campaign_id: U256,
    /// The quest the campaign pays for.
    pub quest_id: String,
    /// Allocated amount (the Merkle leaf amount).
    pub amount: U256,
    /// Merkle proof for the leaf.
    pub proof: Option<ClaimProof>,
}

impl Entitlement {
    /// The id the resulting reward will carry.
    pub fn id(&self) -> RewardId {
        RewardId::on_chain(self.chain_id, self.campaign_id, &self.quest_id)
    }
}
