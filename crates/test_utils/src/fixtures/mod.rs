//! Canonical rewards, campaigns and sessions used across tests.

use claimkit_types::prelude::*;

/// Chain id used by the default fixtures.
pub const CHAIN_ID: u64 = 8453;

/// A fixed start-of-test time (unix seconds).
pub const NOW: Timestamp = 1_700_000_000;

/// The test user.
pub fn user() -> Address {
    Address::repeat_byte(0x11)
}

/// The reward token of every fixture campaign.
pub fn reward_token() -> Address {
    Address::repeat_byte(0x22)
}

/// A connected session with a ledger token.
pub fn session() -> ClaimSession {
    ClaimSession::new(user(), Some("test-token".into()))
}

/// A two-sibling proof for `amount`.
pub fn proof(amount: u64) -> ClaimProof {
    ClaimProof {
        leaf_amount: U256::from(amount),
        siblings: vec![B256::repeat_byte(0xaa), B256::repeat_byte(0xbb)],
    }
}

/// The quest id used for campaign `campaign_id`.
pub fn quest_id(campaign_id: u64) -> String {
    format!("quest-{campaign_id}")
}

/// An active campaign with the given deadline.
pub fn campaign(campaign_id: u64, deadline: Timestamp) -> CampaignInfo {
    CampaignInfo {
        reward_token: reward_token(),
        total_rewards: U256::from(1_000_000u64),
        claimed_rewards: U256::ZERO,
        merkle_root: B256::repeat_byte(0xcc),
        deadline,
        is_active: true,
        quest_id: quest_id(campaign_id),
    }
}

/// An entitlement with a valid proof on [`CHAIN_ID`].
pub fn entitlement(campaign_id: u64, amount: u64) -> Entitlement {
    Entitlement {
        chain_id: CHAIN_ID,
        campaign_id: U256::from(campaign_id),
        quest_id: quest_id(campaign_id),
        amount: U256::from(amount),
        proof: Some(proof(amount)),
    }
}

/// An unclaimed on-chain reward on [`CHAIN_ID`].
pub fn on_chain_reward(campaign_id: u64, amount: u64) -> ClaimableReward {
    ClaimableReward {
        amount: U256::from(amount),
        deadline: Some(NOW + 86_400),
        state: RewardState::Unclaimed,
        path: ClaimPath::OnChain(OnChainTerms {
            chain_id: CHAIN_ID,
            campaign_id: U256::from(campaign_id),
            quest_id: quest_id(campaign_id),
            reward_token: reward_token(),
            proof: Some(proof(amount)),
        }),
    }
}

/// An unclaimed ledger reward without expiry.
pub fn ledger_reward(id: &str, amount: u64) -> ClaimableReward {
    ClaimableReward {
        amount: U256::from(amount),
        deadline: None,
        state: RewardState::Unclaimed,
        path: ClaimPath::Ledger(LedgerTerms {
            reward_id: id.to_string(),
            quest_id: None,
            title: Some(format!("Reward {id}")),
        }),
    }
}

/// The id of the on-chain fixture reward for `campaign_id`.
pub fn on_chain_id(campaign_id: u64) -> RewardId {
    RewardId::on_chain(CHAIN_ID, U256::from(campaign_id), quest_id(campaign_id))
}
