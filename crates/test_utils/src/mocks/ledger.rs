// Path: crates/test_utils/src/mocks/ledger.rs
//! An in-memory reward ledger backend.

use async_trait::async_trait;
use claimkit_api::{LedgerListing, LedgerSource};
use claimkit_types::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    rewards: Vec<ClaimableReward>,
    entitlements: Vec<Entitlement>,
    rejections: HashMap<String, String>,
    drop_responses: HashSet<String>,
    claimed: HashSet<String>,
    claim_log: Vec<String>,
    auth_expired: bool,
    claims_before_expiry: Option<usize>,
    unreachable: bool,
}

/// A deterministic stand-in for the ledger REST API.
///
/// Like the real backend, claimed rewards disappear from later listings and
/// repeated claims of the same id are idempotent.
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<State>,
}

impl MockLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a ledger reward.
    pub fn add_reward(&self, reward: ClaimableReward) {
        self.state().rewards.push(reward);
    }

    /// Publishes an on-chain entitlement.
    pub fn add_entitlement(&self, entitlement: Entitlement) {
        self.state().entitlements.push(entitlement);
    }

    /// Makes claims of `reward_id` fail with `reason`.
    pub fn reject(&self, reward_id: &str, reason: &str) {
        self.state()
            .rejections
            .insert(reward_id.to_string(), reason.to_string());
    }

    /// Commits claims of `reward_id` but loses the response.
    pub fn drop_response(&self, reward_id: &str) {
        self.state().drop_responses.insert(reward_id.to_string());
    }

    /// Makes every call fail with `LedgerAuthExpired`.
    pub fn expire_auth(&self) {
        self.state().auth_expired = true;
    }

    /// Lets `claims` more claims through, then expires the token.
    pub fn expire_auth_after(&self, claims: usize) {
        self.state().claims_before_expiry = Some(claims);
    }

    /// Makes listings fail with a network error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Claim attempts in call order.
    pub fn claim_log(&self) -> Vec<String> {
        self.state().claim_log.clone()
    }

    /// True when the backend committed a claim for `reward_id`.
    pub fn is_claimed(&self, reward_id: &str) -> bool {
        self.state().claimed.contains(reward_id)
    }
}

#[async_trait]
impl LedgerSource for MockLedger {
    async fn fetch_claimable(
        &self,
        session: &ClaimSession,
        _user: Address,
    ) -> Result<LedgerListing, ClaimError> {
        session.require_bearer()?;
        let state = self.state();
        if state.auth_expired {
            return Err(ClaimError::LedgerAuthExpired);
        }
        if state.unreachable {
            return Err(ClaimError::NetworkError("connection refused".into()));
        }
        let rewards = state
            .rewards
            .iter()
            .filter(|r| match &r.path {
                ClaimPath::Ledger(t) => !state.claimed.contains(&t.reward_id),
                ClaimPath::OnChain(_) => false,
            })
            .cloned()
            .collect();
        Ok(LedgerListing {
            rewards,
            entitlements: state.entitlements.clone(),
        })
    }

    async fn claim(&self, session: &ClaimSession, reward_id: &str) -> Result<(), ClaimError> {
        session.require_bearer()?;
        let mut state = self.state();
        state.claim_log.push(reward_id.to_string());
        match state.claims_before_expiry {
            Some(0) => state.auth_expired = true,
            Some(n) => state.claims_before_expiry = Some(n - 1),
            None => {}
        }
        if state.auth_expired {
            return Err(ClaimError::LedgerAuthExpired);
        }
        if let Some(reason) = state.rejections.get(reward_id) {
            return Err(ClaimError::LedgerClaimRejected {
                reward_id: reward_id.to_string(),
                reason: reason.clone(),
            });
        }
        state.claimed.insert(reward_id.to_string());
        if state.drop_responses.contains(reward_id) {
            return Err(ClaimError::NetworkError("connection reset by peer".into()));
        }
        Ok(())
    }
}
