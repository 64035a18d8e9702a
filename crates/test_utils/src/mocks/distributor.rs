// Path: crates/test_utils/src/mocks/distributor.rs
//! An in-memory reward distributor contract.

use async_trait::async_trait;
use claimkit_api::{CampaignSource, ClaimCall, Confirmation};
use claimkit_types::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// What happens to the next submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitBehavior {
    /// Mined with success status; claims are applied.
    Succeed,
    /// Mined with failure status; no state changes.
    Revert(String),
    /// Wallet refuses to sign; nothing is sent.
    RejectByUser,
    /// The node's pre-send simulation fails with this reason; nothing is sent.
    FailSimulation(String),
    /// Sent but never mined.
    NeverConfirm,
}

#[derive(Debug)]
struct PendingTx {
    account: Address,
    calls: Vec<ClaimCall>,
    behavior: SubmitBehavior,
}

#[derive(Debug)]
struct State {
    campaigns: HashMap<U256, CampaignInfo>,
    claimed: HashSet<(U256, Address)>,
    paused: bool,
    gas_price: Option<u128>,
    per_claim_gas: Option<u64>,
    behavior: SubmitBehavior,
    pending: HashMap<B256, PendingTx>,
    next_nonce: u64,
    submissions: usize,
    estimate_calls: usize,
    estimate_gates: HashMap<U256, Arc<Notify>>,
    confirmation_gate: Option<Arc<Notify>>,
}

/// A deterministic stand-in for one chain's distributor contract.
///
/// Batched submissions are atomic like the real contract: a reverting batch
/// leaves every `hasClaimed` flag untouched.
#[derive(Debug)]
pub struct MockDistributor {
    chain_id: u64,
    deployed: bool,
    state: Mutex<State>,
}

impl MockDistributor {
    /// A deployed distributor with gas price 1 gwei and 80k gas per claim.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            deployed: true,
            state: Mutex::new(State {
                campaigns: HashMap::new(),
                claimed: HashSet::new(),
                paused: false,
                gas_price: Some(1_000_000_000),
                per_claim_gas: Some(80_000),
                behavior: SubmitBehavior::Succeed,
                pending: HashMap::new(),
                next_nonce: 1,
                submissions: 0,
                estimate_calls: 0,
                estimate_gates: HashMap::new(),
                confirmation_gate: None,
            }),
        }
    }

    /// A chain where the distributor address is the zero sentinel.
    pub fn undeployed(chain_id: u64) -> Self {
        Self {
            deployed: false,
            ..Self::new(chain_id)
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a campaign.
    pub fn add_campaign(&self, campaign_id: u64, info: CampaignInfo) {
        self.state().campaigns.insert(U256::from(campaign_id), info);
    }

    /// Marks `(campaign, user)` as claimed on chain.
    pub fn mark_claimed(&self, campaign_id: u64, user: Address) {
        self.state().claimed.insert((U256::from(campaign_id), user));
    }

    /// Sets the `paused()` flag.
    pub fn set_paused(&self, paused: bool) {
        self.state().paused = paused;
    }

    /// `None` makes `gas_price` fail with a network error.
    pub fn set_gas_price(&self, price: Option<u128>) {
        self.state().gas_price = price;
    }

    /// `None` makes gas estimation fail with a simulation error.
    pub fn set_per_claim_gas(&self, gas: Option<u64>) {
        self.state().per_claim_gas = gas;
    }

    /// Behavior of subsequent submissions.
    pub fn set_behavior(&self, behavior: SubmitBehavior) {
        self.state().behavior = behavior;
    }

    /// Holds estimation of `campaign_id` until the returned gate is notified.
    pub fn gate_estimate(&self, campaign_id: u64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state()
            .estimate_gates
            .insert(U256::from(campaign_id), gate.clone());
        gate
    }

    /// Holds every confirmation until the returned gate is notified.
    pub fn gate_confirmations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state().confirmation_gate = Some(gate.clone());
        gate
    }

    /// Number of transactions sent.
    pub fn submissions(&self) -> usize {
        self.state().submissions
    }

    /// Number of gas estimations run.
    pub fn estimate_calls(&self) -> usize {
        self.state().estimate_calls
    }

    /// On-chain claim flag.
    pub fn is_claimed(&self, campaign_id: u64, user: Address) -> bool {
        self.state()
            .claimed
            .contains(&(U256::from(campaign_id), user))
    }

    fn submit(&self, session: &ClaimSession, calls: &[ClaimCall]) -> Result<B256, ClaimError> {
        let account = session.require_account()?;
        let mut state = self.state();
        if state.paused {
            return Err(ClaimError::SimulationFailed("Pausable: paused".into()));
        }
        match &state.behavior {
            SubmitBehavior::RejectByUser => return Err(ClaimError::UserRejectedTransaction),
            SubmitBehavior::FailSimulation(reason) => {
                return Err(ClaimError::SimulationFailed(reason.clone()))
            }
            _ => {}
        }
        let nonce = state.next_nonce;
        state.next_nonce += 1;
        state.submissions += 1;
        let tx_hash = B256::from((U256::from(self.chain_id) << 192) | U256::from(nonce));
        let behavior = state.behavior.clone();
        state.pending.insert(
            tx_hash,
            PendingTx {
                account,
                calls: calls.to_vec(),
                behavior,
            },
        );
        Ok(tx_hash)
    }
}

#[async_trait]
impl CampaignSource for MockDistributor {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn is_contract_deployed(&self) -> bool {
        self.deployed
    }

    async fn get_campaign(&self, campaign_id: U256) -> Result<CampaignInfo, ClaimError> {
        if !self.deployed {
            return Err(ClaimError::ContractNotDeployed(self.chain_id));
        }
        self.state()
            .campaigns
            .get(&campaign_id)
            .cloned()
            .ok_or_else(|| ClaimError::SimulationFailed(format!("unknown campaign {campaign_id}")))
    }

    async fn has_claimed(&self, campaign_id: U256, user: Address) -> Result<bool, ClaimError> {
        Ok(self.state().claimed.contains(&(campaign_id, user)))
    }

    async fn is_paused(&self) -> Result<bool, ClaimError> {
        Ok(self.state().paused)
    }

    async fn is_quest_manager(&self, _account: Address) -> Result<bool, ClaimError> {
        Ok(false)
    }

    async fn gas_price(&self) -> Result<u128, ClaimError> {
        self.state()
            .gas_price
            .ok_or_else(|| ClaimError::NetworkError("eth_gasPrice unavailable".into()))
    }

    async fn estimate_claim_gas(&self, user: Address, call: &ClaimCall) -> Result<u64, ClaimError> {
        let gate = {
            let mut state = self.state();
            state.estimate_calls += 1;
            state.estimate_gates.get(&call.campaign_id).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let state = self.state();
        if state.claimed.contains(&(call.campaign_id, user)) {
            return Err(ClaimError::SimulationFailed("Already claimed".into()));
        }
        state
            .per_claim_gas
            .ok_or_else(|| ClaimError::SimulationFailed("execution reverted: Invalid proof".into()))
    }

    async fn claim_reward(
        &self,
        session: &ClaimSession,
        call: &ClaimCall,
    ) -> Result<B256, ClaimError> {
        self.submit(session, std::slice::from_ref(call))
    }

    async fn batch_claim_rewards(
        &self,
        session: &ClaimSession,
        calls: &[ClaimCall],
    ) -> Result<B256, ClaimError> {
        self.submit(session, calls)
    }

    async fn await_confirmation(
        &self,
        tx_hash: B256,
        timeout: Option<Duration>,
    ) -> Result<Confirmation, ClaimError> {
        let gate = self.state().confirmation_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let behavior = self
            .state()
            .pending
            .get(&tx_hash)
            .map(|tx| tx.behavior.clone())
            .ok_or_else(|| ClaimError::NetworkError(format!("unknown transaction {tx_hash}")))?;

        match behavior {
            SubmitBehavior::NeverConfirm => match timeout {
                Some(t) => {
                    tokio::time::sleep(t).await;
                    Err(ClaimError::TransactionTimeout)
                }
                None => std::future::pending::<Result<Confirmation, ClaimError>>().await,
            },
            SubmitBehavior::Revert(reason) => {
                self.state().pending.remove(&tx_hash);
                Ok(Confirmation::Reverted {
                    reason: Some(reason),
                })
            }
            SubmitBehavior::Succeed
            | SubmitBehavior::RejectByUser
            | SubmitBehavior::FailSimulation(_) => {
                let mut state = self.state();
                if let Some(tx) = state.pending.remove(&tx_hash) {
                    for call in &tx.calls {
                        state.claimed.insert((call.campaign_id, tx.account));
                    }
                }
                Ok(Confirmation::Confirmed { block_number: 100 })
            }
        }
    }
}
