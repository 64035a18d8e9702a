// Path: crates/chain/src/distributor.rs
//! The `CampaignSource` implementation for an EVM reward distributor.

use crate::errors::{from_contract, from_transport, replay_revert_reason};
use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::Bytes;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockId, TransactionRequest};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use claimkit_api::{CampaignSource, ClaimCall, Confirmation};
use claimkit_types::config::{ChainConfig, ConfirmationConfig};
use claimkit_types::prelude::*;
use dashmap::DashMap;
use std::time::Duration;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IRewardDistributor {
        struct Campaign {
            address rewardToken;
            uint256 totalRewards;
            uint256 claimedRewards;
            bytes32 merkleRoot;
            uint256 deadline;
            bool isActive;
            string questId;
        }

        function getCampaign(uint256 campaignId) external view returns (Campaign memory);
        function hasClaimed(uint256 campaignId, address user) external view returns (bool);
        function paused() external view returns (bool);
        function questManagers(address account) external view returns (bool);

        function claimReward(uint256 campaignId, uint256 amount, bytes32[] calldata merkleProof) external;
        function batchClaimRewards(
            uint256[] calldata campaignIds,
            uint256[] calldata amounts,
            bytes32[][] calldata merkleProofs
        ) external;
    }
}

impl From<IRewardDistributor::Campaign> for CampaignInfo {
    fn from(c: IRewardDistributor::Campaign) -> Self {
        Self {
            reward_token: c.rewardToken,
            total_rewards: c.totalRewards,
            claimed_rewards: c.claimedRewards,
            merkle_root: c.merkleRoot,
            deadline: c.deadline.saturating_to::<u64>(),
            is_active: c.isActive,
            quest_id: c.questId,
        }
    }
}

/// What is needed to replay a mined transaction for its revert reason.
#[derive(Debug, Clone)]
struct SentCall {
    from: Address,
    input: Bytes,
}

/// A reward distributor contract on one chain, reached over JSON-RPC.
///
/// Every provider and contract failure is normalized into [`ClaimError`]
/// before it leaves this type.
pub struct EvmRewardDistributor {
    chain_id: u64,
    address: Address,
    provider: DynProvider,
    signer: Option<Address>,
    poll_interval: Duration,
    sent: DashMap<B256, SentCall>,
}

impl EvmRewardDistributor {
    /// Connects to the chain's RPC endpoint. Without a wallet the adapter is
    /// read-only and every submission fails with `WalletNotConnected`.
    pub fn connect(
        chain: &ChainConfig,
        wallet: Option<EthereumWallet>,
        confirmation: &ConfirmationConfig,
    ) -> Result<Self, ClaimError> {
        let url: Url = chain.rpc_url.parse().map_err(|e| {
            ClaimError::NetworkError(format!("invalid rpc url {}: {e}", chain.rpc_url))
        })?;
        let (provider, signer) = match wallet {
            Some(wallet) => {
                let signer = crate::wallet_address(&wallet);
                let provider = ProviderBuilder::new().wallet(wallet).connect_http(url).erased();
                (provider, Some(signer))
            }
            None => (ProviderBuilder::new().connect_http(url).erased(), None),
        };
        tracing::info!(
            target: "chain",
            chain_id = chain.chain_id,
            distributor = %chain.distributor,
            deployed = chain.is_deployed(),
            signer = ?signer,
            "distributor adapter ready"
        );
        Ok(Self {
            chain_id: chain.chain_id,
            address: chain.distributor,
            provider,
            signer,
            poll_interval: confirmation.poll_interval(),
            sent: DashMap::new(),
        })
    }

    fn contract(&self) -> IRewardDistributor::IRewardDistributorInstance<DynProvider> {
        IRewardDistributor::new(self.address, self.provider.clone())
    }

    fn ensure_deployed(&self) -> Result<(), ClaimError> {
        if self.is_contract_deployed() {
            Ok(())
        } else {
            Err(ClaimError::ContractNotDeployed(self.chain_id))
        }
    }

    /// The session account, which must be the account this adapter signs with.
    /// A session for any other account has no usable wallet here.
    fn sender(&self, session: &ClaimSession) -> Result<Address, ClaimError> {
        let account = session.require_account()?;
        match self.signer {
            Some(signer) if signer == account => Ok(account),
            Some(signer) => {
                tracing::warn!(target: "chain", chain_id = self.chain_id, %account, %signer, "session account is not the signing wallet");
                Err(ClaimError::WalletNotConnected)
            }
            None => Err(ClaimError::WalletNotConnected),
        }
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
    ) -> alloy::rpc::types::TransactionReceipt {
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {}
                Err(e) => {
                    // Transient; the transaction is already out, keep waiting.
                    tracing::warn!(target: "chain", chain_id = self.chain_id, %tx_hash, error = %e, "receipt poll failed");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn revert_reason(&self, tx_hash: B256, block_number: Option<u64>) -> Option<String> {
        let (_, call) = self.sent.remove(&tx_hash)?;
        let request = TransactionRequest::default()
            .with_from(call.from)
            .with_to(self.address)
            .with_input(call.input);
        let block = block_number.map_or(BlockId::latest(), BlockId::number);
        match self.provider.call(request).block(block).await {
            // The replay succeeded on the inclusion block's state; no reason.
            Ok(_) => None,
            Err(e) => replay_revert_reason(&e),
        }
    }
}

#[async_trait]
impl CampaignSource for EvmRewardDistributor {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn is_contract_deployed(&self) -> bool {
        !self.address.is_zero()
    }

    async fn get_campaign(&self, campaign_id: U256) -> Result<CampaignInfo, ClaimError> {
        self.ensure_deployed()?;
        let campaign = self
            .contract()
            .getCampaign(campaign_id)
            .call()
            .await
            .map_err(|e| from_contract(self.chain_id, e))?;
        Ok(campaign.into())
    }

    async fn has_claimed(&self, campaign_id: U256, user: Address) -> Result<bool, ClaimError> {
        self.ensure_deployed()?;
        self.contract()
            .hasClaimed(campaign_id, user)
            .call()
            .await
            .map_err(|e| from_contract(self.chain_id, e))
    }

    async fn is_paused(&self) -> Result<bool, ClaimError> {
        self.ensure_deployed()?;
        self.contract()
            .paused()
            .call()
            .await
            .map_err(|e| from_contract(self.chain_id, e))
    }

    async fn is_quest_manager(&self, account: Address) -> Result<bool, ClaimError> {
        self.ensure_deployed()?;
        self.contract()
            .questManagers(account)
            .call()
            .await
            .map_err(|e| from_contract(self.chain_id, e))
    }

    async fn gas_price(&self) -> Result<u128, ClaimError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| ClaimError::NetworkError(from_transport(&e).to_string()))
    }

    async fn estimate_claim_gas(&self, user: Address, call: &ClaimCall) -> Result<u64, ClaimError> {
        self.ensure_deployed()?;
        self.contract()
            .claimReward(call.campaign_id, call.amount, call.proof.clone())
            .from(user)
            .estimate_gas()
            .await
            .map_err(|e| match from_contract(self.chain_id, e) {
                ClaimError::SimulationFailed(reason) => ClaimError::SimulationFailed(reason),
                other => ClaimError::SimulationFailed(other.to_string()),
            })
    }

    async fn claim_reward(&self, session: &ClaimSession, call: &ClaimCall) -> Result<B256, ClaimError> {
        self.ensure_deployed()?;
        let from = self.sender(session)?;
        let contract = self.contract();
        let builder = contract
            .claimReward(call.campaign_id, call.amount, call.proof.clone())
            .from(from);
        let input = builder.calldata().clone();
        let pending = builder
            .send()
            .await
            .map_err(|e| from_contract(self.chain_id, e))?;
        let tx_hash = *pending.tx_hash();
        self.sent.insert(tx_hash, SentCall { from, input });
        tracing::debug!(target: "chain", chain_id = self.chain_id, %tx_hash, campaign_id = %call.campaign_id, "claimReward sent");
        Ok(tx_hash)
    }

    async fn batch_claim_rewards(
        &self,
        session: &ClaimSession,
        calls: &[ClaimCall],
    ) -> Result<B256, ClaimError> {
        self.ensure_deployed()?;
        let from = self.sender(session)?;
        let campaign_ids = calls.iter().map(|c| c.campaign_id).collect::<Vec<_>>();
        let amounts = calls.iter().map(|c| c.amount).collect::<Vec<_>>();
        let proofs = calls.iter().map(|c| c.proof.clone()).collect::<Vec<_>>();

        let contract = self.contract();
        let builder = contract
            .batchClaimRewards(campaign_ids, amounts, proofs)
            .from(from);
        let input = builder.calldata().clone();
        let pending = builder
            .send()
            .await
            .map_err(|e| from_contract(self.chain_id, e))?;
        let tx_hash = *pending.tx_hash();
        self.sent.insert(tx_hash, SentCall { from, input });
        tracing::debug!(target: "chain", chain_id = self.chain_id, %tx_hash, items = calls.len(), "batchClaimRewards sent");
        Ok(tx_hash)
    }

    async fn await_confirmation(
        &self,
        tx_hash: B256,
        timeout: Option<Duration>,
    ) -> Result<Confirmation, ClaimError> {
        let receipt = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.wait_for_receipt(tx_hash)).await {
                Ok(receipt) => receipt,
                Err(_) => {
                    // The caller gives up on this hash; nothing will replay it.
                    self.sent.remove(&tx_hash);
                    return Err(ClaimError::TransactionTimeout);
                }
            },
            None => self.wait_for_receipt(tx_hash).await,
        };
        let block_number = receipt.block_number();
        if receipt.status() {
            self.sent.remove(&tx_hash);
            return Ok(Confirmation::Confirmed {
                block_number: block_number.unwrap_or_default(),
            });
        }
        let reason = self.revert_reason(tx_hash, block_number).await;
        Ok(Confirmation::Reverted { reason })
    }
}

impl std::fmt::Debug for EvmRewardDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmRewardDistributor")
            .field("chain_id", &self.chain_id)
            .field("address", &self.address)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;

    fn chain(distributor: Address) -> ChainConfig {
        ChainConfig {
            chain_id: 8453,
            rpc_url: "http://127.0.0.1:8545".into(),
            distributor,
            native_decimals: 18,
        }
    }

    #[test]
    fn campaign_record_converts() {
        let raw = IRewardDistributor::Campaign {
            rewardToken: Address::repeat_byte(0x22),
            totalRewards: U256::from(1_000u64),
            claimedRewards: U256::from(400u64),
            merkleRoot: B256::repeat_byte(0xcc),
            deadline: U256::MAX,
            isActive: true,
            questId: "quest-7".into(),
        };
        let info = CampaignInfo::from(raw);
        assert_eq!(info.deadline, u64::MAX);
        assert_eq!(info.remaining(), U256::from(600u64));
        assert_eq!(info.quest_id, "quest-7");
    }

    #[tokio::test]
    async fn zero_address_is_not_deployed() {
        let adapter =
            EvmRewardDistributor::connect(&chain(Address::ZERO), None, &ConfirmationConfig::default())
                .unwrap();
        assert!(!adapter.is_contract_deployed());
        let err = adapter.get_campaign(U256::from(7u64)).await.unwrap_err();
        assert_eq!(err, ClaimError::ContractNotDeployed(8453));
    }

    #[tokio::test]
    async fn read_only_adapter_refuses_to_submit() {
        let adapter = EvmRewardDistributor::connect(
            &chain(Address::repeat_byte(0x01)),
            None,
            &ConfirmationConfig::default(),
        )
        .unwrap();
        let session = ClaimSession::new(Address::repeat_byte(0x11), None);
        let call = ClaimCall {
            campaign_id: U256::from(7u64),
            amount: U256::from(100u64),
            proof: vec![B256::repeat_byte(0xaa)],
        };
        let err = adapter.claim_reward(&session, &call).await.unwrap_err();
        assert_eq!(err, ClaimError::WalletNotConnected);
    }

    #[test]
    fn signer_must_match_session_account() {
        let signer = PrivateKeySigner::random();
        let address = signer.address();
        let adapter = EvmRewardDistributor::connect(
            &chain(Address::repeat_byte(0x01)),
            Some(EthereumWallet::from(signer)),
            &ConfirmationConfig::default(),
        )
        .unwrap();
        let ok = ClaimSession::new(address, None);
        assert_eq!(adapter.sender(&ok), Ok(address));
        let other = ClaimSession::new(Address::repeat_byte(0x11), None);
        assert_eq!(adapter.sender(&other), Err(ClaimError::WalletNotConnected));
    }

    #[tokio::test]
    async fn timed_out_confirmation_forgets_the_sent_call() {
        let mut config = chain(Address::repeat_byte(0x01));
        config.rpc_url = "http://127.0.0.1:1".into();
        let adapter =
            EvmRewardDistributor::connect(&config, None, &ConfirmationConfig::default()).unwrap();
        let tx_hash = B256::repeat_byte(0x42);
        adapter.sent.insert(
            tx_hash,
            SentCall {
                from: Address::repeat_byte(0x11),
                input: Bytes::from_static(&[0xde, 0xad]),
            },
        );

        let err = adapter
            .await_confirmation(tx_hash, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(err, ClaimError::TransactionTimeout);
        assert!(adapter.sent.is_empty());
    }
}
