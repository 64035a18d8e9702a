// Path: crates/types/src/error/mod.rs
//! Core error types for claimkit.
//!
//! Every adapter normalizes its collaborator's failures (provider errors,
//! revert payloads, HTTP statuses) into [`ClaimError`] so that the router and
//! the reconciliation controller only ever see typed outcomes.

use crate::reward::RewardId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors surfaced by the reward reconciliation engine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ClaimError {
    /// The session carries no connected wallet account.
    #[error("No wallet connected")]
    WalletNotConnected,
    /// No reward distributor is deployed on the requested chain.
    #[error("Reward distributor is not deployed on chain {0}")]
    ContractNotDeployed(u64),
    /// An on-chain item has no (or an empty) Merkle proof.
    #[error("Missing Merkle claim proof for {0}")]
    MissingClaimProof(RewardId),
    /// A dry run of the claim call failed.
    #[error("Claim simulation failed: {0}")]
    SimulationFailed(String),
    /// The wallet refused to sign the transaction.
    #[error("Transaction rejected by user")]
    UserRejectedTransaction,
    /// The claim transaction was mined with a failure status.
    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),
    /// The configured confirmation timeout elapsed before a receipt appeared.
    #[error("Timed out waiting for transaction confirmation")]
    TransactionTimeout,
    /// The ledger rejected the bearer token.
    #[error("Ledger session expired; re-authenticate")]
    LedgerAuthExpired,
    /// The ledger refused a single reward claim.
    #[error("Ledger rejected claim for {reward_id}: {reason}")]
    LedgerClaimRejected {
        /// The ledger-issued reward id.
        reward_id: String,
        /// The backend's reason, verbatim.
        reason: String,
    },
    /// A transport-level failure (RPC or HTTP).
    #[error("Network error: {0}")]
    NetworkError(String),
    /// The selected items do not form a valid batch.
    #[error("Invalid claim batch: {0}")]
    InvalidBatch(String),
    /// The latest refresh (or the contract) already reports the item claimed.
    #[error("Reward {0} is already claimed")]
    AlreadyClaimed(RewardId),
    /// The same batch is still being submitted or confirmed.
    #[error("Claim batch {0} is already in flight")]
    BatchInFlight(String),
    /// The reward distributor on the given chain is paused.
    #[error("Reward distributor on chain {0} is paused")]
    DistributorPaused(u64),
    /// The reward passed its deadline without being claimed.
    #[error("Reward {0} expired unclaimed")]
    RewardExpired(RewardId),
    /// A collaborator returned data that could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ClaimError {
    /// Precondition failures block submission entirely and are never retried.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::WalletNotConnected
                | Self::ContractNotDeployed(_)
                | Self::MissingClaimProof(_)
                | Self::InvalidBatch(_)
                | Self::AlreadyClaimed(_)
                | Self::DistributorPaused(_)
        )
    }

    /// True when the outcome of the failed operation is unknown, i.e. the
    /// authority may or may not have applied it.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::TransactionTimeout)
    }
}

impl ErrorCode for ClaimError {
    fn code(&self) -> &'static str {
        match self {
            Self::WalletNotConnected => "CLAIM_WALLET_NOT_CONNECTED",
            Self::ContractNotDeployed(_) => "CLAIM_CONTRACT_NOT_DEPLOYED",
            Self::MissingClaimProof(_) => "CLAIM_MISSING_PROOF",
            Self::SimulationFailed(_) => "CLAIM_SIMULATION_FAILED",
            Self::UserRejectedTransaction => "CLAIM_USER_REJECTED",
            Self::TransactionReverted(_) => "CLAIM_TX_REVERTED",
            Self::TransactionTimeout => "CLAIM_TX_TIMEOUT",
            Self::LedgerAuthExpired => "CLAIM_LEDGER_AUTH_EXPIRED",
            Self::LedgerClaimRejected { .. } => "CLAIM_LEDGER_REJECTED",
            Self::NetworkError(_) => "CLAIM_NETWORK_ERROR",
            Self::InvalidBatch(_) => "CLAIM_INVALID_BATCH",
            Self::AlreadyClaimed(_) => "CLAIM_ALREADY_CLAIMED",
            Self::BatchInFlight(_) => "CLAIM_BATCH_IN_FLIGHT",
            Self::DistributorPaused(_) => "CLAIM_DISTRIBUTOR_PAUSED",
            Self::RewardExpired(_) => "CLAIM_REWARD_EXPIRED",
            Self::Decode(_) => "CLAIM_DECODE_ERROR",
        }
    }
}

/// Errors raised while loading or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// The path that was read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML document is malformed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The document parsed but violates a semantic rule.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "CONFIG_IO",
            Self::Parse(_) => "CONFIG_PARSE",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}
