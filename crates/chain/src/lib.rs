// Path: crates/chain/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # claimkit Chain
//!
//! The alloy-backed reward distributor adapter and the normalization of
//! provider errors into the claim error taxonomy.

pub mod distributor;
pub mod errors;

pub use distributor::EvmRewardDistributor;

use alloy::network::{Ethereum, EthereumWallet, NetworkWallet};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use claimkit_api::ChainRegistry;
use claimkit_types::config::EngineConfig;
use claimkit_types::error::ClaimError;
use std::sync::Arc;

/// Parses a hex private key into a signing wallet.
pub fn wallet_from_private_key(key: &str) -> Result<EthereumWallet, ClaimError> {
    let signer: PrivateKeySigner = key
        .trim()
        .parse()
        .map_err(|e| ClaimError::Decode(format!("invalid private key: {e}")))?;
    Ok(EthereumWallet::from(signer))
}

/// The address the wallet signs claims with.
pub fn wallet_address(wallet: &EthereumWallet) -> Address {
    NetworkWallet::<Ethereum>::default_signer_address(wallet)
}

/// Builds a registry with one adapter per configured chain.
///
/// Chains configured with the zero distributor address are registered too;
/// the registry reports them as not deployed.
pub fn registry_from_config(
    config: &EngineConfig,
    wallet: Option<EthereumWallet>,
) -> Result<ChainRegistry, ClaimError> {
    let mut registry = ChainRegistry::new();
    for chain in &config.chains {
        let adapter = EvmRewardDistributor::connect(chain, wallet.clone(), &config.confirmation)?;
        registry.insert(Arc::new(adapter));
    }
    Ok(registry)
}
