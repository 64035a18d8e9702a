// Path: crates/api/src/registry.rs
//! Resolves chain ids to distributor adapters.

use crate::source::CampaignSource;
use claimkit_types::error::ClaimError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The set of chains the engine can claim on.
///
/// A chain that is absent, or present with the zero distributor address,
/// makes the on-chain path for that chain unavailable: resolution fails with
/// `ContractNotDeployed` instead of degrading silently.
#[derive(Clone, Default)]
pub struct ChainRegistry {
    sources: BTreeMap<u64, Arc<dyn CampaignSource>>,
}

impl ChainRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the adapter for its chain.
    pub fn insert(&mut self, source: Arc<dyn CampaignSource>) {
        let chain_id = source.chain_id();
        if self.sources.insert(chain_id, source).is_some() {
            tracing::warn!(target: "registry", chain_id, "replacing distributor adapter");
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, source: Arc<dyn CampaignSource>) -> Self {
        self.insert(source);
        self
    }

    /// The adapter for `chain_id`, provided a distributor is deployed there.
    pub fn resolve(&self, chain_id: u64) -> Result<&Arc<dyn CampaignSource>, ClaimError> {
        match self.sources.get(&chain_id) {
            Some(source) if source.is_contract_deployed() => Ok(source),
            _ => Err(ClaimError::ContractNotDeployed(chain_id)),
        }
    }

    /// Chain ids with a deployed distributor.
    pub fn deployed_chains(&self) -> Vec<u64> {
        self.sources
            .iter()
            .filter(|(_, s)| s.is_contract_deployed())
            .map(|(id, _)| *id)
            .collect()
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
