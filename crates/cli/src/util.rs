// Path: crates/cli/src/util.rs
//! Shared wiring for subcommands: config, secrets, engine and selection.

use crate::GlobalArgs;
use anyhow::{anyhow, bail, Context as _, Result};
use claimkit_chain::{registry_from_config, wallet_from_private_key};
use claimkit_engine::RewardEngine;
use claimkit_ledger::HttpLedgerClient;
use claimkit_types::config::EngineConfig;
use claimkit_types::estimate::format_units;
use claimkit_types::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Environment variable holding the hex private key used to sign claims.
pub const PRIVATE_KEY_ENV: &str = "CLAIMKIT_PRIVATE_KEY";
/// Environment variable holding the ledger bearer token.
pub const LEDGER_TOKEN_ENV: &str = "CLAIMKIT_LEDGER_TOKEN";

pub struct Context {
    pub config: EngineConfig,
    pub engine: RewardEngine,
    pub session: ClaimSession,
}

pub fn load_config(path: &Path) -> Result<EngineConfig> {
    EngineConfig::load(path).with_context(|| format!("loading config from {}", path.display()))
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Loads the config, reads secrets from the environment and builds the engine.
pub fn connect(global: &GlobalArgs) -> Result<Context> {
    let config = load_config(&global.config)?;

    let wallet = env_secret(PRIVATE_KEY_ENV)
        .map(|k| wallet_from_private_key(&k))
        .transpose()
        .context(PRIVATE_KEY_ENV)?;
    let signer = wallet.as_ref().map(claimkit_chain::wallet_address);
    let account = match (signer, global.account.as_deref()) {
        (Some(signer), Some(flag)) => {
            let flag: Address = flag.parse().context("--account")?;
            if flag != signer {
                bail!("--account {flag} does not match the configured private key ({signer})");
            }
            Some(signer)
        }
        (Some(signer), None) => Some(signer),
        (None, Some(flag)) => Some(flag.parse::<Address>().context("--account")?),
        (None, None) => None,
    };

    let registry = registry_from_config(&config, wallet)?;
    let ledger = HttpLedgerClient::new(&config.ledger)?;
    let engine = RewardEngine::new(registry, Arc::new(ledger), &config);
    let token = env_secret(LEDGER_TOKEN_ENV);
    let session = match account {
        Some(account) => ClaimSession::new(account, token),
        None => ClaimSession::disconnected(),
    };
    tracing::debug!(target: "cli", ?session, "session ready");
    Ok(Context {
        config,
        engine,
        session,
    })
}

/// Which rewards the operator selected on the command line.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Chain of the selected on-chain campaigns.
    #[clap(long)]
    pub chain: Option<u64>,

    /// On-chain campaign id to select (repeatable).
    #[clap(long = "campaign")]
    pub campaigns: Vec<u64>,

    /// Ledger reward id to select (repeatable).
    #[clap(long = "ledger")]
    pub ledger_ids: Vec<String>,
}

/// Resolves the selection against `snapshot`, in command-line order.
pub fn select(snapshot: &ClaimableSnapshot, args: &SelectionArgs) -> Result<Vec<ClaimableReward>> {
    match (args.campaigns.is_empty(), args.ledger_ids.is_empty()) {
        (true, true) => bail!("select rewards with --campaign or --ledger"),
        (false, false) => bail!("on-chain and ledger rewards are claimed separately"),
        (false, true) => {
            let chain = args
                .chain
                .ok_or_else(|| anyhow!("--chain is required with --campaign"))?;
            args.campaigns
                .iter()
                .map(|campaign| {
                    snapshot
                        .blockchain
                        .iter()
                        .find(|r| match &r.path {
                            ClaimPath::OnChain(t) => {
                                t.chain_id == chain && t.campaign_id == U256::from(*campaign)
                            }
                            ClaimPath::Ledger(_) => false,
                        })
                        .cloned()
                        .ok_or_else(|| anyhow!("campaign {campaign} on chain {chain} is not listed"))
                })
                .collect()
        }
        (true, false) => args
            .ledger_ids
            .iter()
            .map(|id| {
                snapshot
                    .get(&RewardId::ledger(id.as_str()))
                    .cloned()
                    .ok_or_else(|| anyhow!("ledger reward {id} is not listed"))
            })
            .collect(),
    }
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per reward.
pub fn describe(reward: &ClaimableReward) -> String {
    let deadline = reward
        .deadline
        .map(|d| format!(" deadline={d}"))
        .unwrap_or_default();
    let title = match &reward.path {
        ClaimPath::Ledger(t) => t.title.as_deref().map(|t| format!(" \"{t}\"")).unwrap_or_default(),
        ClaimPath::OnChain(t) => format!(" token={}", t.reward_token),
    };
    format!(
        "{:<15} {} amount={}{}{}",
        reward.state.as_str(),
        reward.id(),
        reward.amount,
        deadline,
        title
    )
}

/// A cost estimate in the chain's native unit.
pub fn describe_estimate(estimate: &CostEstimate, native_decimals: u8) -> String {
    let mut line = format!(
        "gas price {} wei, {} gas, cost {} (native)",
        estimate.gas_price,
        estimate.gas_units,
        format_units(estimate.estimated_cost, native_decimals)
    );
    if let GasSource::Fallback { reason, .. } = &estimate.gas_source {
        line.push_str(&format!(" [approximate: {reason}]"));
    }
    line
}

/// Native decimals of `chain_id`, defaulting to 18.
pub fn native_decimals(config: &EngineConfig, chain_id: Option<u64>) -> u8 {
    chain_id
        .and_then(|c| config.chain(c))
        .map_or(18, |c| c.native_decimals)
}
