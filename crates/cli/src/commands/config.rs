// Path: crates/cli/src/commands/config.rs

use crate::util;
use crate::GlobalArgs;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct ConfigCmdArgs {
    #[clap(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Load and validate the configuration, then summarize it.
    Check,
}

pub fn run(global: &GlobalArgs, args: ConfigCmdArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Check => check(global),
    }
}

fn check(global: &GlobalArgs) -> Result<()> {
    let config = util::load_config(&global.config)?;
    if global.json {
        return util::print_json(&config);
    }
    println!("{} is valid", global.config.display());
    println!("ledger: {}", config.ledger.base_url);
    for chain in &config.chains {
        let status = if chain.is_deployed() {
            format!("distributor {}", chain.distributor)
        } else {
            "no distributor deployed".to_string()
        };
        println!("chain {}: {} ({status})", chain.chain_id, chain.rpc_url);
    }
    println!(
        "gas: fallback {} per claim, max batch {}",
        config.gas.fallback_gas_per_claim, config.gas.max_batch_size
    );
    Ok(())
}
