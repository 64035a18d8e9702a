// Path: crates/cli/src/main.rs
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

//! # claimkit CLI
//!
//! Lists, estimates, claims and watches rewards across the on-chain
//! distributors and the rewards ledger.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use claimkit_telemetry::init::{init_tracing_with, LogFormat};
use std::path::PathBuf;

mod commands;
mod util;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "claimkit",
    version,
    about = "Reconcile and claim quest rewards across chain and ledger.",
    long_about = "Secrets are read from the environment: CLAIMKIT_PRIVATE_KEY signs on-chain claims and CLAIMKIT_LEDGER_TOKEN authenticates against the ledger."
)]
struct Cli {
    #[clap(flatten)]
    global: GlobalArgs,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the engine configuration file.
    #[clap(long, short, global = true, default_value = "claimkit.toml", env = "CLAIMKIT_CONFIG")]
    pub config: PathBuf,

    /// Account to act for when no private key is configured (read-only).
    #[clap(long, global = true)]
    pub account: Option<String>,

    /// Print machine-readable JSON instead of text.
    #[clap(long, global = true)]
    pub json: bool,

    /// Log output format.
    #[clap(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogFormatArg {
    Json,
    Text,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Text => LogFormat::Text,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List claimable rewards from both authorities.
    Rewards(rewards::RewardsArgs),

    /// Estimate the cost of claiming on-chain rewards.
    Estimate(estimate::EstimateArgs),

    /// Claim a selection of rewards and reconcile the result.
    Claim(claim::ClaimArgs),

    /// Periodically refresh and report state transitions.
    Watch(watch::WatchArgs),

    /// Inspect a distributor campaign.
    Campaign(campaign::CampaignArgs),

    /// Validate configuration files.
    Config(config::ConfigCmdArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_with(cli.global.log_format.into())?;

    match cli.command {
        Commands::Rewards(args) => rewards::run(&cli.global, args).await,
        Commands::Estimate(args) => estimate::run(&cli.global, args).await,
        Commands::Claim(args) => claim::run(&cli.global, args).await,
        Commands::Watch(args) => watch::run(&cli.global, args).await,
        Commands::Campaign(args) => campaign::run(&cli.global, args).await,
        Commands::Config(args) => config::run(&cli.global, args),
    }
}
