// Path: crates/cli/src/commands/mod.rs

pub mod campaign;
pub mod claim;
pub mod config;
pub mod estimate;
pub mod rewards;
pub mod watch;
