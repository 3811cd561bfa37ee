use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "homevoice", about = "Telephony voice bridge for appliance diagnostics")]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "homevoice.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gateway (default when no subcommand is given).
    Serve,
    /// Inspect or validate configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the version.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Validate the config file and environment secrets.
    Validate,
    /// Print the effective configuration.
    Show,
}
