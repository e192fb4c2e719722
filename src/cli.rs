//! CLI argument parsing with subcommand architecture.

use bugboy_core::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bugboy",
    version,
    about = "Demo HTTP service that fails on purpose",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options used when no subcommand is given
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the server (default when no subcommand is given)
    Run(RunArgs),
    /// Print the demo routes and exit
    Routes,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "BUGBOY_CONFIG")]
    pub config: String,

    /// Listen host
    #[arg(long, env = "BUGBOY_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log level
    #[arg(long, default_value = "info", env = "BUGBOY_LOG_LEVEL")]
    pub log_level: String,

    /// Panic recovery switch; "false" or "0" disables it
    #[arg(long, env = "BUGBOY_RECOVER_PANICS")]
    pub recover_panics: Option<String>,

    /// API key for the external error sink
    #[arg(long, env = "BUGSTACK_API_KEY", hide_env_values = true)]
    pub bugstack_api_key: Option<String>,

    /// Event ingestion URL for the external error sink
    #[arg(long, env = "BUGSTACK_ENDPOINT")]
    pub bugstack_endpoint: Option<String>,

    /// Graceful shutdown timeout in seconds (overrides config)
    #[arg(long)]
    pub shutdown_timeout: Option<u64>,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            recover_panics: self.recover_panics.clone(),
            shutdown_timeout: self.shutdown_timeout,
            reporter_api_key: self.bugstack_api_key.clone(),
            reporter_endpoint: self.bugstack_endpoint.clone(),
        }
    }
}
