//! Command-line interface for the tokenguard console.

mod console;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::contract::Address;
use crate::wallet::{MemoryProvider, WalletProvider};

pub use self::console::{Console, ExecResult};

/// Account that owns the in-memory contract in `--dry-run` mode.
pub const DRY_RUN_OWNER: &str = "0x00000000000000000000000000000000000000aa";

#[derive(Parser, Debug)]
#[command(
    name = "tokenguard",
    version,
    about = "Wallet session and privileged-action console for an owner-administered token contract"
)]
pub struct Cli {
    /// TOML config file (default: ~/.tokenguard/config.toml)
    #[arg(long, global = true, value_name = "PATH", env = "TOKENGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run against an in-memory contract instead of the RPC endpoint
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Connect as this account
    #[arg(long = "as", global = true, value_name = "ADDRESS")]
    pub as_account: Option<Address>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Connect the wallet and show the session role
    Connect,

    /// Connect and show the contract's paused flag
    Status,

    /// Run one action: `exec freezeAccount target=0x...`
    Exec {
        /// Action name, e.g. sendValue or freeze-account
        action: String,

        /// Parameters as name=value
        #[arg(value_name = "NAME=VALUE")]
        params: Vec<String>,
    },

    /// List actions with their required role and parameters
    Actions {
        /// Connect first and show only the actions the session may run
        #[arg(long)]
        connect: bool,
    },
}

impl Cli {
    /// Build the wallet provider for this invocation. `None` means no wallet
    /// could be set up, which connect reports as provider-unavailable.
    pub fn provider(&self, config: &Config) -> anyhow::Result<Option<Arc<dyn WalletProvider>>> {
        if self.dry_run {
            let owner = Address::parse(DRY_RUN_OWNER)?;
            let account = self.as_account.unwrap_or(owner);
            tracing::info!(%account, %owner, "dry run against in-memory contract");
            let provider: Arc<dyn WalletProvider> =
                Arc::new(MemoryProvider::new(config.contract.address, account, owner));
            return Ok(Some(provider));
        }

        match config.rpc.provider() {
            Ok(provider) => {
                let provider: Arc<dyn WalletProvider> = match self.as_account {
                    Some(account) => Arc::new(provider.with_account(account)),
                    None => Arc::new(provider),
                };
                Ok(Some(provider))
            }
            Err(e) => {
                tracing::warn!("wallet provider unavailable: {}", e);
                Ok(None)
            }
        }
    }
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    let provider = cli.provider(&config)?;
    let console = Console::new(provider, &config);

    match cli.command {
        Command::Connect => console.run_connect(cli.json).await,
        Command::Status => console.run_status(cli.json).await,
        Command::Exec { action, params } => console.run_exec(&action, &params, cli.json).await,
        Command::Actions { connect } => console.run_actions(connect, cli.json).await,
    }
}
