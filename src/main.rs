use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

use tokenguard::cli::{self, Cli};
use tokenguard::config::Config;

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tokenguard=info"));
    let registry = Registry::default().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let config = Config::from_env_with_toml(cli.config.as_deref())?;
    tracing::debug!(
        rpc = %config.rpc.url,
        contract = %config.contract.address,
        "configuration loaded"
    );

    cli::run(cli, config).await
}
