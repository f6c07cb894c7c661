mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("mr_common=info,mr_master=debug,mr_worker=debug,tower_http=info")
        }))
        .init();

    cli::execute(cli::Cli::parse()).await
}
