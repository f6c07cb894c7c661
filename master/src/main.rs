use clap::Parser;
use mr_master::MasterArgs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mr-master")]
#[command(about = "Master de map/reduce distribuido")]
struct Cli {
    #[command(flatten)]
    args: MasterArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mr_master=debug,tower_http=info")),
        )
        .init();

    mr_master::run(Cli::parse().args).await
}
