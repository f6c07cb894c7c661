use clap::Parser;
use mr_worker::WorkerArgs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mr-worker")]
#[command(about = "Worker de map/reduce distribuido")]
struct Cli {
    #[command(flatten)]
    args: WorkerArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mr_worker=debug,reqwest=info")),
        )
        .init();

    mr_worker::run(Cli::parse().args).await
}
