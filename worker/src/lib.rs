//! Worker distribuido: pide tareas al master, las ejecuta y reporta.

pub mod agent;
pub mod client;
pub mod config;
pub mod executor;

use anyhow::Context;
use mr_common::Workload;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use agent::WorkerAgent;
pub use client::MasterClient;
pub use config::{WorkerArgs, WorkerSettings};
pub use executor::TaskExecutor;

/// Arranca un worker con la carga por defecto (word count) hasta Ctrl-C.
pub async fn run(args: WorkerArgs) -> anyhow::Result<()> {
    let client = MasterClient::new(&args.master_url).context("configuración del worker")?;
    let agent = WorkerAgent::new(
        args.resolve_worker_id(),
        client,
        Workload::word_count(),
        args.resolve_work_dir(),
        args.settings(),
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C recibido, deteniendo worker");
                    cancel.cancel();
                }
                Err(e) => warn!("no se pudo escuchar Ctrl-C: {}", e),
            }
        });
    }

    agent.run(&cancel).await;
    Ok(())
}
