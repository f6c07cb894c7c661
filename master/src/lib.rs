//! Master: registry de tareas, coordinador del job y API HTTP.

pub mod config;
pub mod coordinator;
pub mod handlers;
pub mod registry;
pub mod state;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use anyhow::Context;
use tokio::{net::TcpListener, sync::Notify};
use tracing::{error, info, warn};

use mr_common::TaskType;

pub use config::MasterArgs;
pub use coordinator::{JobCoordinator, JobOutcome};
pub use registry::{RegistryError, TaskRegistry};
pub use state::AppState;

/// Arranca el master: prepara el job, levanta la API y espera el resultado.
pub async fn run(args: MasterArgs) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", args.bind))?;
    match serve(args, listener).await? {
        Some(outcome) if !outcome.is_success() => {
            anyhow::bail!("el job no terminó correctamente: {:?}", outcome)
        }
        _ => Ok(()),
    }
}

/// Igual que [`run`] pero sobre un listener ya abierto. Devuelve el
/// resultado del job si terminó antes de apagar el servidor.
pub async fn serve(
    args: MasterArgs,
    listener: TcpListener,
) -> anyhow::Result<Option<JobOutcome>> {
    let config = args.job_config();
    info!("job {}: {:?}", config.job_id, config);

    let registry = Arc::new(TaskRegistry::new(config.job_id.clone()));
    let mut coordinator = JobCoordinator::new(config.clone(), registry.clone(), &args.public_url)
        .with_poll_interval(args.poll_interval());
    coordinator.prepare()?;

    let state = AppState::new(registry, config.work_dir.clone());
    let app = handlers::build_router(state);
    info!("master escuchando en {}", listener.local_addr()?);

    // fin del job (o error del monitor) -> apagado, sólo con --exit-on-completion
    let finished = Arc::new(Notify::new());
    let job_done = Arc::new(AtomicBool::new(false));
    let timeout = args.timeout();
    let exit_on_completion = args.exit_on_completion;

    let monitor = {
        let finished = finished.clone();
        let job_done = job_done.clone();
        tokio::spawn(async move {
            let outcome = monitor_job(&mut coordinator, timeout).await;
            if let Err(e) = &outcome {
                error!("monitor del job falló: {:#}", e);
            }
            job_done.store(true, Ordering::SeqCst);
            if exit_on_completion {
                finished.notify_one();
            }
            outcome
        })
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(finished, exit_on_completion))
        .await
        .context("error en el servidor HTTP")?;
    info!("master detenido");

    if job_done.load(Ordering::SeqCst) {
        return Ok(Some(monitor.await??));
    }
    monitor.abort();
    Ok(None)
}

async fn monitor_job(
    coordinator: &mut JobCoordinator,
    timeout: std::time::Duration,
) -> anyhow::Result<JobOutcome> {
    let started = Instant::now();
    let outcome = coordinator.await_completion(timeout).await?;
    let status = outcome.status();

    match &outcome {
        JobOutcome::Succeeded(_) => {
            let records = coordinator.merge_outputs()?;
            let registry = coordinator.registry();
            info!("===== resumen del job {} =====", status.job_id);
            info!("tiempo total: {:.2}s", started.elapsed().as_secs_f64());
            info!(
                "tareas: {} map / {} reduce",
                registry.count_by_type(TaskType::Map)?,
                registry.count_by_type(TaskType::Reduce)?
            );
            info!(
                "completadas: {} | fallidas: {} | workers: {}",
                status.completed_tasks, status.failed_tasks, status.active_workers
            );
            info!(
                "salida: {} ({} registros)",
                coordinator.config().output_path.display(),
                records
            );
        }
        JobOutcome::Failed(_) => error!(
            "job {} falló: {} completadas, {} fallidas",
            status.job_id, status.completed_tasks, status.failed_tasks
        ),
        JobOutcome::TimedOut(_) => warn!(
            "job {} no terminó a tiempo: {}/{} completadas",
            status.job_id, status.completed_tasks, status.total_tasks
        ),
    }
    Ok(outcome)
}

async fn shutdown_signal(finished: Arc<Notify>, exit_on_completion: bool) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("no se pudo escuchar Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let job_done = async {
        if exit_on_completion {
            finished.notified().await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C recibido, apagando"),
        _ = job_done => info!("job terminado, apagando"),
    }
}
