use std::{path::PathBuf, time::Duration};

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct WorkerArgs {
    /// Id del worker (default: <hostname>-<uuid corto>)
    #[arg(long, env = "MR_WORKER_ID")]
    pub worker_id: Option<String>,

    #[arg(long, env = "MASTER_URL", default_value = "http://localhost:5000")]
    pub master_url: String,

    /// Directorio compartido con el master (default: <tmp>/mapreduce)
    #[arg(long, env = "MR_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub heartbeat_secs: u64,
}

impl WorkerArgs {
    pub fn resolve_worker_id(&self) -> String {
        self.worker_id.clone().unwrap_or_else(default_worker_id)
    }

    pub fn resolve_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(mr_common::default_work_dir)
    }

    pub fn settings(&self) -> WorkerSettings {
        WorkerSettings {
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
            ..WorkerSettings::default()
        }
    }
}

/// Intervalos de los loops del worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub heartbeat_interval: Duration,
    /// Espera cuando el master no tiene tareas
    pub idle_backoff: Duration,
    /// Espera después de un error de red
    pub error_backoff: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            idle_backoff: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
        }
    }
}

pub fn default_worker_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "worker".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", host, &suffix[..8])
}
