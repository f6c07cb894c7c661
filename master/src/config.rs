use std::{path::PathBuf, time::Duration};

use clap::Args;
use mr_common::{default_work_dir, JobConfig};

use crate::coordinator::{DEFAULT_JOB_TIMEOUT, DEFAULT_POLL_INTERVAL};

/// Flags del master. Cada uno también se puede pasar por variable de entorno.
#[derive(Debug, Clone, Args)]
pub struct MasterArgs {
    /// Archivo de entrada
    #[arg(long, env = "MR_INPUT", default_value = "input.txt")]
    pub input: PathBuf,

    /// Archivo de salida final
    #[arg(long, env = "MR_OUTPUT", default_value = "output.txt")]
    pub output: PathBuf,

    #[arg(long, env = "MR_REDUCERS", default_value_t = 4)]
    pub reducers: u32,

    #[arg(long, env = "MR_CHUNK_SIZE_MB", default_value_t = 1)]
    pub chunk_size_mb: usize,

    /// Directorio compartido con los workers (default: <tmp>/mapreduce)
    #[arg(long, env = "MR_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    #[arg(long, env = "MR_BIND", default_value = "127.0.0.1:5000")]
    pub bind: String,

    /// URL con la que los workers llegan a este master
    #[arg(long, env = "MR_PUBLIC_URL", default_value = "http://localhost:5000")]
    pub public_url: String,

    #[arg(long, default_value_t = DEFAULT_JOB_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    #[arg(
        long,
        default_value_t = DEFAULT_POLL_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_secs: u64,

    /// Apagar el servidor cuando el job termina
    #[arg(long)]
    pub exit_on_completion: bool,
}

impl MasterArgs {
    /// Crea la configuración del job con un id nuevo.
    pub fn job_config(&self) -> JobConfig {
        JobConfig::new(
            &self.input,
            &self.output,
            self.reducers,
            self.chunk_size_mb,
            self.work_dir.clone().unwrap_or_else(default_work_dir),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
