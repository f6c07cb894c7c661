use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::layout::JobLayout;

pub type JobId = String;

pub const BYTES_PER_MB: usize = 1024 * 1024;

/// Configuración inmutable de un job. Se crea una vez al arrancar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    pub job_id: JobId,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub num_reducers: u32,
    pub chunk_size_bytes: usize,
    /// Directorio compartido entre master y workers
    pub work_dir: PathBuf,
}

impl JobConfig {
    /// Crea un job con id UUID v4 nuevo.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        num_reducers: u32,
        chunk_size_mb: usize,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            num_reducers,
            chunk_size_bytes: chunk_size_mb.saturating_mul(BYTES_PER_MB),
            work_dir: work_dir.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_reducers == 0 {
            return Err(Error::InvalidConfig(
                "num_reducers debe ser >= 1".to_string(),
            ));
        }
        if self.chunk_size_bytes == 0 {
            return Err(Error::InvalidConfig(
                "chunk_size debe ser > 0".to_string(),
            ));
        }
        if self.job_id.is_empty() {
            return Err(Error::InvalidConfig("job_id vacío".to_string()));
        }
        Ok(())
    }

    pub fn layout(&self) -> JobLayout {
        JobLayout::new(&self.work_dir, &self.job_id)
    }

    pub fn job_dir(&self) -> PathBuf {
        self.layout().job_dir().to_path_buf()
    }
}

/// Directorio de trabajo por defecto: `<tmp>/mapreduce`.
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("mapreduce")
}

/// Foto agregada del estado del job, calculada on demand por el registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: JobId,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub running_tasks: usize,
    pub active_workers: usize,
    pub is_complete: bool,
}

impl JobStatus {
    pub fn from_counts(
        job_id: impl Into<JobId>,
        total_tasks: usize,
        completed_tasks: usize,
        failed_tasks: usize,
        running_tasks: usize,
        active_workers: usize,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            total_tasks,
            completed_tasks,
            failed_tasks,
            running_tasks,
            active_workers,
            is_complete: completed_tasks + failed_tasks == total_tasks,
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.total_tasks
            .saturating_sub(self.completed_tasks + self.failed_tasks + self.running_tasks)
    }

    /// Porcentaje de tareas completadas (no cuenta las fallidas).
    pub fn progress_pct(&self) -> f64 {
        if self.total_tasks == 0 {
            return 0.0;
        }
        self.completed_tasks as f64 * 100.0 / self.total_tasks as f64
    }
}
