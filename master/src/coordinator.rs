//! Ciclo de vida del job en dos fases: Map, y recién cuando todos los Map
//! terminaron bien, Reduce. Al final se mezclan las salidas por partición.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use mr_common::{
    engine, layout::ensure_dir, InputSplitter, JobConfig, JobStatus, MapTaskData, ReduceTaskData,
    Task,
};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::registry::TaskRegistry;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(600);

/// Resultado de esperar el fin del job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(JobStatus),
    /// Todas las tareas terminaron pero al menos una falló.
    Failed(JobStatus),
    TimedOut(JobStatus),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded(_))
    }

    pub fn status(&self) -> &JobStatus {
        match self {
            JobOutcome::Succeeded(s) | JobOutcome::Failed(s) | JobOutcome::TimedOut(s) => s,
        }
    }
}

pub struct JobCoordinator {
    config: JobConfig,
    registry: Arc<TaskRegistry>,
    /// Base de las URLs de archivos intermedios que reciben los reducers
    public_url: String,
    poll_interval: Duration,
    reduce_phase_started: bool,
}

impl JobCoordinator {
    pub fn new(
        config: JobConfig,
        registry: Arc<TaskRegistry>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            config,
            registry,
            public_url: public_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reduce_phase_started: false,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn reduce_phase_started(&self) -> bool {
        self.reduce_phase_started
    }

    /// Parte el input y registra una tarea Map por chunk. Se llama una sola
    /// vez, antes de empezar a esperar.
    pub fn prepare(&self) -> anyhow::Result<usize> {
        self.config.validate().context("configuración de job inválida")?;
        ensure_dir(&self.config.job_dir())?;

        let chunks = InputSplitter::new(self.config.chunk_size_bytes)
            .split_file(&self.config.input_path)
            .with_context(|| format!("no se pudo partir {}", self.config.input_path.display()))?;

        let tasks: Vec<Task> = chunks
            .into_iter()
            .map(|chunk| {
                Task::map(
                    self.config.job_id.clone(),
                    MapTaskData {
                        chunk_id: chunk.chunk_id,
                        lines: chunk.lines,
                        start_line: chunk.start_line,
                        end_line: chunk.end_line,
                        num_reducers: self.config.num_reducers,
                    },
                )
            })
            .collect();

        let count = self.registry.register(tasks)?;
        info!(
            "job {} preparado: {} tareas map, {} reducers",
            self.config.job_id, count, self.config.num_reducers
        );
        Ok(count)
    }

    /// Registra una tarea Reduce por partición. A lo sumo una vez por job:
    /// las llamadas siguientes no hacen nada y devuelven 0.
    pub fn advance_to_reduce_phase(&mut self) -> anyhow::Result<usize> {
        if self.reduce_phase_started {
            return Ok(0);
        }
        self.reduce_phase_started = true;

        let mut tasks = Vec::with_capacity(self.config.num_reducers as usize);
        for partition_id in 0..self.config.num_reducers {
            let intermediate_urls = self
                .registry
                .intermediate_locations(partition_id)?
                .iter()
                .map(|loc| loc.url(&self.public_url))
                .collect();
            tasks.push(Task::reduce(
                self.config.job_id.clone(),
                ReduceTaskData {
                    partition_id,
                    intermediate_urls,
                },
            ));
        }

        let count = self.registry.register(tasks)?;
        info!("fase map completa, {} tareas reduce registradas", count);
        Ok(count)
    }

    /// Una vuelta de polling: si todos los Map terminaron bien, arranca la
    /// fase Reduce, y devuelve el estado ya actualizado.
    pub fn poll(&mut self) -> anyhow::Result<JobStatus> {
        if !self.reduce_phase_started && self.registry.all_map_tasks_complete()? {
            self.advance_to_reduce_phase()?;
        }
        Ok(self.registry.status()?)
    }

    /// Espera hasta que todas las tareas sean terminales o venza `timeout`.
    pub async fn await_completion(&mut self, timeout: Duration) -> anyhow::Result<JobOutcome> {
        let deadline = Instant::now() + timeout;
        let mut last_completed = None;

        loop {
            let status = self.poll()?;

            if last_completed != Some(status.completed_tasks) {
                last_completed = Some(status.completed_tasks);
                info!(
                    "progreso: {}/{} completadas ({:.1}%) | fallidas: {} | corriendo: {} | workers: {}",
                    status.completed_tasks,
                    status.total_tasks,
                    status.progress_pct(),
                    status.failed_tasks,
                    status.running_tasks,
                    status.active_workers
                );
            }

            if status.is_complete {
                if status.failed_tasks == 0 {
                    return Ok(JobOutcome::Succeeded(status));
                }
                warn!("job terminado con {} tareas fallidas", status.failed_tasks);
                return Ok(JobOutcome::Failed(status));
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("timeout esperando el job {} ({:?})", self.config.job_id, timeout);
                return Ok(JobOutcome::TimedOut(status));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Concatena las salidas de cada partición, en orden de partición, en el
    /// archivo de salida final. Devuelve la cantidad de registros.
    pub fn merge_outputs(&self) -> anyhow::Result<u64> {
        let layout = self.config.layout();
        let inputs = (0..self.config.num_reducers).map(|p| layout.reduce_output_path(p));
        let records = engine::merge_outputs(inputs, &self.config.output_path)
            .with_context(|| format!("no se pudo escribir {}", self.config.output_path.display()))?;
        info!(
            "salida final: {} registros en {}",
            records,
            self.config.output_path.display()
        );
        Ok(records)
    }
}
