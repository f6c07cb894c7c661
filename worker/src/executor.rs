use std::path::PathBuf;

use mr_common::{
    engine, shuffle::parse_records, JobLayout, MapTaskData, ReduceTaskData, Task, TaskPayload,
    Workload,
};
use tracing::{debug, warn};

use crate::client::MasterClient;

/// Ejecuta una tarea ya asignada y devuelve los registros emitidos.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    client: MasterClient,
    workload: Workload,
    work_dir: PathBuf,
}

impl TaskExecutor {
    pub fn new(client: MasterClient, workload: Workload, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            workload,
            work_dir: work_dir.into(),
        }
    }

    pub async fn execute(&self, task: &Task) -> anyhow::Result<u64> {
        let layout = JobLayout::new(&self.work_dir, &task.job_id);
        match &task.payload {
            TaskPayload::Map(data) => {
                self.execute_map(data.clone(), layout.map_task_dir(data.chunk_id))
                    .await
            }
            TaskPayload::Reduce(data) => {
                self.execute_reduce(data, layout.reduce_output_path(data.partition_id))
                    .await
            }
        }
    }

    async fn execute_map(&self, data: MapTaskData, out_dir: PathBuf) -> anyhow::Result<u64> {
        let mapper = self.workload.mapper.clone();
        // el map es CPU + disco, va en un hilo de bloqueo
        let records =
            tokio::task::spawn_blocking(move || engine::run_map(&data, mapper.as_ref(), &out_dir))
                .await??;
        Ok(records)
    }

    /// Los archivos que no se pueden descargar se saltean: el reduce sigue
    /// con lo que haya y la tarea se reporta igual como exitosa.
    async fn execute_reduce(
        &self,
        data: &ReduceTaskData,
        output: PathBuf,
    ) -> anyhow::Result<u64> {
        let mut pairs = Vec::new();
        for url in &data.intermediate_urls {
            match self.client.fetch_text(url).await {
                Ok(body) => {
                    let records = parse_records(&body);
                    debug!("descargados {} registros de {}", records.len(), url);
                    pairs.extend(records);
                }
                Err(e) => warn!("no se pudo descargar {}: {:#}", url, e),
            }
        }

        let reducer = self.workload.reducer.clone();
        let records = tokio::task::spawn_blocking(move || {
            engine::run_reduce(pairs, reducer.as_ref(), &output)
        })
        .await??;
        Ok(records)
    }
}
