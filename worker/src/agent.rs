//! Worker Agent: dos loops concurrentes (heartbeat y pedir/ejecutar) que
//! comparten un mismo token de cancelación.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
    time::{Duration, Instant},
};

use chrono::Utc;
use mr_common::{
    Task, TaskRequest, TaskSubmission, TaskType, WorkerHeartbeat, WorkerId, Workload,
    WORKER_STATUS_IDLE,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{client::MasterClient, config::WorkerSettings, executor::TaskExecutor};

pub struct WorkerAgent {
    worker_id: WorkerId,
    client: MasterClient,
    executor: TaskExecutor,
    settings: WorkerSettings,
    in_flight: AtomicU32,
    completed: AtomicU64,
}

impl WorkerAgent {
    pub fn new(
        worker_id: impl Into<WorkerId>,
        client: MasterClient,
        workload: Workload,
        work_dir: impl Into<PathBuf>,
        settings: WorkerSettings,
    ) -> Self {
        let executor = TaskExecutor::new(client.clone(), workload, work_dir);
        Self {
            worker_id: worker_id.into(),
            client,
            executor,
            settings,
            in_flight: AtomicU32::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Tareas ejecutadas (exitosas o no) desde que arrancó.
    pub fn tasks_executed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Corre los dos loops hasta que se cancele el token.
    pub async fn run(&self, cancel: &CancellationToken) {
        info!(
            "worker {} arrancando contra {}",
            self.worker_id,
            self.client.base_url()
        );
        tokio::join!(self.heartbeat_loop(cancel), self.poll_loop(cancel));
        info!(
            "worker {} detenido ({} tareas ejecutadas)",
            self.worker_id,
            self.tasks_executed()
        );
    }

    async fn heartbeat_loop(&self, cancel: &CancellationToken) {
        loop {
            let hb = WorkerHeartbeat {
                worker_id: self.worker_id.clone(),
                status: WORKER_STATUS_IDLE.to_string(),
                current_task_count: self.in_flight.load(Ordering::Relaxed),
                timestamp: Utc::now(),
            };
            let sent = tokio::select! {
                _ = cancel.cancelled() => break,
                res = self.client.heartbeat(&hb) => res,
            };
            if let Err(e) = sent {
                warn!("heartbeat falló: {:#}", e);
            }
            if !pause(cancel, self.settings.heartbeat_interval).await {
                break;
            }
        }
        debug!("loop de heartbeat terminado");
    }

    async fn poll_loop(&self, cancel: &CancellationToken) {
        let request = TaskRequest {
            worker_id: self.worker_id.clone(),
            supported_types: vec![TaskType::Map, TaskType::Reduce],
        };

        loop {
            let assignment = tokio::select! {
                _ = cancel.cancelled() => break,
                res = self.client.request_task(&request) => res,
            };

            let backoff = match assignment {
                Ok(Some(task)) => {
                    // la tarea en curso no se interrumpe
                    self.handle(task).await;
                    continue;
                }
                Ok(None) => {
                    debug!("no hay tareas, esperando {:?}", self.settings.idle_backoff);
                    self.settings.idle_backoff
                }
                Err(e) => {
                    warn!("error pidiendo tarea: {:#}", e);
                    self.settings.error_backoff
                }
            };

            if !pause(cancel, backoff).await {
                break;
            }
        }
        debug!("loop de tareas terminado");
    }

    /// Ejecuta la tarea y siempre reporta el resultado, haya salido bien o no.
    pub async fn handle(&self, task: Task) {
        info!(
            "tengo tarea {} ({:?}) del job {}",
            task.id,
            task.task_type(),
            task.job_id
        );
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let result = self.executor.execute(&task).await;
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);

        let submission = match result {
            Ok(records) => {
                info!(
                    "terminé tarea {} en {:.2}s ({} registros)",
                    task.id,
                    started.elapsed().as_secs_f64(),
                    records
                );
                TaskSubmission {
                    task_id: task.id.clone(),
                    worker_id: self.worker_id.clone(),
                    success: true,
                    error_message: None,
                    records_processed: records,
                }
            }
            Err(e) => {
                warn!("error procesando tarea {}: {:#}", task.id, e);
                TaskSubmission {
                    task_id: task.id.clone(),
                    worker_id: self.worker_id.clone(),
                    success: false,
                    error_message: Some(format!("{e:#}")),
                    records_processed: 0,
                }
            }
        };

        if let Err(e) = self.client.submit_result(&submission).await {
            warn!("no se pudo reportar la tarea {}: {:#}", task.id, e);
        }
    }
}

/// Espera `duration` o hasta la cancelación. Devuelve false si se canceló.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loops_stop_promptly_when_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = WorkerAgent::new(
            "w-test",
            MasterClient::new("http://127.0.0.1:1").unwrap(),
            Workload::word_count(),
            tmp.path(),
            WorkerSettings {
                heartbeat_interval: Duration::from_secs(60),
                idle_backoff: Duration::from_secs(60),
                error_backoff: Duration::from_secs(60),
            },
        );
        let cancel = CancellationToken::new();
        let stopper = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                cancel.cancel();
            })
        };

        let started = Instant::now();
        agent.run(&cancel).await;
        stopper.await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(agent.tasks_executed(), 0);
    }

    #[tokio::test]
    async fn already_cancelled_token_returns_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = WorkerAgent::new(
            "w-test",
            MasterClient::new("http://127.0.0.1:1").unwrap(),
            Workload::word_count(),
            tmp.path(),
            WorkerSettings::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), agent.run(&cancel))
            .await
            .unwrap();
    }
}
