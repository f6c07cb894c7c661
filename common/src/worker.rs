use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{TaskId, TaskType};

pub type WorkerId = String;

/// Estado que el worker reporta en cada heartbeat.
pub const WORKER_STATUS_IDLE: &str = "idle";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub worker_id: WorkerId,
    pub supported_types: Vec<TaskType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub records_processed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerHeartbeat {
    pub worker_id: WorkerId,
    pub status: String,
    #[serde(default)]
    pub current_task_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Registro de vida de un worker. Se crea en el primer contacto y nunca se borra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    pub worker_id: WorkerId,
    pub last_heartbeat: DateTime<Utc>,
    pub status: String,
    pub current_task_count: u32,
}

impl WorkerInfo {
    pub fn new(worker_id: impl Into<WorkerId>, now: DateTime<Utc>) -> Self {
        Self {
            worker_id: worker_id.into(),
            last_heartbeat: now,
            status: WORKER_STATUS_IDLE.to_string(),
            current_task_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}
