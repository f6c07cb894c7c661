use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::worker::WorkerId;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Map,
    Reduce,
}

impl TaskType {
    /// Orden de asignación: los Map siempre antes que los Reduce.
    pub fn rank(self) -> u8 {
        match self {
            TaskType::Map => 0,
            TaskType::Reduce => 1,
        }
    }
}

/// Pending -> Assigned -> {Completed | Failed}. No hay vuelta a Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Assigned,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapTaskData {
    pub chunk_id: u32,
    pub lines: Vec<String>,
    /// Número (0-based) de la primera línea del chunk dentro del input.
    pub start_line: u64,
    pub end_line: u64,
    /// Cantidad de reducers, necesaria para particionar.
    pub num_reducers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReduceTaskData {
    pub partition_id: u32,
    /// URLs de los archivos intermedios `partition_<id>.txt` a descargar.
    pub intermediate_urls: Vec<String>,
}

/// El tipo de la tarea se deriva del payload, así nunca pueden divergir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskPayload {
    Map(MapTaskData),
    Reduce(ReduceTaskData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub job_id: JobId,
    pub status: TaskStatus,
    pub assigned_worker: Option<WorkerId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub payload: TaskPayload,
}

impl Task {
    fn pending(id: TaskId, job_id: JobId, payload: TaskPayload) -> Self {
        Self {
            id,
            job_id,
            status: TaskStatus::Pending,
            assigned_worker: None,
            assigned_at: None,
            completed_at: None,
            error_message: None,
            payload,
        }
    }

    pub fn map(job_id: impl Into<JobId>, data: MapTaskData) -> Self {
        Self::pending(
            format!("map_{}", data.chunk_id),
            job_id.into(),
            TaskPayload::Map(data),
        )
    }

    pub fn reduce(job_id: impl Into<JobId>, data: ReduceTaskData) -> Self {
        Self::pending(
            format!("reduce_{}", data.partition_id),
            job_id.into(),
            TaskPayload::Reduce(data),
        )
    }

    pub fn task_type(&self) -> TaskType {
        match self.payload {
            TaskPayload::Map(_) => TaskType::Map,
            TaskPayload::Reduce(_) => TaskType::Reduce,
        }
    }

    /// Pending -> Assigned. Devuelve false si la tarea no estaba Pending.
    pub fn assign(&mut self, worker_id: &str, at: DateTime<Utc>) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Assigned;
        self.assigned_worker = Some(worker_id.to_string());
        self.assigned_at = Some(at);
        true
    }

    /// Lleva la tarea a Completed o Failed.
    ///
    /// Una tarea ya terminal no se vuelve a tocar: devuelve false y el
    /// primer resultado reportado se conserva.
    pub fn finish(
        &mut self,
        success: bool,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        self.completed_at = Some(at);
        self.error_message = error_message;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_task(chunk_id: u32) -> Task {
        Task::map(
            "job-1",
            MapTaskData {
                chunk_id,
                lines: vec!["a b".into()],
                start_line: 0,
                end_line: 0,
                num_reducers: 2,
            },
        )
    }

    #[test]
    fn new_tasks_start_pending_with_derived_ids() {
        let t = map_task(7);
        assert_eq!(t.id, "map_7");
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.task_type(), TaskType::Map);

        let r = Task::reduce(
            "job-1",
            ReduceTaskData {
                partition_id: 3,
                intermediate_urls: vec![],
            },
        );
        assert_eq!(r.id, "reduce_3");
        assert_eq!(r.task_type(), TaskType::Reduce);
    }

    #[test]
    fn assign_only_from_pending() {
        let mut t = map_task(0);
        let now = Utc::now();
        assert!(t.assign("w1", now));
        assert_eq!(t.status, TaskStatus::Assigned);
        assert_eq!(t.assigned_worker.as_deref(), Some("w1"));
        assert_eq!(t.assigned_at, Some(now));

        // segunda asignación rechazada, el dueño no cambia
        assert!(!t.assign("w2", now));
        assert_eq!(t.assigned_worker.as_deref(), Some("w1"));
    }

    #[test]
    fn finish_is_terminal() {
        let mut t = map_task(0);
        t.assign("w1", Utc::now());
        assert!(t.finish(false, Some("boom".into()), Utc::now()));
        assert_eq!(t.status, TaskStatus::Failed);
        assert_eq!(t.error_message.as_deref(), Some("boom"));

        assert!(!t.finish(true, None, Utc::now()));
        assert_eq!(t.status, TaskStatus::Failed);
    }

    #[test]
    fn payload_is_tagged_with_task_type_on_the_wire() {
        let t = map_task(1);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["payload"]["type"], "Map");
        assert_eq!(json["payload"]["data"]["chunkId"], 1);
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["jobId"], "job-1");
    }
}
