// master/src/registry.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use chrono::Utc;
use mr_common::{
    IntermediateLocation, JobId, JobStatus, Task, TaskId, TaskPayload, TaskStatus, TaskSubmission,
    TaskType, WorkerHeartbeat, WorkerId, WorkerInfo,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tarea desconocida: {0}")]
    UnknownTask(TaskId),

    /// Algún hilo hizo panic con el lock tomado.
    #[error("lock del registry envenenado ({0})")]
    Poisoned(&'static str),
}

/// Entrada de la tabla: `seq` da un orden de asignación estable.
#[derive(Debug)]
struct Slot {
    seq: u64,
    task: Task,
}

#[derive(Debug, Default)]
struct TaskTable {
    slots: HashMap<TaskId, Slot>,
    next_seq: u64,
}

/// Fuente única de verdad de tareas y workers de un job.
///
/// El lock de `tasks` se toma durante toda la asignación, así dos pedidos
/// concurrentes nunca reciben la misma tarea. Orden de locks: `tasks` y
/// después `workers`, nunca al revés.
#[derive(Debug)]
pub struct TaskRegistry {
    job_id: JobId,
    tasks: Mutex<TaskTable>,
    workers: Mutex<HashMap<WorkerId, WorkerInfo>>,
}

impl TaskRegistry {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            tasks: Mutex::new(TaskTable::default()),
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    fn lock_tasks(&self) -> Result<MutexGuard<'_, TaskTable>, RegistryError> {
        self.tasks.lock().map_err(|_| RegistryError::Poisoned("tasks"))
    }

    fn lock_workers(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<WorkerId, WorkerInfo>>, RegistryError> {
        self.workers
            .lock()
            .map_err(|_| RegistryError::Poisoned("workers"))
    }

    /// Agrega tareas por id. Si el id ya existe, gana la última escritura.
    pub fn register(&self, tasks: Vec<Task>) -> Result<usize, RegistryError> {
        let mut table = self.lock_tasks()?;
        let count = tasks.len();
        for task in tasks {
            let seq = table.next_seq;
            table.next_seq += 1;
            if let Some(prev) = table.slots.insert(task.id.clone(), Slot { seq, task }) {
                warn!("tarea {} registrada de nuevo, se pisa la anterior", prev.task.id);
            }
        }
        Ok(count)
    }

    /// Asigna la primera tarea Pending de un tipo soportado (Map antes que
    /// Reduce, y dentro del mismo tipo en orden de registro).
    ///
    /// `Ok(None)` significa "no hay tarea disponible", no es un error.
    pub fn request_assignment(
        &self,
        worker_id: &str,
        supported_types: &[TaskType],
    ) -> Result<Option<Task>, RegistryError> {
        let mut table = self.lock_tasks()?;
        self.touch_worker(worker_id, None)?;

        let chosen = table
            .slots
            .values()
            .filter(|slot| slot.task.status == TaskStatus::Pending)
            .filter(|slot| supported_types.contains(&slot.task.task_type()))
            .min_by_key(|slot| (slot.task.task_type().rank(), slot.seq))
            .map(|slot| slot.task.id.clone());

        let Some(task_id) = chosen else {
            return Ok(None);
        };

        let Some(slot) = table.slots.get_mut(&task_id) else {
            return Ok(None);
        };
        slot.task.assign(worker_id, Utc::now());
        info!(
            "asignando tarea {:?} {} al worker {}",
            slot.task.task_type(),
            slot.task.id,
            worker_id
        );
        Ok(Some(slot.task.clone()))
    }

    /// Lleva la tarea a Completed / Failed según `success`.
    ///
    /// No se valida que `worker_id` sea el worker asignado: cualquier worker
    /// puede reportar cualquier tarea.
    pub fn submit_result(
        &self,
        submission: &TaskSubmission,
    ) -> Result<TaskStatus, RegistryError> {
        let mut table = self.lock_tasks()?;
        let slot = table
            .slots
            .get_mut(&submission.task_id)
            .ok_or_else(|| RegistryError::UnknownTask(submission.task_id.clone()))?;

        let now = Utc::now();
        let task = &mut slot.task;
        if !task.finish(submission.success, submission.error_message.clone(), now) {
            warn!(
                "tarea {} ya estaba en {:?}, se ignora el reporte de {}",
                task.id, task.status, submission.worker_id
            );
            return Ok(task.status);
        }

        let secs = task
            .assigned_at
            .map(|at| (now - at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);
        info!(
            "tarea {} terminada por {} en {:.2}s: {:?} ({} registros)",
            task.id, submission.worker_id, secs, task.status, submission.records_processed
        );
        if let Some(err) = &task.error_message {
            warn!("tarea {} falló: {}", task.id, err);
        }
        Ok(task.status)
    }

    /// Actualiza (o crea) el registro de vida del worker. No reasigna nada.
    pub fn heartbeat(&self, heartbeat: &WorkerHeartbeat) -> Result<(), RegistryError> {
        self.touch_worker(&heartbeat.worker_id, Some(heartbeat))
    }

    fn touch_worker(
        &self,
        worker_id: &str,
        heartbeat: Option<&WorkerHeartbeat>,
    ) -> Result<(), RegistryError> {
        let now = Utc::now();
        let mut workers = self.lock_workers()?;
        let info = workers
            .entry(worker_id.to_string())
            .or_insert_with(|| WorkerInfo::new(worker_id, now));
        info.last_heartbeat = now;
        if let Some(hb) = heartbeat {
            info.status = hb.status.clone();
            info.current_task_count = hb.current_task_count;
        }
        Ok(())
    }

    pub fn status(&self) -> Result<JobStatus, RegistryError> {
        let (total, completed, failed, running) = {
            let table = self.lock_tasks()?;
            let mut completed = 0;
            let mut failed = 0;
            let mut running = 0;
            for slot in table.slots.values() {
                match slot.task.status {
                    TaskStatus::Completed => completed += 1,
                    TaskStatus::Failed => failed += 1,
                    TaskStatus::Assigned => running += 1,
                    TaskStatus::Pending => {}
                }
            }
            (table.slots.len(), completed, failed, running)
        };
        let active_workers = self.lock_workers()?.len();

        Ok(JobStatus::from_counts(
            self.job_id.clone(),
            total,
            completed,
            failed,
            running,
            active_workers,
        ))
    }

    /// true sii hay al menos una tarea Map y todas están Completed.
    ///
    /// Un solo Map en Failed deja esto en false para siempre.
    pub fn all_map_tasks_complete(&self) -> Result<bool, RegistryError> {
        let table = self.lock_tasks()?;
        let mut maps = table
            .slots
            .values()
            .filter(|slot| slot.task.task_type() == TaskType::Map)
            .peekable();
        if maps.peek().is_none() {
            return Ok(false);
        }
        Ok(maps.all(|slot| slot.task.status == TaskStatus::Completed))
    }

    /// Para cada Map completado, la ubicación de su `partition_<id>.txt`,
    /// en orden de registro.
    pub fn intermediate_locations(
        &self,
        partition_id: u32,
    ) -> Result<Vec<IntermediateLocation>, RegistryError> {
        let table = self.lock_tasks()?;
        let mut completed: Vec<(u64, IntermediateLocation)> = table
            .slots
            .values()
            .filter(|slot| slot.task.status == TaskStatus::Completed)
            .filter_map(|slot| match &slot.task.payload {
                TaskPayload::Map(data) => Some((
                    slot.seq,
                    IntermediateLocation::for_partition(
                        &slot.task.job_id,
                        data.chunk_id,
                        partition_id,
                    ),
                )),
                TaskPayload::Reduce(_) => None,
            })
            .collect();
        completed.sort_by_key(|(seq, _)| *seq);
        Ok(completed.into_iter().map(|(_, loc)| loc).collect())
    }

    pub fn task(&self, task_id: &str) -> Result<Option<Task>, RegistryError> {
        Ok(self
            .lock_tasks()?
            .slots
            .get(task_id)
            .map(|slot| slot.task.clone()))
    }

    pub fn count_by_type(&self, task_type: TaskType) -> Result<usize, RegistryError> {
        Ok(self
            .lock_tasks()?
            .slots
            .values()
            .filter(|slot| slot.task.task_type() == task_type)
            .count())
    }

    pub fn workers(&self) -> Result<Vec<WorkerInfo>, RegistryError> {
        let mut out: Vec<WorkerInfo> = self.lock_workers()?.values().cloned().collect();
        out.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mr_common::{MapTaskData, ReduceTaskData};
    use std::sync::{Arc, Barrier};

    fn map_task(chunk_id: u32) -> Task {
        Task::map(
            "job-1",
            MapTaskData {
                chunk_id,
                lines: vec![format!("linea {chunk_id}")],
                start_line: chunk_id as u64,
                end_line: chunk_id as u64,
                num_reducers: 2,
            },
        )
    }

    fn reduce_task(partition_id: u32) -> Task {
        Task::reduce(
            "job-1",
            ReduceTaskData {
                partition_id,
                intermediate_urls: vec![],
            },
        )
    }

    fn submit(registry: &TaskRegistry, task_id: &str, success: bool) -> TaskStatus {
        registry
            .submit_result(&TaskSubmission {
                task_id: task_id.to_string(),
                worker_id: "w".to_string(),
                success,
                error_message: (!success).then(|| "falló".to_string()),
                records_processed: 1,
            })
            .unwrap()
    }

    const BOTH: &[TaskType] = &[TaskType::Map, TaskType::Reduce];

    #[test]
    fn empty_registry_has_no_task_available() {
        let registry = TaskRegistry::new("job-1");
        assert_eq!(registry.request_assignment("w1", BOTH).unwrap(), None);
        // igual el worker queda registrado
        assert_eq!(registry.status().unwrap().active_workers, 1);
    }

    #[test]
    fn assignment_stamps_worker_and_time() {
        let registry = TaskRegistry::new("job-1");
        registry.register(vec![map_task(0)]).unwrap();

        let task = registry.request_assignment("w1", BOTH).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.assigned_worker.as_deref(), Some("w1"));
        assert!(task.assigned_at.is_some());

        let stored = registry.task("map_0").unwrap().unwrap();
        assert_eq!(stored, task);
        assert_eq!(registry.request_assignment("w2", BOTH).unwrap(), None);
    }

    #[test]
    fn map_tasks_are_handed_out_before_reduce_tasks() {
        let registry = TaskRegistry::new("job-1");
        registry.register(vec![reduce_task(0), reduce_task(1)]).unwrap();
        registry.register(vec![map_task(0), map_task(1)]).unwrap();

        let ids: Vec<String> = (0..4)
            .map(|_| registry.request_assignment("w", BOTH).unwrap().unwrap().id)
            .collect();
        assert_eq!(ids, vec!["map_0", "map_1", "reduce_0", "reduce_1"]);
    }

    #[test]
    fn assignment_respects_supported_types() {
        let registry = TaskRegistry::new("job-1");
        registry.register(vec![map_task(0), reduce_task(0)]).unwrap();

        let t = registry
            .request_assignment("reducer-only", &[TaskType::Reduce])
            .unwrap()
            .unwrap();
        assert_eq!(t.id, "reduce_0");
        assert_eq!(registry.request_assignment("nobody", &[]).unwrap(), None);
    }

    #[test]
    fn concurrent_requests_never_share_a_task() {
        let registry = Arc::new(TaskRegistry::new("job-1"));
        registry.register(vec![map_task(0)]).unwrap();

        let n = 16;
        let barrier = Arc::new(Barrier::new(n));
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry
                        .request_assignment(&format!("w{i}"), BOTH)
                        .unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Option::is_some)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(registry.status().unwrap().active_workers, n);
    }

    #[test]
    fn concurrent_requests_drain_every_task_exactly_once() {
        let registry = Arc::new(TaskRegistry::new("job-1"));
        registry
            .register((0..50).map(map_task).collect())
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let mut mine = Vec::new();
                    let worker_id = format!("w{i}");
                    while let Some(t) = registry.request_assignment(&worker_id, BOTH).unwrap() {
                        mine.push(t.id);
                    }
                    mine
                })
            })
            .collect();

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        let before = all.len();
        all.dedup();
        assert_eq!(before, 50);
        assert_eq!(all.len(), 50);
    }

    #[test]
    fn submit_result_moves_task_to_terminal_state() {
        let registry = TaskRegistry::new("job-1");
        registry.register(vec![map_task(0), map_task(1)]).unwrap();
        registry.request_assignment("w1", BOTH).unwrap();
        registry.request_assignment("w1", BOTH).unwrap();

        assert_eq!(submit(&registry, "map_0", true), TaskStatus::Completed);
        assert_eq!(submit(&registry, "map_1", false), TaskStatus::Failed);

        let failed = registry.task("map_1").unwrap().unwrap();
        assert_eq!(failed.error_message.as_deref(), Some("falló"));
        assert!(failed.completed_at.is_some());

        // un reporte tardío no cambia un estado terminal
        assert_eq!(submit(&registry, "map_1", true), TaskStatus::Failed);
    }

    #[test]
    fn submit_for_unknown_task_is_rejected_without_side_effects() {
        let registry = TaskRegistry::new("job-1");
        registry.register(vec![map_task(0)]).unwrap();

        let err = registry
            .submit_result(&TaskSubmission {
                task_id: "map_99".into(),
                worker_id: "w1".into(),
                success: true,
                error_message: None,
                records_processed: 0,
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownTask("map_99".into()));

        let st = registry.status().unwrap();
        assert_eq!((st.total_tasks, st.completed_tasks), (1, 0));
    }

    #[test]
    fn heartbeat_creates_and_updates_worker_records() {
        let registry = TaskRegistry::new("job-1");
        let mut hb = WorkerHeartbeat {
            worker_id: "w1".into(),
            status: "idle".into(),
            current_task_count: 0,
            timestamp: Utc::now(),
        };
        registry.heartbeat(&hb).unwrap();
        hb.status = "busy".into();
        hb.current_task_count = 1;
        registry.heartbeat(&hb).unwrap();

        let workers = registry.workers().unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].status, "busy");
        assert_eq!(workers[0].current_task_count, 1);
    }

    #[test]
    fn status_counts_every_state() {
        let registry = TaskRegistry::new("job-1");
        registry.register((0..4).map(map_task).collect()).unwrap();
        for _ in 0..3 {
            registry.request_assignment("w1", BOTH).unwrap();
        }
        submit(&registry, "map_0", true);
        submit(&registry, "map_1", false);

        let st = registry.status().unwrap();
        assert_eq!(st.job_id, "job-1");
        assert_eq!(st.total_tasks, 4);
        assert_eq!(st.completed_tasks, 1);
        assert_eq!(st.failed_tasks, 1);
        assert_eq!(st.running_tasks, 1);
        assert_eq!(st.pending_tasks(), 1);
        assert!(!st.is_complete);
    }

    #[test]
    fn all_map_tasks_complete_requires_at_least_one_map() {
        let registry = TaskRegistry::new("job-1");
        assert!(!registry.all_map_tasks_complete().unwrap());

        registry.register(vec![map_task(0), map_task(1)]).unwrap();
        registry.request_assignment("w", BOTH).unwrap();
        registry.request_assignment("w", BOTH).unwrap();
        submit(&registry, "map_0", true);
        assert!(!registry.all_map_tasks_complete().unwrap());

        submit(&registry, "map_1", true);
        assert!(registry.all_map_tasks_complete().unwrap());
    }

    #[test]
    fn a_failed_map_blocks_the_reduce_phase_forever() {
        let registry = TaskRegistry::new("job-1");
        registry.register((0..3).map(map_task).collect()).unwrap();
        for _ in 0..3 {
            registry.request_assignment("w", BOTH).unwrap();
        }
        submit(&registry, "map_0", true);
        submit(&registry, "map_1", false);
        submit(&registry, "map_2", true);

        assert!(!registry.all_map_tasks_complete().unwrap());
        // el job igual termina (todas las tareas son terminales), con fallas
        let st = registry.status().unwrap();
        assert!(st.is_complete);
        assert_eq!(st.failed_tasks, 1);
    }

    #[test]
    fn intermediate_locations_only_list_completed_maps() {
        let registry = TaskRegistry::new("job-1");
        registry.register((0..3).map(map_task).collect()).unwrap();
        for _ in 0..3 {
            registry.request_assignment("w", BOTH).unwrap();
        }
        submit(&registry, "map_2", true);
        submit(&registry, "map_0", true);
        submit(&registry, "map_1", false);

        let locs = registry.intermediate_locations(1).unwrap();
        assert_eq!(
            locs,
            vec![
                IntermediateLocation::for_partition("job-1", 0, 1),
                IntermediateLocation::for_partition("job-1", 2, 1),
            ]
        );
    }

    #[test]
    fn duplicate_ids_overwrite_previous_entry() {
        let registry = TaskRegistry::new("job-1");
        registry.register(vec![map_task(0)]).unwrap();
        registry.request_assignment("w", BOTH).unwrap();
        registry.register(vec![map_task(0)]).unwrap();

        assert_eq!(registry.status().unwrap().total_tasks, 1);
        assert_eq!(
            registry.task("map_0").unwrap().unwrap().status,
            TaskStatus::Pending
        );
    }
}
