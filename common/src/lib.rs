//! Tipos y primitivas compartidas por master, worker y CLI.

pub mod engine;
pub mod error;
pub mod functions;
pub mod job;
pub mod layout;
pub mod local;
pub mod results;
pub mod shuffle;
pub mod splitter;
pub mod task;
pub mod wordcount;
pub mod worker;

pub use error::{Error, Result};
pub use functions::{KeyValue, Mapper, Reducer, Workload};
pub use job::{default_work_dir, JobConfig, JobId, JobStatus};
pub use layout::{IntermediateLocation, JobLayout};
pub use results::RunSummary;
pub use splitter::{InputChunk, InputSplitter};
pub use task::{MapTaskData, ReduceTaskData, Task, TaskId, TaskPayload, TaskStatus, TaskType};
pub use worker::{
    Ack, TaskRequest, TaskSubmission, WorkerHeartbeat, WorkerId, WorkerInfo, WORKER_STATUS_IDLE,
};
