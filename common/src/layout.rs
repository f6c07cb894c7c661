//! Layout en disco de un job:
//!
//! ```text
//! <work_dir>/<job_id>/map_task_<chunk>/partition_<p>.txt
//! <work_dir>/<job_id>/reduce_task_<p>/output.txt
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::job::JobId;

pub const REDUCE_OUTPUT_FILE: &str = "output.txt";

pub fn map_task_dir_name(chunk_id: u32) -> String {
    format!("map_task_{}", chunk_id)
}

pub fn reduce_task_dir_name(partition_id: u32) -> String {
    format!("reduce_task_{}", partition_id)
}

pub fn partition_file_name(partition_id: u32) -> String {
    format!("partition_{}.txt", partition_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    job_dir: PathBuf,
}

impl JobLayout {
    pub fn new(work_dir: impl AsRef<Path>, job_id: &str) -> Self {
        Self {
            job_dir: work_dir.as_ref().join(job_id),
        }
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn map_task_dir(&self, chunk_id: u32) -> PathBuf {
        self.job_dir.join(map_task_dir_name(chunk_id))
    }

    pub fn partition_path(&self, chunk_id: u32, partition_id: u32) -> PathBuf {
        self.map_task_dir(chunk_id)
            .join(partition_file_name(partition_id))
    }

    pub fn reduce_output_path(&self, partition_id: u32) -> PathBuf {
        self.job_dir
            .join(reduce_task_dir_name(partition_id))
            .join(REDUCE_OUTPUT_FILE)
    }
}

/// Ubicación lógica de un archivo intermedio, tal como lo expone el file server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntermediateLocation {
    pub job_id: JobId,
    pub task_dir: String,
    pub file_name: String,
}

impl IntermediateLocation {
    pub fn for_partition(job_id: &str, chunk_id: u32, partition_id: u32) -> Self {
        Self {
            job_id: job_id.to_string(),
            task_dir: map_task_dir_name(chunk_id),
            file_name: partition_file_name(partition_id),
        }
    }

    /// `<base_url>/files/<job_id>/<task_dir>/<file_name>`
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/files/{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.job_id,
            self.task_dir,
            self.file_name
        )
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Un segmento de ruta es seguro si no puede escapar de su directorio padre.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}
