// master/src/state.rs

use std::{path::PathBuf, sync::Arc};

use crate::registry::TaskRegistry;

/// Estado compartido por los handlers HTTP. El registry se inyecta al
/// construir el router.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    /// Raíz desde donde el file server sirve `<job_id>/<task_dir>/<file>`
    pub files_root: PathBuf,
}

impl AppState {
    pub fn new(registry: Arc<TaskRegistry>, files_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            files_root: files_root.into(),
        }
    }
}
