use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resumen de una ejecución local (sequential / parallel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    /// Pares clave/valor emitidos por los maps
    pub intermediate_records: u64,
    /// Líneas escritas en el archivo final
    pub output_records: u64,
    pub output_path: PathBuf,
    pub elapsed_ms: u128,
}
