//! Capacidades que una aplicación MapReduce tiene que aportar.
//!
//! Los mismos objetos se inyectan en los modos locales y en el worker
//! distribuido.

use std::sync::Arc;

use crate::wordcount::{CountReducer, WordCountMapper};

pub type KeyValue = (String, String);

pub trait Mapper: Send + Sync {
    /// `key` es el número de línea, `value` el contenido de la línea.
    fn map(&self, key: &str, value: &str) -> anyhow::Result<Vec<KeyValue>>;
}

pub trait Reducer: Send + Sync {
    fn reduce(&self, key: &str, values: &[String]) -> anyhow::Result<String>;
}

/// Un par mapper + reducer listo para compartir entre hilos.
#[derive(Clone)]
pub struct Workload {
    pub mapper: Arc<dyn Mapper>,
    pub reducer: Arc<dyn Reducer>,
}

impl Workload {
    pub fn new(mapper: impl Mapper + 'static, reducer: impl Reducer + 'static) -> Self {
        Self {
            mapper: Arc::new(mapper),
            reducer: Arc::new(reducer),
        }
    }

    pub fn word_count() -> Self {
        Self::new(WordCountMapper, CountReducer)
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::word_count()
    }
}

impl std::fmt::Debug for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workload").finish_non_exhaustive()
    }
}
