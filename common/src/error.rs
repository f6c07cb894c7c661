use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errores de la capa común (splitter, ejecución de map/reduce, layout).
#[derive(Debug, Error)]
pub enum Error {
    #[error("no existe el archivo de entrada: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("configuración inválida: {0}")]
    InvalidConfig(String),

    #[error("error de I/O en {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("la función map falló en la línea {line}: {message}")]
    Map { line: u64, message: String },

    #[error("la función reduce falló para la clave `{key}`: {message}")]
    Reduce { key: String, message: String },

    #[error("un hilo de ejecución terminó en panic: {0}")]
    Panicked(String),
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
