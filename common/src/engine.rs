//! Primitivas de ejecución de tareas Map y Reduce sobre disco.
//!
//! Las usan tanto el worker distribuido como los modos locales, así la
//! partición y el formato de los archivos son idénticos en todos lados.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{Error, Result};
use crate::functions::{KeyValue, Mapper, Reducer};
use crate::layout::{ensure_dir, partition_file_name};
use crate::shuffle::{format_record, group_by_key, parse_records, partition};
use crate::task::MapTaskData;

/// Ejecuta un Map sobre las líneas de un chunk.
///
/// Crea `partition_<p>.txt` para cada `p` en `[0, num_reducers)` dentro de
/// `out_dir` (aunque alguna quede vacía) y devuelve la cantidad de pares
/// emitidos. Al volver, todos los archivos están flusheados y cerrados.
pub fn run_map(data: &MapTaskData, mapper: &dyn Mapper, out_dir: &Path) -> Result<u64> {
    if data.num_reducers == 0 {
        return Err(Error::InvalidConfig(
            "num_reducers debe ser >= 1".to_string(),
        ));
    }
    ensure_dir(out_dir)?;

    let mut writers: Vec<(PathBuf, BufWriter<File>)> =
        Vec::with_capacity(data.num_reducers as usize);
    for pid in 0..data.num_reducers {
        let path = out_dir.join(partition_file_name(pid));
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        writers.push((path, BufWriter::new(file)));
    }

    let mut emitted: u64 = 0;
    for (offset, line) in data.lines.iter().enumerate() {
        let line_number = data.start_line + offset as u64;
        let pairs = mapper
            .map(&line_number.to_string(), line)
            .map_err(|e| Error::Map {
                line: line_number,
                message: format!("{e:#}"),
            })?;

        for (key, value) in pairs {
            let pid = partition(&key, data.num_reducers) as usize;
            let (path, writer) = &mut writers[pid];
            writeln!(writer, "{}", format_record(&key, &value))
                .map_err(|e| Error::io(&*path, e))?;
            emitted += 1;
        }
    }

    for (path, mut writer) in writers {
        writer.flush().map_err(|e| Error::io(&path, e))?;
    }

    debug!(
        "map chunk {} -> {} registros en {}",
        data.chunk_id,
        emitted,
        out_dir.display()
    );
    Ok(emitted)
}

/// Lee un archivo intermedio local. Las líneas mal formadas se descartan.
pub fn read_partition(path: &Path) -> Result<Vec<KeyValue>> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(parse_records(&content))
}

/// Agrupa los pares por clave, aplica el reducer a cada grupo en orden
/// lexicográfico de clave y escribe `clave<TAB>valor` en `output_file`.
pub fn run_reduce(
    pairs: Vec<KeyValue>,
    reducer: &dyn Reducer,
    output_file: &Path,
) -> Result<u64> {
    if let Some(parent) = output_file.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let groups = group_by_key(pairs);
    let file = File::create(output_file).map_err(|e| Error::io(output_file, e))?;
    let mut writer = BufWriter::new(file);

    let mut emitted: u64 = 0;
    for (key, values) in groups {
        let reduced = reducer.reduce(&key, &values).map_err(|e| Error::Reduce {
            key: key.clone(),
            message: format!("{e:#}"),
        })?;
        writeln!(writer, "{}", format_record(&key, &reduced))
            .map_err(|e| Error::io(output_file, e))?;
        emitted += 1;
    }

    writer.flush().map_err(|e| Error::io(output_file, e))?;
    Ok(emitted)
}

/// Concatena, en el orden dado, las líneas de cada archivo de entrada en
/// `output`. Los archivos que no existen se saltean (partición vacía).
pub fn merge_outputs<I, P>(inputs: I, output: &Path) -> Result<u64>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let out = File::create(output).map_err(|e| Error::io(output, e))?;
    let mut writer = BufWriter::new(out);
    let mut total: u64 = 0;

    for input in inputs {
        let input = input.as_ref();
        if !input.is_file() {
            debug!("salteando {} (no existe)", input.display());
            continue;
        }

        let reader = BufReader::new(File::open(input).map_err(|e| Error::io(input, e))?);
        let mut records: u64 = 0;
        for line in reader.lines() {
            let line = line.map_err(|e| Error::io(input, e))?;
            writeln!(writer, "{}", line).map_err(|e| Error::io(output, e))?;
            records += 1;
        }
        debug!("merge {}: {} registros", input.display(), records);
        total += records;
    }

    writer.flush().map_err(|e| Error::io(output, e))?;
    Ok(total)
}
