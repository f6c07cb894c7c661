//! Modos de ejecución en un solo proceso: secuencial y paralelo.
//!
//! No hay registry ni red; el modo paralelo reutiliza las mismas primitivas
//! de `engine` que el worker distribuido, con archivos intermedios locales.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    thread,
    time::Instant,
};

use tracing::{info, warn};

use crate::engine::{merge_outputs, read_partition, run_map, run_reduce};
use crate::error::{Error, Result};
use crate::functions::Workload;
use crate::layout::{ensure_dir, JobLayout};
use crate::results::RunSummary;
use crate::splitter::{InputChunk, InputSplitter};
use crate::task::MapTaskData;

/// Todo en memoria: map de cada línea, agrupado, reduce y escritura
/// ordenada por clave.
pub fn run_sequential(input: &Path, output: &Path, workload: &Workload) -> Result<RunSummary> {
    if !input.is_file() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }
    let started = Instant::now();

    let reader = BufReader::new(File::open(input).map_err(|e| Error::io(input, e))?);
    let mut intermediate = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(input, e))?;
        let pairs = workload
            .mapper
            .map(&n.to_string(), &line)
            .map_err(|e| Error::Map {
                line: n as u64,
                message: format!("{e:#}"),
            })?;
        intermediate.extend(pairs);
    }
    let intermediate_records = intermediate.len() as u64;
    info!("map secuencial: {} registros intermedios", intermediate_records);

    let output_records = run_reduce(intermediate, workload.reducer.as_ref(), output)?;

    Ok(RunSummary {
        map_tasks: 1,
        reduce_tasks: 1,
        intermediate_records,
        output_records,
        output_path: output.to_path_buf(),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/// Split en chunks, un map por chunk en paralelo, un reduce por partición en
/// paralelo y merge final en orden de partición.
///
/// Los archivos intermedios van a un directorio temporal bajo `scratch_root`
/// que se borra al terminar.
pub fn run_parallel(
    input: &Path,
    output: &Path,
    workload: &Workload,
    num_reducers: u32,
    chunk_size_bytes: usize,
    scratch_root: &Path,
) -> Result<RunSummary> {
    if num_reducers == 0 {
        return Err(Error::InvalidConfig(
            "num_reducers debe ser >= 1".to_string(),
        ));
    }
    let started = Instant::now();

    let chunks = InputSplitter::new(chunk_size_bytes).split_file(input)?;
    info!("input dividido en {} chunks", chunks.len());

    let run_id = format!("local_{}", uuid::Uuid::new_v4());
    let layout = JobLayout::new(scratch_root, &run_id);
    ensure_dir(layout.job_dir())?;

    let result = run_parallel_in(&layout, chunks, output, workload, num_reducers);

    if let Err(e) = std::fs::remove_dir_all(layout.job_dir()) {
        warn!(
            "no se pudo borrar el directorio temporal {}: {}",
            layout.job_dir().display(),
            e
        );
    }

    let (map_tasks, intermediate_records, output_records) = result?;
    Ok(RunSummary {
        map_tasks,
        reduce_tasks: num_reducers as usize,
        intermediate_records,
        output_records,
        output_path: output.to_path_buf(),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

fn run_parallel_in(
    layout: &JobLayout,
    chunks: Vec<InputChunk>,
    output: &Path,
    workload: &Workload,
    num_reducers: u32,
) -> Result<(usize, u64, u64)> {
    let map_data: Vec<MapTaskData> = chunks
        .into_iter()
        .map(|c| MapTaskData {
            chunk_id: c.chunk_id,
            lines: c.lines,
            start_line: c.start_line,
            end_line: c.end_line,
            num_reducers,
        })
        .collect();

    // Fase map
    let map_results: Vec<Result<u64>> = thread::scope(|s| {
        let handles: Vec<_> = map_data
            .iter()
            .map(|data| {
                let out_dir = layout.map_task_dir(data.chunk_id);
                let mapper = workload.mapper.as_ref();
                s.spawn(move || run_map(data, mapper, &out_dir))
            })
            .collect();
        handles.into_iter().map(join_scoped).collect()
    });
    let mut intermediate_records = 0;
    for r in map_results {
        intermediate_records += r?;
    }
    info!(
        "fase map completa: {} registros intermedios",
        intermediate_records
    );

    // Fase reduce: la partición p lee partition_p de cada chunk
    let chunk_ids: Vec<u32> = map_data.iter().map(|d| d.chunk_id).collect();
    let reduce_results: Vec<Result<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_reducers)
            .map(|pid| {
                let inputs: Vec<PathBuf> = chunk_ids
                    .iter()
                    .map(|&cid| layout.partition_path(cid, pid))
                    .collect();
                let out = layout.reduce_output_path(pid);
                let reducer = workload.reducer.as_ref();
                s.spawn(move || -> Result<u64> {
                    let mut pairs = Vec::new();
                    for path in &inputs {
                        pairs.extend(read_partition(path)?);
                    }
                    run_reduce(pairs, reducer, &out)
                })
            })
            .collect();
        handles.into_iter().map(join_scoped).collect()
    });
    for r in reduce_results {
        r?;
    }

    let output_records = merge_outputs(
        (0..num_reducers).map(|pid| layout.reduce_output_path(pid)),
        output,
    )?;
    info!(
        "salida escrita en {}: {} registros",
        output.display(),
        output_records
    );

    Ok((map_data.len(), intermediate_records, output_records))
}

fn join_scoped<T>(handle: thread::ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle.join().unwrap_or_else(|panic| {
        let msg = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic sin mensaje".to_string());
        Err(Error::Panicked(msg))
    })
}
