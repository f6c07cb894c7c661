use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mr_common::{default_work_dir, local, job::BYTES_PER_MB, RunSummary, Workload};
use mr_master::MasterArgs;
use mr_worker::{MasterClient, WorkerArgs};

#[derive(Parser)]
#[command(name = "mapreduce")]
#[command(about = "MapReduce: secuencial, paralelo o distribuido (master / worker)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Todo en un proceso, sin paralelismo
    Sequential {
        #[arg(long, default_value = "input.txt")]
        input: PathBuf,
        #[arg(long, default_value = "output.txt")]
        output: PathBuf,
    },
    /// Un proceso, maps y reduces en hilos
    Parallel {
        #[arg(long, default_value = "input.txt")]
        input: PathBuf,
        #[arg(long, default_value = "output.txt")]
        output: PathBuf,
        #[arg(long, default_value_t = 4)]
        reducers: u32,
        #[arg(long, default_value_t = 1)]
        chunk_size_mb: usize,
        /// Directorio para los archivos intermedios (default: <tmp>/mapreduce)
        #[arg(long, env = "MR_WORK_DIR")]
        work_dir: Option<PathBuf>,
    },
    /// Master distribuido
    Master(MasterArgs),
    /// Worker distribuido
    Worker(WorkerArgs),
    /// Estado del job en un master corriendo
    Status(QueryArgs),
    /// Workers conocidos por el master
    Workers(QueryArgs),
}

#[derive(Args)]
pub struct QueryArgs {
    #[arg(long, env = "MASTER_URL", default_value = "http://localhost:5000")]
    pub master_url: String,

    /// Imprimir la respuesta cruda en JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sequential { input, output } => {
            let summary = local::run_sequential(&input, &output, &Workload::word_count())?;
            print_summary("secuencial", &summary);
        }
        Commands::Parallel {
            input,
            output,
            reducers,
            chunk_size_mb,
            work_dir,
        } => {
            let scratch = work_dir.unwrap_or_else(default_work_dir);
            let summary = local::run_parallel(
                &input,
                &output,
                &Workload::word_count(),
                reducers,
                chunk_size_mb.saturating_mul(BYTES_PER_MB),
                &scratch,
            )?;
            print_summary("paralelo", &summary);
        }
        Commands::Master(args) => mr_master::run(args).await?,
        Commands::Worker(args) => mr_worker::run(args).await?,
        Commands::Status(q) => {
            let status = MasterClient::new(&q.master_url)?.status().await?;
            if q.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Job {}:", status.job_id);
                println!(
                    "  tareas: {} total | {} completadas | {} fallidas | {} corriendo | {} pendientes",
                    status.total_tasks,
                    status.completed_tasks,
                    status.failed_tasks,
                    status.running_tasks,
                    status.pending_tasks()
                );
                println!("  progreso: {:.1}%", status.progress_pct());
                println!("  workers activos: {}", status.active_workers);
                println!("  completo: {}", status.is_complete);
            }
        }
        Commands::Workers(q) => {
            let workers = MasterClient::new(&q.master_url)?.workers().await?;
            if q.json {
                println!("{}", serde_json::to_string_pretty(&workers)?);
            } else if workers.is_empty() {
                println!("No hay workers registrados");
            } else {
                println!("Workers:");
                for w in workers {
                    println!(
                        "  - {} | estado: {} | tareas: {} | último heartbeat: {}",
                        w.worker_id,
                        w.status,
                        w.current_task_count,
                        w.last_heartbeat.to_rfc3339()
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_summary(mode: &str, summary: &RunSummary) {
    println!("Ejecución {} terminada:", mode);
    println!(
        "  tareas: {} map / {} reduce",
        summary.map_tasks, summary.reduce_tasks
    );
    println!("  registros intermedios: {}", summary.intermediate_records);
    println!("  registros de salida: {}", summary.output_records);
    println!("  salida: {}", summary.output_path.display());
    println!("  tiempo: {} ms", summary.elapsed_ms);
}
