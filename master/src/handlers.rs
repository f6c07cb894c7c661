use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use mr_common::{
    layout::is_safe_segment, Ack, JobStatus, TaskRequest, TaskSubmission, WorkerHeartbeat,
    WorkerInfo,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::registry::RegistryError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/master/request-task", post(request_task))
        .route("/api/master/submit-task", post(submit_task))
        .route("/api/master/heartbeat", post(heartbeat))
        .route("/api/master/status", get(job_status))
        .route("/api/master/workers", get(list_workers))
        .route("/files/:job_id/:task_dir/:file_name", get(get_file))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Error de la API: rechaza el pedido sin tocar el estado del registry.
#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    BadPath(String),
    NotFound(String),
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError::Registry(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Registry(e @ RegistryError::UnknownTask(_)) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ApiError::Registry(e @ RegistryError::Poisoned(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::BadPath(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, msg).into_response()
    }
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Devuelve la próxima tarea Pending o 204 si no hay
async fn request_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Response, ApiError> {
    match state
        .registry
        .request_assignment(&req.worker_id, &req.supported_types)?
    {
        Some(task) => Ok(Json(task).into_response()),
        None => {
            debug!("worker {} pidió tarea pero no hay", req.worker_id);
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

async fn submit_task(
    State(state): State<AppState>,
    Json(req): Json<TaskSubmission>,
) -> Result<Json<Ack>, ApiError> {
    state.registry.submit_result(&req)?;
    Ok(Json(Ack { ok: true }))
}

async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<WorkerHeartbeat>,
) -> Result<Json<Ack>, ApiError> {
    let lag_ms = (Utc::now() - req.timestamp).num_milliseconds();
    debug!(
        "heartbeat de {} ({}, {} tareas, {}ms de retraso)",
        req.worker_id, req.status, req.current_task_count, lag_ms
    );
    state.registry.heartbeat(&req)?;
    Ok(Json(Ack { ok: true }))
}

async fn job_status(State(state): State<AppState>) -> Result<Json<JobStatus>, ApiError> {
    let status = state.registry.status()?;
    info!(
        "status: {}/{} completadas | corriendo: {} | fallidas: {} | completo: {}",
        status.completed_tasks,
        status.total_tasks,
        status.running_tasks,
        status.failed_tasks,
        status.is_complete
    );
    Ok(Json(status))
}

async fn list_workers(State(state): State<AppState>) -> Result<Json<Vec<WorkerInfo>>, ApiError> {
    Ok(Json(state.registry.workers()?))
}

// Sirve un archivo intermedio: <files_root>/<job_id>/<task_dir>/<file_name>
async fn get_file(
    State(state): State<AppState>,
    Path((job_id, task_dir, file_name)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    if ![&job_id, &task_dir, &file_name]
        .iter()
        .all(|s| is_safe_segment(s))
    {
        warn!("ruta rechazada: {}/{}/{}", job_id, task_dir, file_name);
        return Err(ApiError::BadPath("segmento de ruta inválido".to_string()));
    }

    let path = state
        .files_root
        .join(&job_id)
        .join(&task_dir)
        .join(&file_name);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("sirviendo {}", path.display());
            Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                bytes,
            )
                .into_response())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("archivo no encontrado: {}", path.display());
            Err(ApiError::NotFound(format!(
                "archivo no encontrado: {job_id}/{task_dir}/{file_name}"
            )))
        }
        Err(e) => Err(ApiError::Internal(format!(
            "error leyendo {}: {}",
            path.display(),
            e
        ))),
    }
}
