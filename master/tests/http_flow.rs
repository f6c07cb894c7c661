use std::{fs, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use mr_common::{
    engine, JobConfig, Task, TaskPayload, TaskRequest, TaskSubmission, TaskType, Workload,
};
use mr_master::{handlers::build_router, AppState, JobCoordinator, TaskRegistry};
use tower::ServiceExt;

const BASE: &str = "http://master.test";

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, body)
}

fn post_json<T: serde::Serialize>(uri: &str, body: &T) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn request_task(app: &Router, worker_id: &str) -> Option<Task> {
    let req = TaskRequest {
        worker_id: worker_id.into(),
        supported_types: vec![TaskType::Map, TaskType::Reduce],
    };
    let (status, body) = call(app, post_json("/api/master/request-task", &req)).await;
    match status {
        StatusCode::NO_CONTENT => None,
        StatusCode::OK => Some(serde_json::from_slice(&body).unwrap()),
        other => panic!("status inesperado {other}"),
    }
}

async fn submit(app: &Router, task_id: &str, records: u64) {
    let sub = TaskSubmission {
        task_id: task_id.into(),
        worker_id: "w1".into(),
        success: true,
        error_message: None,
        records_processed: records,
    };
    let (status, _) = call(app, post_json("/api/master/submit-task", &sub)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn map_then_reduce_through_the_api() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("input.txt");
    fs::write(&input, "a b a\nb c\n").unwrap();
    let config = JobConfig::new(
        &input,
        tmp.path().join("out.txt"),
        2,
        1,
        tmp.path().join("work"),
    );
    let layout = config.layout();

    let registry = Arc::new(TaskRegistry::new(config.job_id.clone()));
    let mut coord = JobCoordinator::new(config.clone(), registry.clone(), BASE);
    assert_eq!(coord.prepare().unwrap(), 1);
    let app = build_router(AppState::new(registry.clone(), &config.work_dir));
    let workload = Workload::word_count();

    // fase map
    let task = request_task(&app, "w1").await.unwrap();
    let TaskPayload::Map(data) = &task.payload else {
        panic!("se esperaba un map");
    };
    let out_dir = layout.map_task_dir(data.chunk_id);
    let records = engine::run_map(data, workload.mapper.as_ref(), &out_dir).unwrap();
    assert_eq!(records, 5);
    assert!(request_task(&app, "w2").await.is_none());
    submit(&app, &task.id, records).await;

    // fase reduce: cada URL se sirve desde el file server
    coord.poll().unwrap();
    let mut outputs = Vec::new();
    while let Some(task) = request_task(&app, "w1").await {
        let TaskPayload::Reduce(data) = &task.payload else {
            panic!("se esperaba un reduce");
        };
        assert_eq!(data.intermediate_urls.len(), 1);
        let path = data.intermediate_urls[0].strip_prefix(BASE).unwrap();
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let pairs = mr_common::shuffle::parse_records(&String::from_utf8(body).unwrap());
        let out = layout.reduce_output_path(data.partition_id);
        let n = engine::run_reduce(pairs, workload.reducer.as_ref(), &out).unwrap();
        submit(&app, &task.id, n).await;
        outputs.push(data.partition_id);
    }
    outputs.sort();
    assert_eq!(outputs, vec![0, 1]);

    let status = coord.poll().unwrap();
    assert!(status.is_complete);
    assert_eq!(status.failed_tasks, 0);
    assert_eq!(coord.merge_outputs().unwrap(), 3);

    let mut lines: Vec<String> = fs::read_to_string(&config.output_path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    assert_eq!(lines, vec!["a\t2", "b\t2", "c\t1"]);
}

#[tokio::test]
async fn unknown_submission_is_rejected_without_side_effects() {
    let registry = Arc::new(TaskRegistry::new("job-x"));
    let tmp = tempfile::tempdir().unwrap();
    let app = build_router(AppState::new(registry.clone(), tmp.path()));

    let sub = TaskSubmission {
        task_id: "map_0".into(),
        worker_id: "w1".into(),
        success: true,
        error_message: None,
        records_processed: 0,
    };
    let (status, _) = call(&app, post_json("/api/master/submit-task", &sub)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(registry.status().unwrap().total_tasks, 0);
}
