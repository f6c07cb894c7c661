use std::time::Duration;

use anyhow::Context;
use mr_common::{
    Ack, JobStatus, Task, TaskRequest, TaskSubmission, WorkerHeartbeat, WorkerInfo,
};
use reqwest::{Client, StatusCode};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cliente HTTP de la API del master.
#[derive(Debug, Clone)]
pub struct MasterClient {
    http: Client,
    base_url: String,
}

impl MasterClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("no se pudo crear el cliente HTTP")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `Ok(None)` cuando el master responde 204 (no hay tareas).
    pub async fn request_task(&self, req: &TaskRequest) -> anyhow::Result<Option<Task>> {
        let resp = self
            .http
            .post(self.url("/api/master/request-task"))
            .json(req)
            .send()
            .await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let task = resp.error_for_status()?.json().await?;
        Ok(Some(task))
    }

    pub async fn submit_result(&self, submission: &TaskSubmission) -> anyhow::Result<()> {
        let _: Ack = self
            .http
            .post(self.url("/api/master/submit-task"))
            .json(submission)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(())
    }

    pub async fn heartbeat(&self, heartbeat: &WorkerHeartbeat) -> anyhow::Result<()> {
        self.http
            .post(self.url("/api/master/heartbeat"))
            .json(heartbeat)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn status(&self) -> anyhow::Result<JobStatus> {
        Ok(self
            .http
            .get(self.url("/api/master/status"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn workers(&self) -> anyhow::Result<Vec<WorkerInfo>> {
        Ok(self
            .http
            .get(self.url("/api/master/workers"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Descarga un archivo intermedio por URL absoluta.
    pub async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}
