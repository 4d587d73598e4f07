use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;

use super::{GeneratedVideo, VideoGenerator};
use crate::common::progress::create_percent_bar;
use crate::config::AppSection;
use crate::error::MakerError;
use crate::ui::prelude::{Level, emit};
use crate::video::params::VideoParams;

const PROVIDER: &str = "video service";
/// Upper bound for one API call; a stalled poll counts as a failed attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Downloads may be long but must keep receiving data.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Response envelope shared by every endpoint of the service.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedTask {
    pub task_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub state: Option<i64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub videos: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Complete,
    Failed,
    Processing,
}

impl TaskStatus {
    pub fn state(&self) -> TaskState {
        match self.state {
            Some(1) => TaskState::Complete,
            Some(-1) => TaskState::Failed,
            _ => TaskState::Processing,
        }
    }
}

pub struct ApiVideoGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    poll_interval: Duration,
    timeout: Duration,
}

impl ApiVideoGenerator {
    pub fn from_config(app: &AppSection) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .read_timeout(READ_TIMEOUT)
            .build()
            .context("building HTTP client for the video service")?;
        Ok(Self {
            client,
            endpoint: app.generator_endpoint.trim_end_matches('/').to_string(),
            api_key: app.api_key().map(str::to_string),
            poll_interval: Duration::from_secs(app.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(app.generator_timeout_secs.max(1)),
        })
    }

    fn with_headers(&self, builder: RequestBuilder, task_id: &str) -> RequestBuilder {
        let builder = builder
            .timeout(REQUEST_TIMEOUT)
            .header("x-task-id", task_id);
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    async fn create_task(&self, task_id: &str, params: &VideoParams) -> Result<String> {
        let url = format!("{}/api/v1/videos", self.endpoint);
        emit(
            Level::Debug,
            "generator.request",
            &format!("POST {url}"),
            Some(json!({ "task_id": task_id })),
        );

        let resp = self
            .with_headers(self.client.post(&url), task_id)
            .json(params)
            .send()
            .await
            .with_context(|| format!("Failed to connect to video service at {}", self.endpoint))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(MakerError::provider(PROVIDER, format!("HTTP {status}: {text}")).into());
        }

        let envelope: Envelope<CreatedTask> = resp
            .json()
            .await
            .context("Failed to parse video service response")?;
        let created = envelope.data.ok_or_else(|| {
            MakerError::provider(
                PROVIDER,
                envelope
                    .message
                    .unwrap_or_else(|| "response has no task id".to_string()),
            )
        })?;
        Ok(created.task_id)
    }

    async fn wait_for_task(&self, remote_id: &str, task_id: &str) -> Result<TaskStatus> {
        let url = format!(
            "{}/api/v1/tasks/{}",
            self.endpoint,
            urlencoding::encode(remote_id)
        );
        let started = Instant::now();
        let pb = create_percent_bar(format!("task {task_id}"));

        let result: Result<TaskStatus> = loop {
            if started.elapsed() > self.timeout {
                break Err(MakerError::provider(
                    PROVIDER,
                    format!(
                        "task {remote_id} did not finish within {}s",
                        self.timeout.as_secs()
                    ),
                )
                .into());
            }

            let status = match self.fetch_status(&url, task_id).await {
                Ok(status) => status,
                Err(err) => {
                    emit(
                        Level::Warn,
                        "generator.status",
                        &format!("Failed to check task status, retrying: {err:#}"),
                        None,
                    );
                    sleep(self.poll_interval).await;
                    continue;
                }
            };

            if let Some(progress) = status.progress {
                pb.set_position(progress.clamp(0.0, 100.0) as u64);
            }

            match status.state() {
                TaskState::Complete => break Ok(status),
                TaskState::Failed => {
                    break Err(MakerError::provider(
                        PROVIDER,
                        format!("task {remote_id} failed"),
                    )
                    .into());
                }
                TaskState::Processing => sleep(self.poll_interval).await,
            }
        };

        pb.finish_and_clear();
        result
    }

    async fn fetch_status(&self, url: &str, task_id: &str) -> Result<TaskStatus> {
        let resp = self
            .with_headers(self.client.get(url), task_id)
            .send()
            .await
            .context("Failed to reach video service")?;

        if !resp.status().is_success() {
            anyhow::bail!("HTTP {}", resp.status());
        }

        let envelope: Envelope<TaskStatus> = resp
            .json()
            .await
            .context("Failed to parse task status")?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn download(&self, url: &str, output_path: &Path) -> Result<()> {
        emit(
            Level::Debug,
            "generator.download",
            &format!("Downloading {url}"),
            None,
        );

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {url}"))?;

        if !resp.status().is_success() {
            return Err(MakerError::provider(
                PROVIDER,
                format!("download of {url} failed with HTTP {}", resp.status()),
            )
            .into());
        }

        let mut file = tokio::fs::File::create(output_path)
            .await
            .with_context(|| format!("creating {}", output_path.display()))?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("reading {url}"))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("writing {}", output_path.display()))?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Absolute URLs pass through; anything else is joined onto the service endpoint.
pub fn resolve_video_url(endpoint: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl VideoGenerator for ApiVideoGenerator {
    async fn generate(
        &self,
        task_id: &str,
        params: &VideoParams,
        output_dir: &Path,
    ) -> Result<GeneratedVideo> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("creating task directory {}", output_dir.display()))?;

        let run = async {
            let remote_id = self.create_task(task_id, params).await?;
            emit(
                Level::Info,
                "generator.started",
                &format!("Task {remote_id} started for \"{}\"", params.video_subject),
                Some(json!({ "task_id": task_id, "remote_task_id": remote_id })),
            );
            let status = self.wait_for_task(&remote_id, task_id).await?;
            Ok::<_, anyhow::Error>((remote_id, status))
        };
        let (remote_id, status) = match tokio::time::timeout(self.timeout, run).await {
            Ok(finished) => finished?,
            Err(_) => {
                return Err(MakerError::provider(
                    PROVIDER,
                    format!(
                        "task {task_id} did not finish within {}s",
                        self.timeout.as_secs()
                    ),
                )
                .into());
            }
        };
        if status.videos.is_empty() {
            return Err(MakerError::provider(
                PROVIDER,
                format!("task {remote_id} finished without videos"),
            )
            .into());
        }

        let mut videos: Vec<PathBuf> = Vec::with_capacity(status.videos.len());
        for (index, url) in status.videos.iter().enumerate() {
            let target = output_dir.join(format!("final-{}.mp4", index + 1));
            self.download(&resolve_video_url(&self.endpoint, url), &target)
                .await?;
            videos.push(target);
        }

        Ok(GeneratedVideo {
            task_id: task_id.to_string(),
            videos,
        })
    }
}
