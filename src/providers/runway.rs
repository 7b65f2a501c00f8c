//! Runway text-to-video adapter
//!
//! Static bearer token plus a mandatory `X-Runway-Version` header. Jobs are
//! tasks: `POST /v1/text_to_video` returns `{"id": ...}` and
//! `GET /v1/tasks/{id}` reports the task state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ProviderContext, VideoProvider, artifact, clamp_duration, id_value, job_url, read_json};
use crate::config::ProviderConfig;
use crate::credentials::{CredentialProvider, StaticCredentials};
use crate::error::{Error, Result};
use crate::types::{JobHandle, JobSpec, JobStatus, ProviderKey, StatusReport};

/// API version sent when none is configured
pub const DEFAULT_API_VERSION: &str = "2024-11-06";

const VERSION_HEADER: &str = "X-Runway-Version";

/// Runway adapter
pub struct RunwayProvider {
    name: String,
    endpoint: String,
    model: String,
    max_duration: Option<u32>,
    credentials: Arc<dyn CredentialProvider>,
    context: ProviderContext,
}

impl RunwayProvider {
    /// Build the adapter; fails when the api key is missing
    pub fn new(config: &ProviderConfig, context: ProviderContext) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config("Runway requires api_key", "api_key"))?;
        let version = config.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION);
        let credentials = StaticCredentials::new(api_key)?.with_header(VERSION_HEADER, Some(version));

        Ok(Self {
            name: config.name.clone(),
            endpoint: config.endpoint_or_default(ProviderKey::Runway).to_string(),
            model: config.model_or_default(ProviderKey::Runway).to_string(),
            max_duration: config.max_duration,
            credentials: Arc::new(credentials),
            context,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextToVideoRequest<'a> {
    model: &'a str,
    prompt_text: &'a str,
    ratio: &'a str,
    duration: u32,
}

#[derive(Debug, Deserialize)]
struct TaskCreated {
    id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Task {
    status: Option<String>,
    #[serde(default)]
    output: Vec<String>,
    failure: Option<String>,
}

/// Runway expects output resolutions rather than aspect ratios
pub(crate) fn resolution_for(aspect_ratio: &str) -> &str {
    match aspect_ratio {
        "16:9" => "1280:720",
        "9:16" => "720:1280",
        "1:1" => "960:960",
        other => other,
    }
}

/// Map Runway's task status vocabulary
pub(crate) fn map_status(raw: &str) -> JobStatus {
    match raw {
        "PENDING" | "THROTTLED" => JobStatus::Submitted,
        "RUNNING" => JobStatus::Processing,
        "SUCCEEDED" => JobStatus::Succeeded,
        "FAILED" | "CANCELLED" => JobStatus::Failed,
        _ => JobStatus::Unknown,
    }
}

#[async_trait]
impl VideoProvider for RunwayProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::Runway
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn client(&self) -> &reqwest::Client {
        &self.context.client
    }

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        let body = TextToVideoRequest {
            model: spec.model.as_deref().unwrap_or(&self.model),
            prompt_text: &spec.prompt,
            ratio: resolution_for(&spec.aspect_ratio),
            duration: clamp_duration(self.key(), spec.duration_secs, self.max_duration),
        };
        if spec.negative_prompt.is_some() {
            tracing::debug!(provider = %self.key(), "negative prompt is not supported, ignoring");
        }
        let url = format!("{}/v1/text_to_video", self.endpoint);
        tracing::info!(provider = %self.key(), url = %url, model = body.model, "submitting video job");

        let credential = self.credentials.obtain()?;
        let response = credential
            .authorize(self.context.client.post(&url))
            .timeout(self.context.request_timeout)
            .json(&body)
            .send()
            .await?;

        let created: TaskCreated = read_json(response).await?;
        let id = id_value(created.id.as_ref())
            .ok_or_else(|| Error::Protocol("could not obtain job id".to_string()))?;

        Ok(JobHandle::new(self.key(), id))
    }

    async fn query_status(&self, handle: &JobHandle) -> Result<StatusReport> {
        self.check_handle(handle)?;
        let url = job_url(&self.endpoint, "/v1/tasks", &handle.id)?;

        let credential = self.credentials.obtain()?;
        let response = credential
            .authorize(self.context.client.get(url))
            .timeout(self.context.request_timeout)
            .send()
            .await?;

        let task: Task = read_json(response).await?;
        let raw_status = task.status.unwrap_or_default();
        let status = map_status(&raw_status);
        let message = task.failure.or_else(|| {
            (raw_status == "CANCELLED").then(|| "task was cancelled".to_string())
        });

        super::report_with_artifact(status, raw_status, message, || {
            artifact(task.output.first().map(String::as_str), None)
        })
    }
}
