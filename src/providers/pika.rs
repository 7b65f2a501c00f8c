//! Pika text-to-video adapter
//!
//! Static bearer token, with optional `X-Organization` and `X-Api-Version`
//! headers when configured.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    ProviderContext, VideoProvider, artifact, clamp_duration, duration_value, id_value, job_url,
    read_json,
};
use crate::config::ProviderConfig;
use crate::credentials::{CredentialProvider, StaticCredentials};
use crate::error::{Error, Result};
use crate::types::{JobHandle, JobSpec, JobStatus, ProviderKey, StatusReport};

/// Pika adapter
pub struct PikaProvider {
    name: String,
    endpoint: String,
    model: String,
    max_duration: Option<u32>,
    credentials: Arc<dyn CredentialProvider>,
    context: ProviderContext,
}

impl PikaProvider {
    /// Build the adapter; fails when the api key is missing
    pub fn new(config: &ProviderConfig, context: ProviderContext) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config("Pika requires api_key", "api_key"))?;
        let credentials = StaticCredentials::new(api_key)?
            .with_header("X-Organization", config.organization.as_deref())
            .with_header("X-Api-Version", config.api_version.as_deref());

        Ok(Self {
            name: config.name.clone(),
            endpoint: config.endpoint_or_default(ProviderKey::Pika).to_string(),
            model: config.model_or_default(ProviderKey::Pika).to_string(),
            max_duration: config.max_duration,
            credentials: Arc::new(credentials),
            context,
        })
    }

    /// Replace the credential source
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    duration: u32,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct JobCreated {
    id: Option<serde_json::Value>,
    job_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Job {
    status: Option<String>,
    video: Option<Video>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Video {
    url: Option<String>,
    duration: Option<serde_json::Value>,
}

/// Map Pika's job status vocabulary
pub(crate) fn map_status(raw: &str) -> JobStatus {
    match raw {
        "queued" => JobStatus::Submitted,
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Succeeded,
        "failed" => JobStatus::Failed,
        _ => JobStatus::Unknown,
    }
}

#[async_trait]
impl VideoProvider for PikaProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::Pika
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn client(&self) -> &reqwest::Client {
        &self.context.client
    }

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        let body = GenerateRequest {
            model: spec.model.as_deref().unwrap_or(&self.model),
            prompt: &spec.prompt,
            negative_prompt: spec.negative_prompt.as_deref(),
            duration: clamp_duration(self.key(), spec.duration_secs, self.max_duration),
            aspect_ratio: &spec.aspect_ratio,
        };
        let url = format!("{}/v1/generate", self.endpoint);
        tracing::info!(provider = %self.key(), url = %url, model = body.model, "submitting video job");

        let credential = self.credentials.obtain()?;
        let response = credential
            .authorize(self.context.client.post(&url))
            .timeout(self.context.request_timeout)
            .json(&body)
            .send()
            .await?;

        let created: JobCreated = read_json(response).await?;
        let id = id_value(created.id.as_ref())
            .or_else(|| id_value(created.job_id.as_ref()))
            .ok_or_else(|| Error::Protocol("could not obtain job id".to_string()))?;

        Ok(JobHandle::new(self.key(), id))
    }

    async fn query_status(&self, handle: &JobHandle) -> Result<StatusReport> {
        self.check_handle(handle)?;
        let url = job_url(&self.endpoint, "/v1/jobs", &handle.id)?;

        let credential = self.credentials.obtain()?;
        let response = credential
            .authorize(self.context.client.get(url))
            .timeout(self.context.request_timeout)
            .send()
            .await?;

        let job: Job = read_json(response).await?;
        let raw_status = job.status.unwrap_or_default();
        let status = map_status(&raw_status);

        super::report_with_artifact(status, raw_status, job.error, || match &job.video {
            Some(video) => artifact(video.url.as_deref(), duration_value(video.duration.as_ref())),
            None => Ok(None),
        })
    }
}
