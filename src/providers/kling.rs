//! Kling (可灵) text-to-video adapter
//!
//! Every request carries a freshly signed HS256 token. Responses are wrapped in
//! an envelope whose `code` must be 0:
//!
//! ```json
//! {"code": 0, "message": "SUCCEED", "data": {"task_id": "...", "task_status": "submitted"}}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    ProviderContext, VideoProvider, artifact, clamp_duration, duration_value, id_value, job_url,
    read_json,
};
use crate::config::ProviderConfig;
use crate::credentials::{CredentialProvider, SignedCredentials};
use crate::error::{Error, Result};
use crate::types::{JobHandle, JobSpec, JobStatus, ProviderKey, StatusReport};

const TEXT2VIDEO_PATH: &str = "/v1/videos/text2video";
const DEFAULT_CFG_SCALE: f64 = 0.5;
const DEFAULT_MODE: &str = "std";

/// Kling adapter
pub struct KlingProvider {
    name: String,
    endpoint: String,
    model: String,
    cfg_scale: f64,
    mode: String,
    max_duration: Option<u32>,
    credentials: Arc<dyn CredentialProvider>,
    context: ProviderContext,
}

impl KlingProvider {
    /// Build the adapter; fails when the access or secret key is missing
    pub fn new(config: &ProviderConfig, context: ProviderContext) -> Result<Self> {
        let access_key = config
            .access_key
            .as_deref()
            .ok_or_else(|| Error::config("Kling requires access_key", "access_key"))?;
        let secret_key = config
            .secret_key
            .as_deref()
            .ok_or_else(|| Error::config("Kling requires secret_key", "secret_key"))?;
        let credentials = SignedCredentials::new(access_key, secret_key, config.token_lifetime)?;

        Ok(Self {
            name: config.name.clone(),
            endpoint: config.endpoint_or_default(ProviderKey::Kling).to_string(),
            model: config.model_or_default(ProviderKey::Kling).to_string(),
            cfg_scale: config.cfg_scale.unwrap_or(DEFAULT_CFG_SCALE),
            mode: config.mode.clone().unwrap_or_else(|| DEFAULT_MODE.to_string()),
            max_duration: config.max_duration,
            credentials: Arc::new(credentials),
            context,
        })
    }

    /// Replace the token signer
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }
}

#[derive(Debug, Serialize)]
struct Text2VideoRequest<'a> {
    model_name: &'a str,
    prompt: &'a str,
    negative_prompt: &'a str,
    cfg_scale: f64,
    mode: &'a str,
    aspect_ratio: &'a str,
    duration: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: Option<i64>,
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap `data`, failing on a non-zero code
    fn into_data(self) -> Result<Option<T>> {
        match self.code {
            Some(0) => Ok(self.data),
            Some(code) => Err(Error::Rejected {
                code,
                message: self.message.unwrap_or_else(|| "unknown error".to_string()),
            }),
            None => Err(Error::Protocol("response envelope has no code".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskData {
    task_id: Option<serde_json::Value>,
    task_status: Option<String>,
    task_status_msg: Option<String>,
    task_result: Option<TaskResult>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskResult {
    #[serde(default)]
    videos: Vec<TaskVideo>,
}

#[derive(Debug, Deserialize)]
struct TaskVideo {
    url: Option<String>,
    duration: Option<serde_json::Value>,
}

/// Map Kling's task status vocabulary
pub(crate) fn map_status(raw: &str) -> JobStatus {
    match raw {
        "submitted" => JobStatus::Submitted,
        "processing" => JobStatus::Processing,
        "succeed" => JobStatus::Succeeded,
        "failed" => JobStatus::Failed,
        _ => JobStatus::Unknown,
    }
}

#[async_trait]
impl VideoProvider for KlingProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::Kling
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn client(&self) -> &reqwest::Client {
        &self.context.client
    }

    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        let duration = clamp_duration(self.key(), spec.duration_secs, self.max_duration);
        let body = Text2VideoRequest {
            model_name: spec.model.as_deref().unwrap_or(&self.model),
            prompt: &spec.prompt,
            negative_prompt: spec.negative_prompt.as_deref().unwrap_or_default(),
            cfg_scale: self.cfg_scale,
            mode: &self.mode,
            aspect_ratio: &spec.aspect_ratio,
            duration: duration.to_string(),
        };
        let url = format!("{}{}", self.endpoint, TEXT2VIDEO_PATH);
        tracing::info!(provider = %self.key(), url = %url, model = body.model_name, "submitting video job");

        let credential = self.credentials.obtain()?;
        let response = credential
            .authorize(self.context.client.post(&url))
            .timeout(self.context.request_timeout)
            .json(&body)
            .send()
            .await?;

        let envelope: Envelope<TaskData> = read_json(response).await?;
        let task_id = envelope
            .into_data()?
            .and_then(|data| id_value(data.task_id.as_ref()))
            .ok_or_else(|| Error::Protocol("could not obtain job id".to_string()))?;

        Ok(JobHandle::new(self.key(), task_id))
    }

    async fn query_status(&self, handle: &JobHandle) -> Result<StatusReport> {
        self.check_handle(handle)?;
        let url = job_url(&self.endpoint, TEXT2VIDEO_PATH, &handle.id)?;

        let credential = self.credentials.obtain()?;
        let response = credential
            .authorize(self.context.client.get(url))
            .timeout(self.context.request_timeout)
            .send()
            .await?;

        let envelope: Envelope<TaskData> = read_json(response).await?;
        let data = envelope
            .into_data()?
            .ok_or_else(|| Error::Protocol("status response has no data".to_string()))?;

        let raw_status = data.task_status.unwrap_or_default();
        let status = map_status(&raw_status);
        let task_result = data.task_result.unwrap_or_default();

        super::report_with_artifact(status, raw_status, data.task_status_msg, || {
            match task_result.videos.first() {
                Some(video) => artifact(video.url.as_deref(), duration_value(video.duration.as_ref())),
                None => Ok(None),
            }
        })
    }
}
