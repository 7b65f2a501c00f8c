//! Provider adapters
//!
//! Each adapter turns a [`JobSpec`] into its provider's submission payload,
//! and maps that provider's status vocabulary into [`JobStatus`]. Polling and
//! artifact download are shared and come with the trait.
//!
//! - [`kling`] - signed-token authentication, enveloped responses
//! - [`runway`] - static bearer token with API version header
//! - [`pika`] - static bearer token with optional organization header

pub mod kling;
pub mod pika;
pub mod runway;

pub use kling::KlingProvider;
pub use pika::PikaProvider;
pub use runway::RunwayProvider;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{HttpConfig, PollConfig};
use crate::error::{Error, Result};
use crate::fetch::fetch_artifact;
use crate::poll::poll_until_terminal;
use crate::types::{JobHandle, JobResult, JobSpec, JobStatus, ProviderKey, StatusReport};

/// HTTP resources shared by every adapter
#[derive(Clone, Debug)]
pub struct ProviderContext {
    /// Shared client (connection pool)
    pub client: reqwest::Client,
    /// Timeout for submission and status requests
    pub request_timeout: Duration,
}

impl ProviderContext {
    /// Build a client from HTTP settings
    pub fn from_config(http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout)
            .user_agent(http.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            request_timeout: http.request_timeout,
        })
    }
}

/// Uniform contract over one generative-video provider
///
/// Implementations supply [`submit`](Self::submit) and
/// [`query_status`](Self::query_status); both must obtain a fresh credential
/// for every request they send.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Registry key of this provider
    fn key(&self) -> ProviderKey;

    /// Name from the provider's configuration
    fn display_name(&self) -> &str;

    /// HTTP client used for artifact downloads
    fn client(&self) -> &reqwest::Client;

    /// Submit a job and return its handle
    ///
    /// # Errors
    ///
    /// Transport errors propagate as-is. A response without a job id is
    /// [`Error::Protocol`].
    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle>;

    /// Query the job once and map the provider status
    async fn query_status(&self, handle: &JobHandle) -> Result<StatusReport>;

    /// Poll until the job is terminal
    async fn poll(
        &self,
        handle: &JobHandle,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<JobResult> {
        self.check_handle(handle)?;
        poll_until_terminal(handle, config, cancel, || self.query_status(handle), |_, _| {}).await
    }

    /// Stream the artifact of a finished job to `destination`, returning bytes written
    async fn fetch(&self, result: &JobResult, destination: &Path) -> Result<u64> {
        fetch_artifact(self.client(), &result.url, destination).await
    }

    /// Refuse handles issued by another provider
    fn check_handle(&self, handle: &JobHandle) -> Result<()> {
        if handle.provider == self.key() {
            Ok(())
        } else {
            Err(Error::HandleMismatch {
                expected: self.key(),
                actual: handle.provider,
            })
        }
    }
}

/// Fail on a non-success status, then decode the JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = response.error_for_status()?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Parse an artifact URL reported by a provider
pub(crate) fn parse_locator(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Protocol(format!("artifact URL {raw:?} is invalid: {e}")))
}

/// Build the result of a succeeded job, if the provider named an artifact
pub(crate) fn artifact(url: Option<&str>, duration_secs: Option<f64>) -> Result<Option<JobResult>> {
    url.filter(|u| !u.trim().is_empty())
        .map(|u| {
            Ok(JobResult {
                url: parse_locator(u)?,
                duration_secs,
            })
        })
        .transpose()
}

/// Read a job id that providers send either as a string or a number
pub(crate) fn id_value(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// URL of one job: `{endpoint}{collection}/{id}`, with the id escaped as a single path segment
pub(crate) fn job_url(endpoint: &str, collection: &str, id: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{endpoint}{collection}"))?;
    url.path_segments_mut()
        .map_err(|()| Error::config(format!("endpoint {endpoint:?} cannot be a base URL"), "endpoint"))?
        .pop_if_empty()
        .push(id);
    Ok(url)
}

/// Read a duration that providers send either as a number or a numeric string
pub(crate) fn duration_value(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Requested duration, clamped to the provider's maximum
pub(crate) fn clamp_duration(key: ProviderKey, requested: u32, max: Option<u32>) -> u32 {
    match max {
        Some(max) if requested > max => {
            tracing::warn!(provider = %key, requested, max, "duration exceeds provider maximum, clamping");
            max
        }
        _ => requested,
    }
}

/// Attach a report whose status is Succeeded to its artifact, when present
pub(crate) fn report_with_artifact(
    status: JobStatus,
    raw_status: String,
    message: Option<String>,
    artifact: impl FnOnce() -> Result<Option<JobResult>>,
) -> Result<StatusReport> {
    let mut report = StatusReport::new(status, raw_status).with_message(message);
    if status == JobStatus::Succeeded {
        report.result = artifact()?;
    }
    Ok(report)
}
