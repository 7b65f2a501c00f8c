//! Core types for vidgen

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::{Error, Result};

/// Known video generation providers
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKey {
    /// Kling (可灵), signed-token authentication
    Kling,
    /// Runway, static bearer token with version header
    Runway,
    /// Pika, static bearer token
    Pika,
}

impl ProviderKey {
    /// Every supported provider, in registration order
    pub const ALL: [ProviderKey; 3] = [ProviderKey::Kling, ProviderKey::Runway, ProviderKey::Pika];

    /// Canonical lowercase key
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKey::Kling => "kling",
            ProviderKey::Runway => "runway",
            ProviderKey::Pika => "pika",
        }
    }

    /// Names accepted for this provider, already normalized
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ProviderKey::Kling => &["kling", "可灵", "qingque"],
            ProviderKey::Runway => &["runway", "runwayml"],
            ProviderKey::Pika => &["pika", "pikalabs"],
        }
    }
}

impl std::fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical description of a generation request
///
/// Adapters translate this into their own wire payload. A spec is never
/// modified after it has been submitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Text prompt describing the video
    pub prompt: String,

    /// Target duration in seconds (default: 5)
    #[serde(default = "default_duration")]
    pub duration_secs: u32,

    /// Aspect ratio such as "16:9" (default: "16:9")
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    /// Things the video should avoid
    #[serde(default)]
    pub negative_prompt: Option<String>,

    /// Model override; the provider's configured model is used when unset
    #[serde(default)]
    pub model: Option<String>,
}

impl JobSpec {
    /// Create a spec with default duration and aspect ratio
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration_secs: default_duration(),
            aspect_ratio: default_aspect_ratio(),
            negative_prompt: None,
            model: None,
        }
    }

    /// Set the target duration
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Set the aspect ratio
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = ratio.into();
        self
    }

    /// Set the negative prompt
    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    /// Override the provider's model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Reject specs no provider could accept
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidSpec("prompt is empty".into()));
        }
        if self.duration_secs == 0 {
            return Err(Error::InvalidSpec("duration must be at least 1 second".into()));
        }
        if self.aspect_ratio.split(':').count() != 2 {
            return Err(Error::InvalidSpec(format!(
                "aspect ratio {:?} is not of the form W:H",
                self.aspect_ratio
            )));
        }
        Ok(())
    }
}

fn default_duration() -> u32 {
    5
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

/// Provider-scoped identifier of a submitted job
///
/// The id is meaningless outside the issuing provider's namespace; adapters
/// refuse handles minted by another provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    /// Provider that issued the id
    pub provider: ProviderKey,
    /// Opaque job id
    pub id: String,
}

impl JobHandle {
    /// Create a handle for a job id
    pub fn new(provider: ProviderKey, id: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// Canonical job state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted by the provider, not started
    Submitted,
    /// Being generated
    Processing,
    /// Finished with an artifact
    Succeeded,
    /// Finished without an artifact
    Failed,
    /// Status string outside the provider's vocabulary
    Unknown,
}

impl JobStatus {
    /// Succeeded and Failed end polling for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Artifact produced by a successful job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Where the generated video can be downloaded
    pub url: Url,
    /// Duration reported by the provider, in seconds
    pub duration_secs: Option<f64>,
}

/// One status observation, already mapped into the canonical state machine
#[derive(Clone, Debug, PartialEq)]
pub struct StatusReport {
    /// Canonical status
    pub status: JobStatus,
    /// Status string exactly as the provider sent it
    pub raw_status: String,
    /// Artifact, when the provider included one
    pub result: Option<JobResult>,
    /// Provider message (failure reason, progress note)
    pub message: Option<String>,
}

impl StatusReport {
    /// A report with no artifact and no message
    pub fn new(status: JobStatus, raw_status: impl Into<String>) -> Self {
        Self {
            status,
            raw_status: raw_status.into(),
            result: None,
            message: None,
        }
    }

    /// Attach an artifact
    pub fn with_result(mut self, result: JobResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Attach a provider message
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

/// Event emitted during a generation job
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Provider accepted the job
    Submitted {
        /// Handle returned by the provider
        handle: JobHandle,
    },

    /// A status query returned
    StatusChanged {
        /// Job being polled
        handle: JobHandle,
        /// Canonical status
        status: JobStatus,
        /// 1-based status query number
        attempt: u32,
    },

    /// Artifact download started
    Downloading {
        /// Job that produced the artifact
        handle: JobHandle,
        /// Artifact location
        url: String,
    },

    /// Artifact saved
    Completed {
        /// Job that produced the artifact
        handle: JobHandle,
        /// Where the artifact was written
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// Generation aborted
    Failed {
        /// Provider the job was sent to
        provider: ProviderKey,
        /// Job id, if submission got that far
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        /// Error message
        error: String,
    },
}
