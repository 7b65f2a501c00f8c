//! Configuration types for vidgen
//!
//! Loading the configuration from disk is left to the embedding application;
//! everything here derives `Deserialize` so any serde format works. A
//! [`Config`] is validated once, up front, and every problem is reported in a
//! single error.

use crate::error::{Error, Result};
use crate::registry::lookup_key;
use crate::types::ProviderKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Main configuration for [`VideoGenerator`](crate::VideoGenerator)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider configurations (at least one required)
    pub providers: Vec<ProviderConfig>,

    /// Provider used when the caller does not name one
    #[serde(default)]
    pub default_provider: Option<String>,

    /// Status polling behavior
    #[serde(default)]
    pub poll: PollConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Credentials and request defaults for one provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable provider name, e.g. "Kling" or "可灵"
    pub name: String,

    /// API base URL (each provider has a default)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model identifier (each provider has a default)
    #[serde(default)]
    pub model: Option<String>,

    /// Access key, the token issuer for signed-token providers
    #[serde(default)]
    pub access_key: Option<String>,

    /// Secret used to sign tokens
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Static bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Organization header value, sent when set
    #[serde(default)]
    pub organization: Option<String>,

    /// API version header value, sent when set
    #[serde(default)]
    pub api_version: Option<String>,

    /// Longest video the provider accepts; longer requests are clamped
    #[serde(default)]
    pub max_duration: Option<u32>,

    /// Prompt adherence for providers that expose it (Kling default: 0.5)
    #[serde(default)]
    pub cfg_scale: Option<f64>,

    /// Generation mode for providers that expose it (Kling default: "std")
    #[serde(default)]
    pub mode: Option<String>,

    /// Lifetime of signed tokens (default: 30 minutes)
    #[serde(default = "default_token_lifetime", with = "duration_serde")]
    pub token_lifetime: Duration,
}

impl ProviderConfig {
    /// A provider entry with only a name set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
            model: None,
            access_key: None,
            secret_key: None,
            api_key: None,
            organization: None,
            api_version: None,
            max_duration: None,
            cfg_scale: None,
            mode: None,
            token_lifetime: default_token_lifetime(),
        }
    }

    /// Configured endpoint, or the provider's public API
    pub fn endpoint_or_default(&self, key: ProviderKey) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| default_endpoint(key))
            .trim_end_matches('/')
    }

    /// Configured model, or the provider's default model
    pub fn model_or_default(&self, key: ProviderKey) -> &str {
        self.model.as_deref().unwrap_or_else(|| default_model(key))
    }

    /// Check required fields for the given provider, appending problems to `problems`
    fn collect_problems(&self, index: usize, key: ProviderKey, problems: &mut Vec<Problem>) {
        let field = |name: &str| format!("providers[{index}].{name}");
        let missing = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());

        match key {
            ProviderKey::Kling => {
                if missing(&self.access_key) {
                    problems.push(Problem::new(field("access_key"), "access_key is required"));
                }
                if missing(&self.secret_key) {
                    problems.push(Problem::new(field("secret_key"), "secret_key is required"));
                }
                if self.token_lifetime.is_zero() {
                    problems.push(Problem::new(
                        field("token_lifetime"),
                        "token_lifetime must be positive",
                    ));
                }
            }
            ProviderKey::Runway | ProviderKey::Pika => {
                if missing(&self.api_key) {
                    problems.push(Problem::new(field("api_key"), "api_key is required"));
                }
            }
        }

        if let Some(endpoint) = &self.endpoint
            && let Err(e) = Url::parse(endpoint)
        {
            problems.push(Problem::new(
                field("endpoint"),
                format!("endpoint {endpoint:?} is not a valid URL: {e}"),
            ));
        }

        if self.max_duration == Some(0) {
            problems.push(Problem::new(
                field("max_duration"),
                "max_duration must be at least 1 second",
            ));
        }
    }
}

/// Status polling configuration
///
/// The poller waits `initial_interval` after the first non-terminal status and
/// grows the wait by `backoff_multiplier` up to `max_interval`. With both
/// `max_attempts` and `max_wait` unset (the default) a job is polled until the
/// provider reports a terminal state or the caller cancels it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait after the first non-terminal status (default: 5 seconds)
    #[serde(default = "default_initial_interval", with = "duration_ms_serde")]
    pub initial_interval: Duration,

    /// Longest wait between status queries (default: 30 seconds)
    #[serde(default = "default_max_interval", with = "duration_ms_serde")]
    pub max_interval: Duration,

    /// Growth factor between waits (default: 1.5, 1.0 = fixed interval)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add up to 20% random jitter to every wait (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Give up after this many status queries (default: unbounded)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up after polling this long (default: unbounded)
    #[serde(default, with = "optional_duration_serde")]
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: default_initial_interval(),
            max_interval: default_max_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            max_attempts: None,
            max_wait: None,
        }
    }
}

impl PollConfig {
    /// Fixed interval, no jitter, no ceiling
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            backoff_multiplier: 1.0,
            jitter: false,
            max_attempts: None,
            max_wait: None,
        }
    }

    fn collect_problems(&self, problems: &mut Vec<Problem>) {
        if self.initial_interval.is_zero() {
            problems.push(Problem::new(
                "poll.initial_interval",
                "initial_interval must be positive",
            ));
        }
        if self.max_interval < self.initial_interval {
            problems.push(Problem::new(
                "poll.max_interval",
                "max_interval must not be shorter than initial_interval",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            problems.push(Problem::new(
                "poll.backoff_multiplier",
                "backoff_multiplier must be a finite number of at least 1.0",
            ));
        }
        if self.max_attempts == Some(0) {
            problems.push(Problem::new(
                "poll.max_attempts",
                "max_attempts must be at least 1",
            ));
        }
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for submission and status requests (default: 60 seconds)
    ///
    /// Artifact downloads are not bounded by this timeout.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// TCP connect timeout for every request (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Validate every provider and setting, reporting all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.providers.is_empty() {
            problems.push(Problem::new("providers", "at least one provider is required"));
        }

        let mut seen = HashSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            let Some(key) = lookup_key(&provider.name) else {
                problems.push(Problem::new(
                    format!("providers[{index}].name"),
                    format!("unsupported provider {:?}", provider.name),
                ));
                continue;
            };
            if !seen.insert(key) {
                problems.push(Problem::new(
                    format!("providers[{index}].name"),
                    format!("provider {key} is configured more than once"),
                ));
            }
            provider.collect_problems(index, key, &mut problems);
        }

        if let Some(default) = &self.default_provider {
            let configured = lookup_key(default).is_some_and(|key| seen.contains(&key));
            if !configured {
                problems.push(Problem::new(
                    "default_provider",
                    format!("default provider {default:?} is not configured"),
                ));
            }
        }

        self.poll.collect_problems(&mut problems);

        match problems.len() {
            0 => Ok(()),
            1 => {
                let problem = problems.remove(0);
                Err(Error::config(problem.message, problem.key))
            }
            n => Err(Error::Config {
                message: format!(
                    "{n} problems: {}",
                    problems
                        .iter()
                        .map(|p| format!("{} ({})", p.message, p.key))
                        .collect::<Vec<_>>()
                        .join("; ")
                ),
                key: None,
            }),
        }
    }

    /// Configuration entry for a provider
    pub fn provider(&self, key: ProviderKey) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| lookup_key(&p.name) == Some(key))
    }
}

/// One validation finding
struct Problem {
    key: String,
    message: String,
}

impl Problem {
    fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

fn default_endpoint(key: ProviderKey) -> &'static str {
    match key {
        ProviderKey::Kling => "https://api.klingai.com",
        ProviderKey::Runway => "https://api.dev.runwayml.com",
        ProviderKey::Pika => "https://api.pika.art",
    }
}

fn default_model(key: ProviderKey) -> &'static str {
    match key {
        ProviderKey::Kling => "kling-v1",
        ProviderKey::Runway => "gen4_turbo",
        ProviderKey::Pika => "pika-2.2",
    }
}

fn default_token_lifetime() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_initial_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    concat!("vidgen/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper (poll intervals)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
