//! Error types for vidgen
//!
//! Every failure aborts the whole generation call. Nothing in this crate retries:
//! - configuration problems surface before any network activity
//! - transport failures propagate uninterpreted
//! - provider-reported outcomes (failed job, unknown status) carry the provider's words

use crate::types::ProviderKey;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for vidgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vidgen
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "providers[0].secret_key")
        key: Option<String>,
    },

    /// Job specification rejected before submission
    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    /// Non-success HTTP status or connection failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Well-formed response that lacks a required field
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Provider answered with a non-zero business code in its response envelope
    #[error("provider rejected request (code {code}): {message}")]
    Rejected {
        /// Provider-specific error code
        code: i64,
        /// Provider message, verbatim
        message: String,
    },

    /// Provider reported that the job failed
    #[error("{message}")]
    JobFailed {
        /// The job that failed
        job_id: String,
        /// Failure message as reported by the provider
        message: String,
    },

    /// Provider reported a status outside its known vocabulary
    #[error("unknown status {status:?} for job {job_id}")]
    UnknownState {
        /// The job being polled
        job_id: String,
        /// The raw status string
        status: String,
    },

    /// Polling gave up after the configured attempt or time ceiling
    #[error("job {job_id} still running after {attempts} status checks ({elapsed:?})")]
    PollTimeout {
        /// The job being polled
        job_id: String,
        /// Status queries performed
        attempts: u32,
        /// Time spent polling
        elapsed: Duration,
    },

    /// Caller cancelled the job while it was being polled
    #[error("job {job_id} cancelled")]
    Cancelled {
        /// The job that was being polled
        job_id: String,
    },

    /// A job handle was passed to an adapter of another provider
    #[error("job handle belongs to {actual}, not {expected}")]
    HandleMismatch {
        /// The provider of the adapter
        expected: ProviderKey,
        /// The provider that issued the handle
        actual: ProviderKey,
    },

    /// Signed token could not be produced
    #[error("token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Resource locator or endpoint could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response body was not the expected JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidSpec(_) => "invalid_spec",
            Error::Transport(_) => "transport_error",
            Error::Protocol(_) => "protocol_error",
            Error::Rejected { .. } => "provider_rejected",
            Error::JobFailed { .. } => "job_failed",
            Error::UnknownState { .. } => "unknown_state",
            Error::PollTimeout { .. } => "poll_timeout",
            Error::Cancelled { .. } => "cancelled",
            Error::HandleMismatch { .. } => "handle_mismatch",
            Error::Token(_) => "token_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// True when the provider itself decided the job's fate
    ///
    /// Local and transport failures return `false`: the remote job may still be
    /// running and a caller could look it up again by its handle.
    pub fn is_job_terminal(&self) -> bool {
        matches!(self, Error::JobFailed { .. } | Error::UnknownState { .. })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn local_variants() -> Vec<(Error, &'static str)> {
        vec![
            (
                Error::config("missing secret_key", "providers[0].secret_key"),
                "config_error",
            ),
            (Error::InvalidSpec("empty prompt".into()), "invalid_spec"),
            (Error::Protocol("could not obtain job id".into()), "protocol_error"),
            (
                Error::Rejected {
                    code: 1102,
                    message: "balance not enough".into(),
                },
                "provider_rejected",
            ),
            (
                Error::JobFailed {
                    job_id: "t-1".into(),
                    message: "content policy".into(),
                },
                "job_failed",
            ),
            (
                Error::UnknownState {
                    job_id: "t-1".into(),
                    status: "paused".into(),
                },
                "unknown_state",
            ),
            (
                Error::PollTimeout {
                    job_id: "t-1".into(),
                    attempts: 3,
                    elapsed: Duration::from_secs(15),
                },
                "poll_timeout",
            ),
            (Error::Cancelled { job_id: "t-1".into() }, "cancelled"),
            (
                Error::HandleMismatch {
                    expected: ProviderKey::Kling,
                    actual: ProviderKey::Pika,
                },
                "handle_mismatch",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                "io_error",
            ),
        ]
    }

    #[test]
    fn every_variant_has_its_error_code() {
        for (error, expected) in local_variants() {
            assert_eq!(error.error_code(), expected, "wrong code for {error:?}");
        }
    }

    #[test]
    fn job_failed_displays_provider_message_verbatim() {
        let error = Error::JobFailed {
            job_id: "t-1".into(),
            message: "图片内容违规".into(),
        };
        assert_eq!(error.to_string(), "图片内容违规");
    }

    #[test]
    fn only_provider_outcomes_are_job_terminal() {
        for (error, code) in local_variants() {
            let expected = matches!(code, "job_failed" | "unknown_state");
            assert_eq!(error.is_job_terminal(), expected, "{code}");
        }
    }

    #[test]
    fn config_helper_records_key() {
        match Error::config("bad endpoint", "providers[1].endpoint") {
            Error::Config { message, key } => {
                assert_eq!(message, "bad endpoint");
                assert_eq!(key.as_deref(), Some("providers[1].endpoint"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
