//! Status polling with exponential backoff
//!
//! [`poll_until_terminal`] queries a job until the provider reports a terminal
//! state. Submitted/Processing sleep and repeat; everything else ends the loop:
//!
//! | status     | outcome |
//! |------------|---------|
//! | Succeeded  | the artifact, or a protocol error when none was reported |
//! | Failed     | [`Error::JobFailed`] with the provider's message |
//! | Unknown    | [`Error::UnknownState`], never retried |
//!
//! The wait between queries starts at `initial_interval`, grows by
//! `backoff_multiplier` up to `max_interval`, and may carry random jitter. A
//! cancellation token, `max_attempts` and `max_wait` bound the loop.
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use vidgen::config::PollConfig;
//! use vidgen::poll::poll_until_terminal;
//! use vidgen::{JobHandle, JobStatus, ProviderKey, StatusReport};
//!
//! # async fn example() -> vidgen::Result<()> {
//! let handle = JobHandle::new(ProviderKey::Pika, "job-1");
//! let result = poll_until_terminal(
//!     &handle,
//!     &PollConfig::default(),
//!     &CancellationToken::new(),
//!     || async { Ok(StatusReport::new(JobStatus::Processing, "processing")) },
//!     |_attempt, _report| {},
//! )
//! .await?;
//! println!("video ready at {}", result.url);
//! # Ok(())
//! # }
//! ```

use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::types::{JobHandle, JobResult, JobStatus, StatusReport};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Largest jitter added to a wait, as a fraction of the wait
const JITTER_FRACTION: f64 = 0.2;

/// Poll a job until it reaches a terminal state
///
/// # Arguments
///
/// * `handle` - Job being polled (used for errors and logging)
/// * `config` - Interval, backoff, jitter and ceilings
/// * `cancel` - Aborts the loop, including an in-flight query or sleep
/// * `query` - Performs one status request; must obtain a fresh credential per call
/// * `observe` - Called with the 1-based attempt number after every query
///
/// # Errors
///
/// Query errors propagate unchanged. Terminal failures map to
/// [`Error::JobFailed`], [`Error::UnknownState`] or [`Error::Protocol`];
/// ceilings to [`Error::PollTimeout`]; cancellation to [`Error::Cancelled`].
pub async fn poll_until_terminal<F, Fut, O>(
    handle: &JobHandle,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut query: F,
    mut observe: O,
) -> Result<JobResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StatusReport>>,
    O: FnMut(u32, &StatusReport),
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    let mut delay = config.initial_interval;

    loop {
        attempt += 1;

        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(handle, attempt - 1)),
            report = query() => report?,
        };

        tracing::debug!(
            job = %handle,
            attempt,
            status = ?report.status,
            raw_status = %report.raw_status,
            "job status"
        );
        observe(attempt, &report);

        match report.status {
            JobStatus::Succeeded => {
                return report.result.ok_or_else(|| {
                    Error::Protocol(format!(
                        "job {} succeeded but no artifact found",
                        handle.id
                    ))
                });
            }
            JobStatus::Failed => {
                return Err(Error::JobFailed {
                    job_id: handle.id.clone(),
                    message: report
                        .message
                        .unwrap_or_else(|| "provider gave no failure reason".to_string()),
                });
            }
            JobStatus::Unknown => {
                tracing::warn!(job = %handle, raw_status = %report.raw_status, "unrecognized job status");
                return Err(Error::UnknownState {
                    job_id: handle.id.clone(),
                    status: report.raw_status,
                });
            }
            JobStatus::Submitted | JobStatus::Processing => {}
        }

        if config.max_attempts.is_some_and(|max| attempt >= max) {
            return Err(timed_out(handle, attempt, started));
        }

        let mut wait = if config.jitter {
            add_jitter(delay)
        } else {
            delay
        };
        if let Some(max_wait) = config.max_wait {
            let remaining = max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(timed_out(handle, attempt, started));
            }
            wait = wait.min(remaining);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(handle, attempt)),
            _ = tokio::time::sleep(wait) => {}
        }

        delay = next_delay(delay, config);
    }
}

/// Grow `delay` by the backoff multiplier, never past `max_interval`
fn next_delay(delay: Duration, config: &PollConfig) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
        .unwrap_or(config.max_interval)
        .min(config.max_interval)
}

fn cancelled(handle: &JobHandle, attempts: u32) -> Error {
    tracing::info!(job = %handle, attempts, "polling cancelled");
    Error::Cancelled {
        job_id: handle.id.clone(),
    }
}

fn timed_out(handle: &JobHandle, attempts: u32, started: Instant) -> Error {
    let elapsed = started.elapsed();
    tracing::warn!(job = %handle, attempts, elapsed = ?elapsed, "job did not finish in time");
    Error::PollTimeout {
        job_id: handle.id.clone(),
        attempts,
        elapsed,
    }
}

/// Add random jitter so concurrent pollers drift apart
///
/// The result lies between `delay` and `delay * (1 + JITTER_FRACTION)`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=JITTER_FRACTION);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
