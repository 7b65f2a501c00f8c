//! # vidgen
//!
//! Job orchestration for hosted text-to-video providers.
//!
//! A generation call resolves a provider by name, submits a [`JobSpec`], polls
//! the provider until the job reaches a terminal state, and streams the
//! resulting video to disk. Provider differences (payload shapes, status
//! vocabularies, authentication) live behind the [`VideoProvider`] trait.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidgen::{Config, JobSpec, ProviderConfig, VideoGenerator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         providers: vec![ProviderConfig {
//!             access_key: Some("access".to_string()),
//!             secret_key: Some("secret".to_string()),
//!             ..ProviderConfig::new("可灵")
//!         }],
//!         ..Default::default()
//!     };
//!
//!     let generator = VideoGenerator::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = generator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let spec = JobSpec::new("a cat on a roof").with_duration(5);
//!     let video = generator.generate("kling", &spec, "out/video.mp4").await?;
//!     println!("saved {} bytes to {}", video.bytes_written, video.path.display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Request credentials (static and signed tokens)
pub mod credentials;
/// Error types
pub mod error;
/// Streaming artifact download
pub mod fetch;
/// Generation orchestrator
pub mod generator;
/// Status polling with backoff
pub mod poll;
/// Provider adapters
pub mod providers;
/// Provider name resolution
pub mod registry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, HttpConfig, PollConfig, ProviderConfig};
pub use credentials::{Credential, CredentialProvider, SignedCredentials, StaticCredentials};
pub use error::{Error, Result};
pub use generator::{GeneratedVideo, VideoGenerator};
pub use providers::{KlingProvider, PikaProvider, ProviderContext, RunwayProvider, VideoProvider};
pub use registry::{ProviderRegistry, lookup_key, normalize_provider_name};
pub use types::{Event, JobHandle, JobResult, JobSpec, JobStatus, ProviderKey, StatusReport};

/// Generate a video, cancelling polling when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vidgen::{Config, JobSpec, VideoGenerator, generate_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let generator = VideoGenerator::new(Config::default())?;
///     let spec = JobSpec::new("waves at dusk");
///
///     // Ctrl+C aborts the job with Error::Cancelled
///     generate_with_shutdown(&generator, "pika", &spec, "waves.mp4").await?;
///
///     Ok(())
/// }
/// ```
pub async fn generate_with_shutdown(
    generator: &VideoGenerator,
    provider: &str,
    spec: &JobSpec,
    output: impl AsRef<std::path::Path>,
) -> Result<GeneratedVideo> {
    let cancel = tokio_util::sync::CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("cancelling video generation");
        trigger.cancel();
    });

    let outcome = generator
        .generate_with_cancel(provider, spec, output, cancel)
        .await;
    watcher.abort();
    outcome
}

/// Resolves only when a termination signal arrives
///
/// When no handler can be registered the future never resolves, so the job
/// runs to completion instead of being cancelled.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                Some(()) = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                Some(()) = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
                else => signals_unavailable().await,
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            match sigterm.recv().await {
                Some(()) => tracing::info!("Received SIGTERM signal"),
                None => signals_unavailable().await,
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            match sigint.recv().await {
                Some(()) => tracing::info!("Received SIGINT signal (Ctrl+C)"),
                None => signals_unavailable().await,
            }
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "Could not register any signal handlers, trying ctrl_c");
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received Ctrl+C signal"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
                    signals_unavailable().await;
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            signals_unavailable().await;
        }
    }
}

/// Signal handling is gone; never resolve so the job is left alone
async fn signals_unavailable() {
    tracing::warn!("signal handling unavailable, generation will not be cancelled by signals");
    std::future::pending::<()>().await;
}
