//! Generation orchestrator
//!
//! [`VideoGenerator`] runs one job end to end: resolve the provider, submit
//! the job spec, poll until terminal, stream the artifact to disk. The awaiting
//! task is occupied for the whole job; each call owns its own handle and
//! credentials, so independent calls may run concurrently on one generator.


use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::poll::poll_until_terminal;
use crate::providers::{ProviderContext, VideoProvider};
use crate::registry::ProviderRegistry;
use crate::types::{Event, JobHandle, JobResult, JobSpec, ProviderKey};

/// Events buffered per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 1000;

/// Outcome of a successful generation
#[derive(Clone, Debug)]
pub struct GeneratedVideo {
    /// Job that produced the video
    pub handle: JobHandle,
    /// Artifact as reported by the provider
    pub result: JobResult,
    /// Where the video was written
    pub path: PathBuf,
    /// Bytes written to `path`
    pub bytes_written: u64,
    /// Time from submission to saved file
    pub elapsed: Duration,
}

/// Video generation orchestrator (cloneable, all state is shared)
#[derive(Clone)]
pub struct VideoGenerator {
    /// Configured adapters
    registry: ProviderRegistry,
    /// Validated configuration
    config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl VideoGenerator {
    /// Validate `config` and build every configured provider
    ///
    /// # Errors
    ///
    /// A single [`Error::Config`] listing every configuration problem, or a
    /// transport error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let context = ProviderContext::from_config(&config.http)?;
        let registry = ProviderRegistry::from_config(&config, context)?;

        tracing::info!(
            providers = ?registry.keys(),
            default_provider = ?config.default_provider,
            "video generator initialized"
        );

        Ok(Self::with_registry(config, registry))
    }

    /// Use a pre-built registry; `config` only supplies poll settings and the default provider
    pub fn with_registry(config: Config, registry: ProviderRegistry) -> Self {
        let (event_tx, _) = tokio::sync::broadcast::channel(EVENT_CAPACITY);
        Self {
            registry,
            config: Arc::new(config),
            event_tx,
        }
    }

    /// Subscribe to generation events
    ///
    /// Every subscriber receives every event. A subscriber more than 1000
    /// events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configured providers
    pub fn provider_names(&self) -> Vec<ProviderKey> {
        self.registry.keys()
    }

    /// Adapter for the configured default provider, or the only configured one
    pub fn default_provider(&self) -> Result<Arc<dyn VideoProvider>> {
        match &self.config.default_provider {
            Some(name) => self.registry.resolve(name),
            None => match self.registry.keys().as_slice() {
                [only] => self.registry.resolve(only.as_str()),
                _ => Err(Error::config(
                    "no default provider configured",
                    "default_provider",
                )),
            },
        }
    }

    /// Adapter for a provider name
    pub fn provider(&self, name: &str) -> Result<Arc<dyn VideoProvider>> {
        self.registry.resolve(name)
    }

    /// Generate a video and save it to `output`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vidgen::{Config, JobSpec, ProviderConfig, VideoGenerator};
    ///
    /// # async fn example() -> vidgen::Result<()> {
    /// let config = Config {
    ///     providers: vec![ProviderConfig {
    ///         api_key: Some("pika-key".into()),
    ///         ..ProviderConfig::new("pika")
    ///     }],
    ///     ..Default::default()
    /// };
    /// let generator = VideoGenerator::new(config)?;
    /// let video = generator
    ///     .generate("pika", &JobSpec::new("a cat on a roof"), "out/video.mp4")
    ///     .await?;
    /// println!("{} bytes in {:?}", video.bytes_written, video.elapsed);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn generate(
        &self,
        provider: &str,
        spec: &JobSpec,
        output: impl AsRef<Path>,
    ) -> Result<GeneratedVideo> {
        self.generate_with_cancel(provider, spec, output, CancellationToken::new())
            .await
    }

    /// Generate a video, aborting when `cancel` fires
    ///
    /// Provider name and spec are checked before any request is sent.
    /// Cancellation stops polling; a job the provider already accepted is not
    /// cancelled remotely.
    pub async fn generate_with_cancel(
        &self,
        provider: &str,
        spec: &JobSpec,
        output: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<GeneratedVideo> {
        let adapter = self.registry.resolve(provider)?;
        spec.validate()?;
        let output = output.as_ref();

        let mut handle = None;
        let outcome = self
            .run(adapter.as_ref(), spec, output, &cancel, &mut handle)
            .await;

        if let Err(e) = &outcome {
            tracing::error!(
                provider = %adapter.key(),
                job_id = ?handle.as_ref().map(|h| &h.id),
                error = %e,
                code = e.error_code(),
                "video generation failed"
            );
            self.emit(Event::Failed {
                provider: adapter.key(),
                job_id: handle.map(|h| h.id),
                error: e.to_string(),
            });
        }
        outcome
    }

    async fn run(
        &self,
        adapter: &dyn VideoProvider,
        spec: &JobSpec,
        output: &Path,
        cancel: &CancellationToken,
        submitted: &mut Option<JobHandle>,
    ) -> Result<GeneratedVideo> {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                job_id: "unsubmitted".to_string(),
            });
        }
        let handle = adapter.submit(spec).await?;
        *submitted = Some(handle.clone());
        tracing::info!(
            provider = %adapter.key(),
            job_id = %handle.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "video job submitted"
        );
        self.emit(Event::Submitted {
            handle: handle.clone(),
        });

        adapter.check_handle(&handle)?;
        let result = poll_until_terminal(
            &handle,
            &self.config.poll,
            cancel,
            || adapter.query_status(&handle),
            |attempt, report| {
                self.emit(Event::StatusChanged {
                    handle: handle.clone(),
                    status: report.status,
                    attempt,
                });
            },
        )
        .await?;
        tracing::info!(
            provider = %adapter.key(),
            job_id = %handle.id,
            url = %result.url,
            duration_secs = ?result.duration_secs,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "video job succeeded"
        );

        self.emit(Event::Downloading {
            handle: handle.clone(),
            url: result.url.to_string(),
        });
        let bytes_written = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled { job_id: handle.id.clone() });
            }
            written = adapter.fetch(&result, output) => written?,
        };

        let elapsed = started.elapsed();
        tracing::info!(
            provider = %adapter.key(),
            job_id = %handle.id,
            path = %output.display(),
            bytes = bytes_written,
            elapsed_ms = elapsed.as_millis() as u64,
            "video saved"
        );
        self.emit(Event::Completed {
            handle: handle.clone(),
            path: output.to_path_buf(),
            bytes: bytes_written,
        });

        Ok(GeneratedVideo {
            handle,
            result,
            path: output.to_path_buf(),
            bytes_written,
            elapsed,
        })
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
