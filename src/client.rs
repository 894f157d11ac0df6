//! Client for the generation endpoint.
//!
//! [`GenerateClient`] runs one submission end to end: validate the form,
//! POST it, classify the response, and (for the `generate_into` family) save
//! the document. It holds no form state; for the stateful form with a
//! loading flag and an error panel see [`crate::session::ConversionForm`].
//!
//! ## One request at a time
//!
//! The service renders documents synchronously and a second click while the
//! first is pending is almost always a mistake. Overlap is rejected here, not
//! queued: a call that finds another submission in flight on the same client
//! (or any clone of it) fails immediately with [`CifraError::Busy`] without
//! touching the network.

use crate::config::ClientConfig;
use crate::error::CifraError;
use crate::form::FormState;
use crate::output::{GeneratedArtifact, SavedDownload};
use crate::pipeline::save::{DirectorySink, DownloadSink};
use crate::pipeline::{request, response};
use reqwest::Url;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// HTTP client for the cifra generation service.
///
/// Cheap to clone; clones share the connection pool and the in-flight flag.
#[derive(Debug, Clone)]
pub struct GenerateClient {
    http: reqwest::Client,
    config: ClientConfig,
    endpoint: Url,
    in_flight: Arc<AtomicBool>,
}

impl GenerateClient {
    pub fn new(config: ClientConfig) -> Result<Self, CifraError> {
        let endpoint = config.endpoint_url()?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CifraError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            endpoint,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The URL submissions are POSTed to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Whether a submission is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit `form` and return the generated document in memory.
    ///
    /// # Errors
    /// - `Validation` if the URL is empty or not absolute (no request is sent)
    /// - `Busy` if another submission is in flight
    /// - `Transport`, `Service` or `MalformedResponse` per the response
    pub async fn generate(&self, form: &FormState) -> Result<GeneratedArtifact, CifraError> {
        form.validate()?;
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.fetch(form).await
    }

    /// Submit `form` and hand the document to `sink`.
    pub async fn generate_into(
        &self,
        form: &FormState,
        sink: &dyn DownloadSink,
    ) -> Result<SavedDownload, CifraError> {
        form.validate()?;
        let _guard = InFlight::acquire(&self.in_flight)?;
        let start = Instant::now();

        let artifact = self.fetch(form).await?;
        let path = sink.deliver(&artifact)?;

        let saved = SavedDownload {
            path,
            filename: artifact.filename,
            filename_source: artifact.filename_source,
            format: artifact.format,
            bytes: artifact.bytes.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Saved {} ({} bytes) in {}ms",
            saved.path.display(),
            saved.bytes,
            saved.duration_ms
        );
        Ok(saved)
    }

    /// Submit `form` and save the document into `dir`.
    ///
    /// Existing files are kept unless the config says `overwrite`.
    pub async fn generate_to_dir(
        &self,
        form: &FormState,
        dir: impl AsRef<Path>,
    ) -> Result<SavedDownload, CifraError> {
        let sink = DirectorySink::new(dir.as_ref(), self.config.overwrite);
        self.generate_into(form, &sink).await
    }

    async fn fetch(&self, form: &FormState) -> Result<GeneratedArtifact, CifraError> {
        info!("Requesting {} for {}", form.format, form.url);
        let timeout = self.config.timeout;
        let resp = request::send(&self.http, &self.endpoint, form, timeout).await?;
        response::into_artifact(resp, &self.endpoint, form.format, timeout).await
    }
}

/// Synchronous wrapper: submit `form` and save into `config.output_dir`.
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(form: &FormState, config: &ClientConfig) -> Result<SavedDownload, CifraError> {
    let client = GenerateClient::new(config.clone())?;
    tokio::runtime::Runtime::new()
        .map_err(|e| CifraError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(client.generate_to_dir(form, &config.output_dir))
}

/// Holds the in-flight flag for the duration of one submission.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CifraError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| {
                debug!("Rejecting overlapping submission");
                CifraError::Busy
            })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
