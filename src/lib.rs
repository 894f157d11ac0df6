//! # cifra-client
//!
//! Request printable cifras (chord/lyric sheets) from a cifra generation
//! service and save the resulting PDF or DOCX locally.
//!
//! The service does all the hard work: it scrapes the cifra page, lays the
//! song out on a single page and renders the document. This crate is the
//! form in front of it: two inputs, one POST, one file.
//!
//! ## Request flow
//!
//! ```text
//! FormState {url, format}
//!  │
//!  ├─ 1. Validate  non-empty absolute URL, else no request at all
//!  ├─ 2. Request   POST {url, format} as JSON to /api/generate
//!  ├─ 3. Response  2xx → bytes; otherwise the service's `error` message
//!  ├─ 4. Filename  Content-Disposition, else cifra.<format>
//!  └─ 5. Save      temp file in the output dir, renamed into place once
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cifra_client::{ClientConfig, ConversionForm, GenerateClient, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://127.0.0.1:5328")
//!         .output_dir("cifras")
//!         .build()?;
//!     let mut form = ConversionForm::new(GenerateClient::new(config)?);
//!     form.set_url("https://www.cifraclub.com.br/isaias-saad/bondade-de-deus/");
//!     form.set_format(OutputFormat::Docx);
//!
//!     match form.submit().await {
//!         Ok(saved) => println!("saved {}", saved.path.display()),
//!         Err(_) => eprintln!("{}", form.state().error.as_deref().unwrap_or_default()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cifra` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{generate_sync, GenerateClient};
pub use config::{ClientConfig, ClientConfigBuilder, OutputFormat};
pub use error::{CifraError, ErrorKind, DEFAULT_SERVICE_ERROR};
pub use form::FormState;
pub use output::{FilenameSource, GeneratedArtifact, SavedDownload};
pub use pipeline::filename::{derive_filename, fallback_filename, parse_content_disposition_filename};
pub use pipeline::save::{DirectorySink, DownloadSink, ScopedDownload};
pub use progress::{NoopObserver, ObserverRef, SubmissionObserver};
pub use session::{ConversionForm, RequestState};
