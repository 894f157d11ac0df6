//! Error types for the cifra-client library.
//!
//! Every failure a submission can hit is a variant of [`CifraError`], and
//! every variant maps onto exactly one [`ErrorKind`]. Callers that only need
//! to branch (retry the form, show a panel, exit non-zero) match on the kind;
//! callers that display something use the `Display` text, which is the
//! message the form shows in its error panel.
//!
//! The one message that is *not* ours is [`CifraError::Service`]: its
//! `Display` is exactly the `error` string the generation service returned
//! (or [`DEFAULT_SERVICE_ERROR`]), with nothing prepended.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when the service fails without saying why.
pub const DEFAULT_SERVICE_ERROR: &str = "Erro ao gerar cifra";

/// Coarse classification of a [`CifraError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The form input was rejected before any request was sent.
    Validation,
    /// The request never produced an HTTP response (connect, DNS, timeout).
    Transport,
    /// The service answered with a non-2xx status and a JSON body.
    Service,
    /// The service answered with something we cannot interpret.
    MalformedResponse,
    /// The document arrived but could not be written locally.
    Save,
    /// Another submission is already in flight on this client.
    Busy,
    /// Client configuration is unusable.
    Config,
    /// Unexpected internal failure.
    Internal,
}

/// All errors returned by the cifra-client library.
#[derive(Debug, Error)]
pub enum CifraError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The URL field is empty.
    #[error("URL is required")]
    MissingUrl,

    /// The URL field does not hold an absolute URL.
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request could not be sent or the body could not be read.
    #[error("Request to '{endpoint}' failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The configured request timeout elapsed.
    #[error("Request to '{endpoint}' timed out after {millis}ms")]
    Timeout { endpoint: String, millis: u64 },

    // ── Service errors ────────────────────────────────────────────────────
    /// The service reported a failure.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// A failure response whose body is not JSON.
    #[error("Service returned HTTP {status} with a non-JSON body: {detail}")]
    MalformedFailureBody { status: u16, detail: String },

    /// A success response without a document.
    #[error("Service returned HTTP {status} with an empty document")]
    EmptyDocument { status: u16 },

    // ── Local I/O errors ──────────────────────────────────────────────────
    /// Could not stage or commit the downloaded file.
    #[error("Failed to save '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Concurrency ───────────────────────────────────────────────────────
    /// A second submission was attempted while one is outstanding.
    #[error("A conversion request is already in progress")]
    Busy,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CifraError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CifraError::MissingUrl | CifraError::InvalidUrl { .. } => ErrorKind::Validation,
            CifraError::Transport { .. } | CifraError::Timeout { .. } => ErrorKind::Transport,
            CifraError::Service { .. } => ErrorKind::Service,
            CifraError::MalformedFailureBody { .. } | CifraError::EmptyDocument { .. } => {
                ErrorKind::MalformedResponse
            }
            CifraError::SaveFailed { .. } => ErrorKind::Save,
            CifraError::Busy => ErrorKind::Busy,
            CifraError::InvalidConfig(_) => ErrorKind::Config,
            CifraError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status attached to this error, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CifraError::Service { status, .. }
            | CifraError::MalformedFailureBody { status, .. }
            | CifraError::EmptyDocument { status } => Some(*status),
            _ => None,
        }
    }
}
