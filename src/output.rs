//! Result types of a submission.

use crate::config::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where an artifact's filename came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameSource {
    /// Parsed from the `Content-Disposition` response header.
    Header,
    /// Synthesised as `cifra.<format>`.
    Fallback,
}

/// A generated document held in memory between response and save.
///
/// Never persisted as-is: it is handed to a [`crate::pipeline::save::DownloadSink`]
/// and dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub filename_source: FilenameSource,
    pub format: OutputFormat,
    /// `Content-Type` of the response, when the service sent one.
    pub content_type: Option<String>,
}

impl GeneratedArtifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Byte payloads make the derived Debug unreadable.
impl fmt::Debug for GeneratedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedArtifact")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("filename", &self.filename)
            .field("filename_source", &self.filename_source)
            .field("format", &self.format)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// A document that has been written to its final location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDownload {
    /// Final path of the saved file.
    pub path: PathBuf,
    /// Name the service suggested (or the fallback), before de-duplication.
    pub filename: String,
    pub filename_source: FilenameSource,
    pub format: OutputFormat,
    pub bytes: usize,
    /// Wall-clock time from submit to saved file.
    pub duration_ms: u64,
}
