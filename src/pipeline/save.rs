//! Save stage: hand a generated document to its destination.
//!
//! ## Scoped download
//!
//! A document is never written straight to its final name. [`ScopedDownload`]
//! stages the bytes in a hidden temp file inside the destination directory
//! and [`ScopedDownload::commit`] renames it into place exactly once. If the
//! write fails, the rename fails, or the handle is dropped uncommitted, the
//! temp file is removed, so a failed submission never leaves a truncated
//! `song.pdf` behind. Staging in the same directory keeps the rename atomic.

use crate::config::ClientConfig;
use crate::error::CifraError;
use crate::output::GeneratedArtifact;
use crate::pipeline::filename::{split_extension, truncate_at_char_boundary, NAME_MAX};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Upper bound on `name (N).ext` candidates.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Destination for generated documents.
///
/// The session calls [`DownloadSink::deliver`] once per successful response.
pub trait DownloadSink: Send + Sync {
    /// Persist `artifact` and return where it ended up.
    fn deliver(&self, artifact: &GeneratedArtifact) -> Result<PathBuf, CifraError>;
}

/// Saves documents into a directory, like a browser's download folder.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    overwrite: bool,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            dir: dir.into(),
            overwrite,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.output_dir.clone(), config.overwrite)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, artifact: &GeneratedArtifact) -> Result<PathBuf, CifraError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| save_failed(&self.dir, e))?;

        let mut staged = ScopedDownload::stage(&self.dir)?;
        staged.write_all(&artifact.bytes)?;

        if self.overwrite {
            staged.commit(&self.dir.join(&artifact.filename))
        } else {
            staged.commit_unique(&self.dir, &artifact.filename)
        }
    }
}

/// A staged download that is removed unless committed.
pub struct ScopedDownload {
    file: Option<NamedTempFile>,
}

impl ScopedDownload {
    /// Create the hidden staging file in `dir`.
    pub fn stage(dir: &Path) -> Result<Self, CifraError> {
        let file = tempfile::Builder::new()
            .prefix(".cifra-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| save_failed(dir, e))?;
        debug!("Staging download at {}", file.path().display());
        Ok(Self { file: Some(file) })
    }

    /// Path of the staging file.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }

    /// Write and flush the whole payload.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), CifraError> {
        let file = self.file.as_mut().ok_or_else(already_committed)?;
        let path = file.path().to_path_buf();
        file.write_all(bytes)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| save_failed(&path, e))
    }

    /// Move the staged file to `target`, replacing anything already there.
    pub fn commit(mut self, target: &Path) -> Result<PathBuf, CifraError> {
        let file = self.file.take().ok_or_else(already_committed)?;
        file.persist(target)
            .map_err(|e| save_failed(target, e.error))?;
        debug!("Committed download to {}", target.display());
        Ok(target.to_path_buf())
    }

    /// Move the staged file to `dir/filename`, or the first free
    /// `name (N).ext` when that exists. Never replaces a file.
    pub fn commit_unique(mut self, dir: &Path, filename: &str) -> Result<PathBuf, CifraError> {
        let mut file = self.file.take().ok_or_else(already_committed)?;

        for n in 0..MAX_NAME_ATTEMPTS {
            let target = dir.join(numbered_name(filename, n));
            if target.exists() {
                continue;
            }
            match file.persist_noclobber(&target) {
                Ok(_) => {
                    debug!("Committed download to {}", target.display());
                    return Ok(target);
                }
                // Lost a race for this name; try the next one.
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => file = e.file,
                Err(e) => return Err(save_failed(&target, e.error)),
            }
        }

        Err(save_failed(
            &dir.join(filename),
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{MAX_NAME_ATTEMPTS} numbered variants already exist"),
            ),
        ))
    }
}

impl Drop for ScopedDownload {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            debug!("Discarding uncommitted download {}", file.path().display());
        }
    }
}

/// `song.pdf`, `song (1).pdf`, `song (2).pdf`, ...
///
/// The stem is shortened when the suffix would push the name past NAME_MAX.
pub fn numbered_name(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    let (stem, ext) = split_extension(filename);
    let suffix = format!(" ({n})");
    let room = NAME_MAX.saturating_sub(suffix.len() + ext.len());
    let stem = truncate_at_char_boundary(stem, room);
    format!("{stem}{suffix}{ext}")
}

fn save_failed(path: &Path, source: io::Error) -> CifraError {
    CifraError::SaveFailed {
        path: path.to_path_buf(),
        source,
    }
}

fn already_committed() -> CifraError {
    CifraError::Internal("download already committed".into())
}
