//! Durable single-integer progress marker.
//!
//! The checkpoint records the ordinal of the last work item whose processing
//! fully finished (success, failure or skip alike). It is written after every
//! item and must survive a crash immediately after the write returns, so the
//! update goes through a temp file, fsync and atomic rename.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The checkpoint file exists but does not hold a single integer.
    #[error("Corrupt checkpoint '{path}': {content:?}")]
    Corrupt { path: PathBuf, content: String },

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable store for the resume cursor.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last attempted ordinal, or `-1` if no run has recorded one.
    ///
    /// An absent or blank file reads as `-1`; any other unparsable content is
    /// an error rather than a silent restart from zero.
    pub async fn read(&self) -> Result<i64, CheckpointError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(-1),
            Err(e) => return Err(e.into()),
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(-1);
        }

        trimmed.parse::<i64>().map_err(|_| CheckpointError::Corrupt {
            path: self.path.clone(),
            content: trimmed.to_string(),
        })
    }

    /// Durably record `ordinal` as the last attempted work item.
    ///
    /// The value is on disk before this returns: written to a sibling temp
    /// file, fsynced, then renamed over the checkpoint path. Re-writing the
    /// same ordinal is a no-op in effect, so retries are safe.
    pub async fn write(&self, ordinal: i64) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(ordinal.to_string().as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Reset the marker to the never-run state.
    pub async fn reset(&self) -> Result<(), CheckpointError> {
        self.write(-1).await
    }
}
