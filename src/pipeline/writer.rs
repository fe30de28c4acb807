//! Atomic per-tag artifact persistence.
//!
//! Each successfully processed tag becomes one self-contained CSV artifact
//! named after the tag: a header row and exactly one data row per generated
//! question. The artifact write is the durability boundary of the pipeline
//! (once it returns, the item is permanently done), so the file appears via
//! temp-file-and-rename, never partially written in place.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::dataset::GeneratedRecord;

/// Errors that can occur while writing an artifact.
#[derive(Debug, Error)]
pub enum WriteError {
    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writer for per-tag artifact files.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Create a writer targeting the given artifact directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic artifact path for a tag.
    pub fn artifact_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", tag))
    }

    /// Ensure the artifact directory exists.
    pub async fn ensure_dir(&self) -> Result<(), WriteError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Persist one tag's generated questions as a complete artifact.
    ///
    /// Writes a `question,tag` header and exactly `questions.len()` rows.
    /// Re-running the same tag overwrites its prior artifact with an
    /// equivalent one. Returns the final artifact path.
    pub async fn write(&self, tag: &str, questions: &[String]) -> Result<PathBuf, WriteError> {
        let mut csv_writer = csv::Writer::from_writer(Vec::new());
        for question in questions {
            csv_writer.serialize(GeneratedRecord::new(question, tag))?;
        }
        let data = csv_writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let final_path = self.artifact_path(tag);
        let tmp_path = self.dir.join(format!(".{}.csv.tmp", tag));

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(final_path)
    }
}
