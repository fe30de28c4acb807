//! Pipeline orchestrator for resumable paraphrase generation.
//!
//! Drives the run as a per-item state machine: enumerate work items from the
//! example store, pick the resume point from the checkpoint store, process
//! each tag start-to-finish (generate, persist artifact, checkpoint), and
//! accumulate run statistics. Items are processed strictly sequentially to
//! respect external rate limits and keep the checkpoint/artifact ordering
//! crash-safe.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::dataset::ExampleStore;
use crate::error::DatasetError;
use crate::llm::Paraphraser;

use super::checkpoint::{CheckpointError, CheckpointStore};
use super::config::{ConfigError, GenerationConfig};
use super::writer::{ArtifactWriter, WriteError};

/// Errors that can occur during pipeline operations.
///
/// Generation failures of individual items are not errors at this level;
/// they become [`ItemOutcome::Failed`] and the run continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source dataset error.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Checkpoint store error.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Artifact write error.
    #[error("Artifact write error: {0}")]
    Artifact(#[from] WriteError),
}

/// Terminal state of one processed work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The full target count was generated and the artifact persisted.
    Success,
    /// Generation exhausted its retries; no artifact was written.
    Failed,
    /// The tag had no answer or no examples; nothing to do.
    Skipped,
}

impl std::fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemOutcome::Success => write!(f, "success"),
            ItemOutcome::Failed => write!(f, "failed"),
            ItemOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Running tallies over a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Items whose artifact was written.
    pub success: u64,
    /// Items that exhausted generation retries.
    pub failed: u64,
    /// Items with no answer or no examples.
    pub skipped: u64,
}

impl RunStats {
    /// Creates new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total items attempted.
    pub fn total_attempted(&self) -> u64 {
        self.success + self.failed + self.skipped
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Success => self.success += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Outcome tallies.
    pub stats: RunStats,
    /// Size of the enumerated work list.
    pub total_items: usize,
    /// Ordinal the run resumed from (0 for a fresh run).
    pub resumed_from: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Orchestrator owning the checkpoint lifecycle and the per-item loop.
pub struct PipelineOrchestrator {
    config: GenerationConfig,
    store: ExampleStore,
    paraphraser: Paraphraser,
    checkpoint: CheckpointStore,
    writer: ArtifactWriter,
}

impl PipelineOrchestrator {
    /// Creates a new orchestrator over a loaded store and generation client.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` when the configuration is invalid.
    pub fn new(
        config: GenerationConfig,
        store: ExampleStore,
        paraphraser: Paraphraser,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let checkpoint = CheckpointStore::new(config.checkpoint_path());
        let writer = ArtifactWriter::new(config.artifact_dir());

        Ok(Self {
            config,
            store,
            paraphraser,
            checkpoint,
            writer,
        })
    }

    /// Gets the current configuration.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Runs the pipeline to completion, resuming from the stored checkpoint.
    ///
    /// The checkpoint for ordinal `i` is written if and only if processing of
    /// ordinal `i` has fully finished, including any artifact write; a
    /// restart therefore always begins at a clean ordinal boundary.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let mut tags: Vec<String> = self.store.ordered_tags().to_vec();
        if let Some(limit) = self.config.limit {
            tags.truncate(limit);
            tracing::info!(limit = limit, "Test mode: truncated work list");
        }
        let total = tags.len();
        let start_time = Instant::now();

        if total == 0 {
            tracing::warn!("Work list is empty, nothing to do");
            return Ok(RunSummary {
                stats: RunStats::new(),
                total_items: 0,
                resumed_from: 0,
                elapsed: start_time.elapsed(),
            });
        }

        let start_index = self.resume_index(total).await?;
        if start_index > 0 {
            tracing::info!(
                resume_index = start_index,
                already_processed = start_index,
                "Resuming from checkpoint"
            );
        }

        self.writer.ensure_dir().await?;

        let mut stats = RunStats::new();
        for (i, tag) in tags.iter().enumerate().skip(start_index) {
            self.log_progress(i, start_index, total, &stats, start_time);

            let outcome = self.process_item(tag).await?;
            stats.record(outcome);

            // Artifact (if any) is durable before the cursor moves.
            self.checkpoint.write(i as i64).await?;

            tracing::info!(
                item = i + 1,
                total = total,
                tag = tag.as_str(),
                outcome = %outcome,
                success = stats.success,
                failed = stats.failed,
                skipped = stats.skipped,
                "Item finished"
            );

            if outcome == ItemOutcome::Success && !self.config.success_delay.is_zero() {
                tokio::time::sleep(self.config.success_delay).await;
            }
        }

        let summary = RunSummary {
            stats,
            total_items: total,
            resumed_from: start_index,
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            total = summary.total_items,
            success = stats.success,
            failed = stats.failed,
            skipped = stats.skipped,
            elapsed_secs = summary.elapsed.as_secs(),
            "Processing complete"
        );

        Ok(summary)
    }

    /// Compute the first ordinal to process, resetting a stale checkpoint.
    ///
    /// A stored ordinal pointing at or past the end of the current work list
    /// means the input shrank between runs; the marker is reset so no valid
    /// work is skipped.
    async fn resume_index(&self, total: usize) -> Result<usize, PipelineError> {
        let last_attempted = self.checkpoint.read().await?;
        let next = last_attempted + 1;

        if next >= total as i64 {
            if last_attempted >= 0 {
                tracing::warn!(
                    stored = last_attempted,
                    total = total,
                    "Checkpoint at or past end of work list, resetting to start"
                );
                self.checkpoint.reset().await?;
            }
            return Ok(0);
        }

        Ok(next.max(0) as usize)
    }

    /// Process a single work item through its state machine.
    ///
    /// Infrastructure failures (artifact IO) propagate and abort the run
    /// without advancing the checkpoint; generation failures do not.
    async fn process_item(&self, tag: &str) -> Result<ItemOutcome, PipelineError> {
        let Some(answer) = self.store.answer(tag) else {
            tracing::info!(tag = tag, "Skipped: no answer for tag");
            return Ok(ItemOutcome::Skipped);
        };

        let examples = self
            .store
            .sample_examples(tag, self.config.examples_per_tag);
        if examples.is_empty() {
            tracing::info!(tag = tag, "Skipped: no example questions for tag");
            return Ok(ItemOutcome::Skipped);
        }

        tracing::info!(
            tag = tag,
            examples = examples.len(),
            target = self.config.target_count,
            "Generating questions"
        );

        match self.paraphraser.generate(tag, answer, &examples).await {
            Ok(questions) => {
                let path = self.writer.write(tag, &questions).await?;
                tracing::info!(
                    tag = tag,
                    count = questions.len(),
                    path = %path.display(),
                    "Saved artifact"
                );
                Ok(ItemOutcome::Success)
            }
            Err(err) => {
                tracing::error!(tag = tag, error = %err, "Generation failed after retries");
                Ok(ItemOutcome::Failed)
            }
        }
    }

    /// Emit the advisory per-item progress line with an ETA estimate.
    fn log_progress(
        &self,
        index: usize,
        start_index: usize,
        total: usize,
        stats: &RunStats,
        start_time: Instant,
    ) {
        let progress_pct = ((index + 1) as f64 / total as f64) * 100.0;
        let eta_minutes = eta_minutes(index, start_index, total, start_time.elapsed());

        tracing::info!(
            item = index + 1,
            total = total,
            progress_pct = format!("{:.1}%", progress_pct),
            success = stats.success,
            failed = stats.failed,
            skipped = stats.skipped,
            eta_minutes = format!("{:.1}", eta_minutes),
            "Processing"
        );
    }
}

/// Estimate remaining minutes from the average time per processed item.
///
/// Advisory only; returns 0.0 until at least one item of this run finished.
fn eta_minutes(index: usize, start_index: usize, total: usize, elapsed: Duration) -> f64 {
    if index <= start_index {
        return 0.0;
    }
    let done = (index - start_index) as f64;
    let avg_secs = elapsed.as_secs_f64() / done;
    let remaining = total.saturating_sub(index + 1) as f64;
    avg_secs * remaining / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_outcome_display() {
        assert_eq!(format!("{}", ItemOutcome::Success), "success");
        assert_eq!(format!("{}", ItemOutcome::Failed), "failed");
        assert_eq!(format!("{}", ItemOutcome::Skipped), "skipped");
    }

    #[test]
    fn test_run_stats_record() {
        let mut stats = RunStats::new();
        stats.record(ItemOutcome::Success);
        stats.record(ItemOutcome::Success);
        stats.record(ItemOutcome::Failed);
        stats.record(ItemOutcome::Skipped);

        assert_eq!(stats.success, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.total_attempted(), 4);
    }

    #[test]
    fn test_eta_zero_before_first_completed_item() {
        assert_eq!(eta_minutes(3, 3, 10, Duration::from_secs(60)), 0.0);
    }

    #[test]
    fn test_eta_uses_average_per_item() {
        // 2 items took 120s -> 60s each; 7 remain after item index 2.
        let eta = eta_minutes(2, 0, 10, Duration::from_secs(120));
        assert!((eta - 7.0).abs() < 1e-9);
    }
}
