//! Pipeline configuration for the generation orchestrator.
//!
//! A single configuration object constructed once and passed into each
//! component; nothing in the pipeline reads process-wide mutable state.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::llm::RetryPolicy;

/// Subdirectory of the output directory holding per-tag artifacts.
const ARTIFACT_SUBDIR: &str = "individual_tags";

/// File name of the checkpoint inside the output directory.
const CHECKPOINT_FILE: &str = "progress.txt";

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// A required path is missing.
    #[error("Required path not set: {0}")]
    MissingPath(String),
}

/// Configuration for a paraphrase generation run.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// CSV of (question, tag) rows: real user questions per topic.
    pub examples_path: PathBuf,
    /// CSV of (tag, answer) rows: canonical answer per topic.
    pub answers_path: PathBuf,
    /// Directory receiving artifacts, the checkpoint and the merged output.
    pub output_dir: PathBuf,
    /// Number of paraphrased questions to generate per tag.
    pub target_count: usize,
    /// Number of example questions sampled into each prompt.
    pub examples_per_tag: usize,
    /// Sentinel tags excluded from the work list entirely.
    pub excluded_tags: Vec<String>,
    /// Model identifier; empty string selects the provider default.
    pub model: String,
    /// Retry schedule for individual generation calls.
    pub retry: RetryPolicy,
    /// Pause after each successful item, to respect service rate limits.
    pub success_delay: Duration,
    /// Process only the first `n` work items (test mode). `None` = all.
    pub limit: Option<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            examples_path: PathBuf::from("queries_tags.csv"),
            answers_path: PathBuf::from("tags_answers.csv"),
            output_dir: PathBuf::from("./paraphrased_output"),
            target_count: 200,
            examples_per_tag: 30,
            excluded_tags: vec!["fraction".to_string()],
            model: String::new(),
            retry: RetryPolicy::default(),
            success_delay: Duration::from_secs(1),
            limit: None,
        }
    }
}

impl GenerationConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the per-tag artifact files.
    pub fn artifact_dir(&self) -> PathBuf {
        self.output_dir.join(ARTIFACT_SUBDIR)
    }

    /// Path of the checkpoint file.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir.join(CHECKPOINT_FILE)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.examples_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("examples_path".to_string()));
        }
        if self.answers_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("answers_path".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("output_dir".to_string()));
        }
        if self.target_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "target_count".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.examples_per_tag == 0 {
            return Err(ConfigError::InvalidValue {
                key: "examples_per_tag".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.max_attempts".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(0) = self.limit {
            return Err(ConfigError::InvalidValue {
                key: "limit".to_string(),
                message: "must be greater than zero when set".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GenerationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_count, 200);
        assert_eq!(config.examples_per_tag, 30);
        assert_eq!(config.excluded_tags, vec!["fraction"]);
    }

    #[test]
    fn test_derived_paths() {
        let config = GenerationConfig {
            output_dir: PathBuf::from("/tmp/out"),
            ..Default::default()
        };
        assert_eq!(
            config.artifact_dir(),
            PathBuf::from("/tmp/out/individual_tags")
        );
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("/tmp/out/progress.txt")
        );
    }

    #[test]
    fn test_zero_target_count_rejected() {
        let config = GenerationConfig {
            target_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let config = GenerationConfig {
            limit: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_output_dir_rejected() {
        let config = GenerationConfig {
            output_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingPath(_))
        ));
    }
}
