//! paraforge: paraphrase-augmented QA dataset pipeline.
//!
//! This library turns a labeled dataset of (query, answer, group) rows into a
//! larger paraphrase-augmented training set: each query group is tagged with a
//! human-readable topic label, each tag is expanded into many paraphrased
//! questions via an LLM, and the per-tag results are merged into one validated
//! dataset.

// Core modules
pub mod analysis;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod merge;
pub mod pipeline;
pub mod prompts;
pub mod tagging;

// Re-export commonly used error types
pub use error::{DatasetError, LlmError, MergeError};
