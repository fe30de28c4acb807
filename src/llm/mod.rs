//! LLM client layer.
//!
//! This module provides the chat-completions client used by both the
//! paraphrase generation pipeline and the tag-naming stage:
//!
//! - [`client`] - OpenAI-compatible HTTP client behind the [`LlmProvider`] trait
//! - [`paraphraser`] - bounded-retry paraphrase generation with response-shape
//!   validation

pub mod client;
pub mod paraphraser;

pub use client::{
    GenerationRequest, GenerationResponse, LlmClient, LlmProvider, Message, Usage,
};
pub use paraphraser::{Paraphraser, RetryPolicy};
