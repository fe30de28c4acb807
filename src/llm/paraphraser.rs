//! Bounded-retry paraphrase generation.
//!
//! Wraps a single "generate N paraphrased questions" call to an LLM provider
//! with response-shape validation and bounded retries. One call to
//! [`Paraphraser::generate`] corresponds to one work item in the pipeline; no
//! partial state is retained across attempts within a call.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::LlmError;
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::prompts::build_paraphrase_prompt;

/// System prompt framing for all paraphrase requests.
const PARAPHRASE_SYSTEM: &str =
    "You are a training-data author for a question-answering system. \
     Output only the requested questions, one per line, numbered.";

/// Leading enumeration prefix: digits followed by dots, parens, dashes
/// or spaces, in any mix ("1. ", "12)", "3 - ").
static ENUM_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[\s.)\-]*").expect("static regex must compile"));

/// Retry schedule for a single generation call.
///
/// Delays are injectable so tests can simulate all attempts without real
/// waiting. A hard transport/API fault waits longer than a merely short
/// response before the next attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts (first try included).
    pub max_attempts: u32,
    /// Delay before retrying after a short or malformed response.
    pub shortfall_delay: Duration,
    /// Delay before retrying after a transport or API fault.
    pub fault_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            shortfall_delay: Duration::from_secs(2),
            fault_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt bound and zero delays, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            shortfall_delay: Duration::ZERO,
            fault_delay: Duration::ZERO,
        }
    }

    /// Delay to apply before the next attempt, given the last failure.
    fn delay_for(&self, error: &LlmError) -> Duration {
        match error {
            LlmError::ShortResponse { .. } | LlmError::ParseError(_) => self.shortfall_delay,
            _ => self.fault_delay,
        }
    }
}

/// Generation client: asks the provider for exactly `target_count`
/// paraphrased questions per tag, retrying on transient failures.
pub struct Paraphraser {
    provider: Box<dyn LlmProvider>,
    model: String,
    target_count: usize,
    policy: RetryPolicy,
}

impl Paraphraser {
    /// Create a new paraphraser over the given provider.
    pub fn new(
        provider: Box<dyn LlmProvider>,
        model: impl Into<String>,
        target_count: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            target_count,
            policy,
        }
    }

    /// The number of questions a successful call returns.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Generate exactly `target_count` paraphrased questions for a tag.
    ///
    /// Issues one request per attempt. A response parsing to fewer than
    /// `target_count` usable lines counts as a failed attempt; excess lines
    /// are truncated on success. After exhausting the retry policy this
    /// returns [`LlmError::AttemptsExhausted`], an error value the caller
    /// records as a failed item, never a panic.
    pub async fn generate(
        &self,
        tag: &str,
        answer: &str,
        examples: &[String],
    ) -> Result<Vec<String>, LlmError> {
        let prompt = build_paraphrase_prompt(answer, examples, self.target_count);
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=self.policy.max_attempts {
            if let Some(ref err) = last_error {
                let delay = self.policy.delay_for(err);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                tracing::debug!(
                    tag = tag,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying paraphrase generation"
                );
            }

            match self.attempt(&prompt).await {
                Ok(questions) => return Ok(questions),
                Err(err) if err.is_transient() => {
                    tracing::warn!(
                        tag = tag,
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "Paraphrase generation attempt failed"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(LlmError::AttemptsExhausted {
            tag: tag.to_string(),
            attempts: self.policy.max_attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// One request/parse/validate cycle.
    async fn attempt(&self, prompt: &str) -> Result<Vec<String>, LlmError> {
        let request = GenerationRequest::new(
            self.model.clone(),
            vec![Message::system(PARAPHRASE_SYSTEM), Message::user(prompt)],
        );

        let response = self.provider.generate(request).await?;
        let content = response
            .first_content()
            .ok_or_else(|| LlmError::ParseError("No content in LLM response".to_string()))?;

        let mut questions = parse_question_lines(content);
        if questions.len() < self.target_count {
            return Err(LlmError::ShortResponse {
                got: questions.len(),
                expected: self.target_count,
            });
        }

        questions.truncate(self.target_count);
        Ok(questions)
    }
}

/// Parse a free-form response into question lines.
///
/// Splits on line breaks, drops blank lines, strips a leading enumeration
/// prefix and trims whitespace. Tolerates inconsistent numbering and extra
/// whitespace; count validation is the caller's job.
pub fn parse_question_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| ENUM_PREFIX.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
