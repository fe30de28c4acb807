//! CSV record types for the pipeline's file interfaces.

use serde::{Deserialize, Serialize};

/// One row of the examples source: a real user question and its topic tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExampleRecord {
    /// The question text as asked by a user.
    pub question: String,
    /// Topic tag grouping this question with semantically similar ones.
    pub tag: String,
}

/// One row of the answers source: a topic tag and its canonical answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Topic tag.
    pub tag: String,
    /// Canonical answer all questions under this tag lead to.
    pub answer: String,
}

/// One generated row: a paraphrased question paired with its originating tag.
///
/// This is the row schema of both per-tag artifacts and the merged dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedRecord {
    /// Generated paraphrased question.
    pub question: String,
    /// Tag the question was generated for.
    pub tag: String,
}

impl GeneratedRecord {
    /// Create a new generated record.
    pub fn new(question: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            tag: tag.into(),
        }
    }
}

/// One row of an evaluation export: the expected tag and the predicted tag.
///
/// Column names vary between evaluation exports, so this record is built
/// manually from configured column indices rather than derived by header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRecord {
    /// Tag the row should have been classified as.
    pub expected: String,
    /// Tag the classifier actually produced.
    pub predicted: String,
}
