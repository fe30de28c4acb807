//! Tag-indexed store of source examples and answers.
//!
//! Loads the two source CSVs the generation pipeline consumes and exposes the
//! views the orchestrator needs: the deterministic ordered tag list (the
//! contract the numeric checkpoint depends on), the tag → answer lookup, and
//! random example sampling per tag.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rand::seq::IndexedRandom;

use crate::dataset::{AnswerRecord, ExampleRecord};
use crate::error::DatasetError;

/// Indexed view over the examples and answers source files.
#[derive(Debug, Clone)]
pub struct ExampleStore {
    /// Tag → all non-empty example questions seen for that tag.
    examples_by_tag: HashMap<String, Vec<String>>,
    /// Tag → canonical answer.
    answer_by_tag: HashMap<String, String>,
    /// Deduplicated tags from the examples source, sorted case-insensitively.
    ordered_tags: Vec<String>,
}

impl ExampleStore {
    /// Load and index the examples and answers sources.
    ///
    /// Tags listed in `excluded_tags` (sentinel placeholder values) are
    /// dropped entirely. Rows with an empty question are excluded from the
    /// example index but their tag still appears in the work list, so the
    /// orchestrator can report such tags as skipped rather than silently
    /// losing them.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingColumn`] when a source file lacks the
    /// expected header, and IO/CSV errors from the underlying reads.
    pub fn load(
        examples_path: &Path,
        answers_path: &Path,
        excluded_tags: &[String],
    ) -> Result<Self, DatasetError> {
        let excluded: HashSet<&str> = excluded_tags.iter().map(String::as_str).collect();

        let mut reader = open_checked(examples_path, &["question", "tag"])?;
        let mut examples_by_tag: HashMap<String, Vec<String>> = HashMap::new();
        let mut seen_tags: HashSet<String> = HashSet::new();

        for result in reader.deserialize::<ExampleRecord>() {
            let record = result?;
            let tag = record.tag.trim();
            if tag.is_empty() || excluded.contains(tag) {
                continue;
            }
            seen_tags.insert(tag.to_string());

            let question = record.question.trim();
            if question.is_empty() {
                continue;
            }
            examples_by_tag
                .entry(tag.to_string())
                .or_default()
                .push(question.to_string());
        }

        let mut reader = open_checked(answers_path, &["tag", "answer"])?;
        let mut answer_by_tag = HashMap::new();
        for result in reader.deserialize::<AnswerRecord>() {
            let record = result?;
            answer_by_tag.insert(record.tag, record.answer);
        }

        // Case-insensitive ascending, raw comparison as tie-break so the
        // ordinal assignment is identical on every run over the same input.
        let mut ordered_tags: Vec<String> = seen_tags.into_iter().collect();
        ordered_tags.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });

        Ok(Self {
            examples_by_tag,
            answer_by_tag,
            ordered_tags,
        })
    }

    /// The work list: every tag from the examples source, in checkpoint order.
    pub fn ordered_tags(&self) -> &[String] {
        &self.ordered_tags
    }

    /// Number of tags in the work list.
    pub fn tag_count(&self) -> usize {
        self.ordered_tags.len()
    }

    /// Canonical answer for a tag, if one exists in the answers source.
    pub fn answer(&self, tag: &str) -> Option<&str> {
        self.answer_by_tag.get(tag).map(String::as_str)
    }

    /// Number of indexed example questions for a tag.
    pub fn example_count(&self, tag: &str) -> usize {
        self.examples_by_tag.get(tag).map_or(0, Vec::len)
    }

    /// Draw up to `k` example questions for a tag, without replacement.
    ///
    /// Returns all available examples when fewer than `k` exist, and an empty
    /// vector for an unknown tag; the caller treats that as "nothing to do",
    /// not a fault.
    pub fn sample_examples(&self, tag: &str, k: usize) -> Vec<String> {
        let Some(available) = self.examples_by_tag.get(tag) else {
            return Vec::new();
        };

        if available.len() <= k {
            return available.clone();
        }

        available
            .choose_multiple(&mut rand::rng(), k)
            .cloned()
            .collect()
    }
}

/// Open a headered CSV reader, verifying the required columns are present.
fn open_checked(
    path: &Path,
    required: &[&str],
) -> Result<csv::Reader<std::fs::File>, DatasetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::ReadFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    for column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(DatasetError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
                available: headers,
            });
        }
    }

    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file.flush().expect("flush");
        file
    }

    fn sample_store() -> ExampleStore {
        let examples = write_csv(
            "question,tag\n\
             How do I vote?,voting\n\
             Where to vote?,voting\n\
             What is voting?,Voting_hours\n\
             ,empty_only\n\
             junk,fraction\n",
        );
        let answers = write_csv(
            "tag,answer\n\
             voting,Go to your polling station.\n\
             Voting_hours,Polls open at 8am.\n",
        );
        ExampleStore::load(
            examples.path(),
            answers.path(),
            &["fraction".to_string()],
        )
        .expect("load")
    }

    #[test]
    fn test_ordered_tags_case_insensitive_and_excludes_sentinel() {
        let store = sample_store();
        // "fraction" excluded; "empty_only" kept (its rows had no question,
        // but the tag was seen); sorted case-insensitively.
        assert_eq!(
            store.ordered_tags(),
            &["empty_only", "voting", "Voting_hours"]
        );
    }

    #[test]
    fn test_empty_question_rows_not_indexed() {
        let store = sample_store();
        assert_eq!(store.example_count("empty_only"), 0);
        assert!(store.sample_examples("empty_only", 5).is_empty());
    }

    #[test]
    fn test_answer_lookup() {
        let store = sample_store();
        assert_eq!(store.answer("voting"), Some("Go to your polling station."));
        assert_eq!(store.answer("empty_only"), None);
    }

    #[test]
    fn test_sample_returns_all_when_fewer_than_k() {
        let store = sample_store();
        let sample = store.sample_examples("voting", 10);
        assert_eq!(sample.len(), 2);
    }

    #[test]
    fn test_sample_draws_exactly_k_without_replacement() {
        let examples_csv: String = std::iter::once("question,tag\n".to_string())
            .chain((0..50).map(|i| format!("question number {},big\n", i)))
            .collect();
        let examples = write_csv(&examples_csv);
        let answers = write_csv("tag,answer\nbig,answer text\n");
        let store = ExampleStore::load(examples.path(), answers.path(), &[]).expect("load");

        let sample = store.sample_examples("big", 30);
        assert_eq!(sample.len(), 30);

        let unique: HashSet<&String> = sample.iter().collect();
        assert_eq!(unique.len(), 30, "sample must not repeat examples");
    }

    #[test]
    fn test_unknown_tag_samples_empty() {
        let store = sample_store();
        assert!(store.sample_examples("nonexistent", 5).is_empty());
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let examples = write_csv("text,label\nhello,voting\n");
        let answers = write_csv("tag,answer\nvoting,hi\n");
        let err = ExampleStore::load(examples.path(), answers.path(), &[]).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
    }
}
