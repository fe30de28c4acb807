//! Tag-naming stage: turn (query, answer, id) rows into the two CSVs the
//! generation pipeline consumes.
//!
//! Queries sharing a group id are assumed semantically similar; each group
//! gets one short snake_case topic tag named by the LLM (a single stateless
//! call per group, no retry state), then the input is split into a
//! (question, tag) file and a (tag, answer) file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::dataset::{AnswerRecord, ExampleRecord};
use crate::error::{DatasetError, LlmError};
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::prompts::{build_tag_prompt, TAG_NAMING_SYSTEM};

/// Column names of the tagging input file.
#[derive(Debug, Clone)]
pub struct TaggingColumns {
    /// Column holding the user query.
    pub query: String,
    /// Column holding the canonical answer.
    pub answer: String,
    /// Column holding the group id shared by similar queries.
    pub id: String,
}

impl Default for TaggingColumns {
    fn default() -> Self {
        Self {
            query: "query".to_string(),
            answer: "answer".to_string(),
            id: "id".to_string(),
        }
    }
}

/// One usable input row.
#[derive(Debug, Clone)]
struct InputRow {
    query: String,
    group_id: String,
}

/// One group of similar queries sharing an id and an answer.
#[derive(Debug, Clone)]
pub struct QueryGroup {
    /// The group id from the input file.
    pub id: String,
    /// All queries in this group, in input order.
    pub queries: Vec<String>,
    /// The group's answer (first row's answer wins).
    pub answer: String,
}

/// Loaded and grouped tagging input.
#[derive(Debug, Clone)]
pub struct QueryDataset {
    rows: Vec<InputRow>,
    groups: Vec<QueryGroup>,
}

impl QueryDataset {
    /// Load (query, answer, id) rows from a CSV file.
    ///
    /// Validates that the configured columns exist (a configuration error
    /// otherwise) and drops rows with any empty field. Groups appear in
    /// first-seen order.
    pub fn load(path: &Path, columns: &TaggingColumns) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::ReadFailed {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let col = |name: &str| -> Result<usize, DatasetError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DatasetError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                    available: headers.clone(),
                })
        };
        let query_idx = col(&columns.query)?;
        let answer_idx = col(&columns.answer)?;
        let id_idx = col(&columns.id)?;

        let mut rows = Vec::new();
        let mut groups: Vec<QueryGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        for result in reader.records() {
            let record = result?;
            let query = record.get(query_idx).unwrap_or("").trim().to_string();
            let answer = record.get(answer_idx).unwrap_or("").trim().to_string();
            let group_id = record.get(id_idx).unwrap_or("").trim().to_string();

            if query.is_empty() || answer.is_empty() || group_id.is_empty() {
                continue;
            }

            let idx = *group_index.entry(group_id.clone()).or_insert_with(|| {
                groups.push(QueryGroup {
                    id: group_id.clone(),
                    queries: Vec::new(),
                    answer: answer.clone(),
                });
                groups.len() - 1
            });
            groups[idx].queries.push(query.clone());

            rows.push(InputRow { query, group_id });
        }

        if rows.is_empty() {
            return Err(DatasetError::EmptyDataset(path.to_path_buf()));
        }

        tracing::info!(
            rows = rows.len(),
            groups = groups.len(),
            path = %path.display(),
            "Loaded tagging input"
        );

        Ok(Self { rows, groups })
    }

    /// The groups in first-seen order.
    pub fn groups(&self) -> &[QueryGroup] {
        &self.groups
    }

    /// Number of usable input rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Names query groups via the LLM and splits the dataset for the pipeline.
pub struct GroupTagger {
    provider: Box<dyn LlmProvider>,
    model: String,
}

impl GroupTagger {
    /// Create a tagger over the given provider.
    pub fn new(provider: Box<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Generate one tag per group, in group order.
    ///
    /// A failed or empty naming call falls back to `tag_<id>` rather than
    /// failing the stage; duplicate names are made unique with a numeric
    /// suffix.
    pub async fn name_groups(&self, dataset: &QueryDataset) -> HashMap<String, String> {
        let mut used: HashSet<String> = HashSet::new();
        let mut assignment: HashMap<String, String> = HashMap::new();
        let total = dataset.groups().len();

        for (i, group) in dataset.groups().iter().enumerate() {
            let raw = match self.tag_for_group(group).await {
                Ok(tag) => tag,
                Err(err) => {
                    tracing::warn!(
                        group = group.id.as_str(),
                        error = %err,
                        "Tag naming failed, using fallback"
                    );
                    String::new()
                }
            };

            let mut tag = sanitize_tag(&raw);
            if tag.is_empty() {
                tag = format!("tag_{}", group.id);
            }

            // Keep tags unique across groups; artifact filenames depend on it.
            let base = tag.clone();
            let mut counter = 1;
            while used.contains(&tag) {
                tag = format!("{}_{}", base, counter);
                counter += 1;
            }

            used.insert(tag.clone());
            assignment.insert(group.id.clone(), tag);

            if (i + 1) % 10 == 0 || i + 1 == total {
                tracing::info!(processed = i + 1, total = total, "Named groups");
            }
        }

        assignment
    }

    /// One stateless naming call for a single group.
    async fn tag_for_group(&self, group: &QueryGroup) -> Result<String, LlmError> {
        let prompt = build_tag_prompt(&group.queries, &group.answer);
        let request = GenerationRequest::new(
            self.model.clone(),
            vec![Message::system(TAG_NAMING_SYSTEM), Message::user(prompt)],
        )
        .with_temperature(0.3)
        .with_max_tokens(50);

        let response = self.provider.generate(request).await?;
        response
            .first_content()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| LlmError::ParseError("No content in LLM response".to_string()))
    }
}

/// Normalize a raw tag into lowercase snake_case.
///
/// Spaces and hyphens become underscores; everything that is not
/// alphanumeric or underscore is dropped; leading and trailing underscores
/// are trimmed.
pub fn sanitize_tag(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Write the two pipeline input files from a tagged dataset.
///
/// `queries_tags.csv` holds (question, tag) in input-row order;
/// `tags_answers.csv` holds (tag, answer) in group order. Returns both
/// paths.
pub fn split_outputs(
    dataset: &QueryDataset,
    assignment: &HashMap<String, String>,
    output_dir: &Path,
) -> Result<(PathBuf, PathBuf), DatasetError> {
    std::fs::create_dir_all(output_dir)?;

    let queries_path = output_dir.join("queries_tags.csv");
    let answers_path = output_dir.join("tags_answers.csv");

    let mut writer = csv::Writer::from_path(&queries_path)?;
    for row in &dataset.rows {
        let tag = assignment
            .get(&row.group_id)
            .cloned()
            .unwrap_or_else(|| format!("tag_{}", row.group_id));
        writer.serialize(ExampleRecord {
            question: row.query.clone(),
            tag,
        })?;
    }
    writer.flush()?;

    let mut writer = csv::Writer::from_path(&answers_path)?;
    for group in &dataset.groups {
        let tag = assignment
            .get(&group.id)
            .cloned()
            .unwrap_or_else(|| format!("tag_{}", group.id));
        writer.serialize(AnswerRecord {
            tag,
            answer: group.answer.clone(),
        })?;
    }
    writer.flush()?;

    tracing::info!(
        queries = %queries_path.display(),
        answers = %answers_path.display(),
        "Wrote pipeline input files"
    );

    Ok((queries_path, answers_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerationResponse, Usage};
    use async_trait::async_trait;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    /// Provider that names every group identically, to exercise suffixing.
    struct ConstantProvider(&'static str);

    #[async_trait]
    impl LlmProvider for ConstantProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            Ok(GenerationResponse {
                model: "constant".to_string(),
                content: Some(self.0.to_string()),
                usage: Usage::default(),
            })
        }
    }

    fn input_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(
            b"query,answer,id\n\
              How do I vote?,Visit your polling station.,1\n\
              Voting process?,Visit your polling station.,1\n\
              Get NID card,Apply at the registration office.,2\n\
              ,missing query dropped,3\n",
        )
        .expect("write");
        file.flush().expect("flush");
        file
    }

    #[test]
    fn test_load_groups_and_drops_incomplete_rows() {
        let file = input_file();
        let dataset =
            QueryDataset::load(file.path(), &TaggingColumns::default()).expect("load");

        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.groups().len(), 2);
        assert_eq!(dataset.groups()[0].id, "1");
        assert_eq!(dataset.groups()[0].queries.len(), 2);
        assert_eq!(dataset.groups()[1].answer, "Apply at the registration office.");
    }

    #[test]
    fn test_load_missing_column_is_config_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"question,answer\nhello,hi\n").expect("write");
        file.flush().expect("flush");

        let err = QueryDataset::load(file.path(), &TaggingColumns::default()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
    }

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag("Voter Registration"), "voter_registration");
        assert_eq!(sanitize_tag("nid-card process"), "nid_card_process");
        assert_eq!(sanitize_tag("  _tag!!_  "), "tag");
        assert_eq!(sanitize_tag("???"), "");
    }

    #[tokio::test]
    async fn test_duplicate_names_get_numeric_suffixes() {
        let file = input_file();
        let dataset =
            QueryDataset::load(file.path(), &TaggingColumns::default()).expect("load");

        let tagger = GroupTagger::new(Box::new(ConstantProvider("Voting Info")), "m");
        let assignment = tagger.name_groups(&dataset).await;

        assert_eq!(assignment["1"], "voting_info");
        assert_eq!(assignment["2"], "voting_info_1");
    }

    #[tokio::test]
    async fn test_split_outputs_compose_with_pipeline_inputs() {
        let file = input_file();
        let dataset =
            QueryDataset::load(file.path(), &TaggingColumns::default()).expect("load");
        let tagger = GroupTagger::new(Box::new(ConstantProvider("topic")), "m");
        let assignment = tagger.name_groups(&dataset).await;

        let out = TempDir::new().expect("tempdir");
        let (queries_path, answers_path) =
            split_outputs(&dataset, &assignment, out.path()).expect("split");

        let queries = std::fs::read_to_string(&queries_path).expect("read");
        assert!(queries.starts_with("question,tag\n"));
        assert_eq!(queries.lines().count(), 4); // header + 3 rows

        let answers = std::fs::read_to_string(&answers_path).expect("read");
        assert!(answers.starts_with("tag,answer\n"));
        assert_eq!(answers.lines().count(), 3); // header + 2 groups
    }
}
