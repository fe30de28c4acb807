//! Merge per-tag artifacts into one dataset and validate the result.
//!
//! Merging concatenates every artifact found in the artifact directory, in
//! filename (= tag) order, preserving per-artifact row order. Validation
//! re-reads the combined output and *reports* structural violations: a bad
//! merge is surfaced to the operator, never silently discarded, and the
//! merged artifact is produced regardless.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dataset::GeneratedRecord;
use crate::error::MergeError;

/// Result of a merge: where the combined file landed and what went into it.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Path of the combined output file.
    pub output_path: PathBuf,
    /// Total data rows written.
    pub rows_written: usize,
    /// Number of artifact files merged.
    pub artifacts_merged: usize,
}

/// Structural findings from re-reading a merged output file.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Rows the output was expected to contain.
    pub expected_total: usize,
    /// Rows the output actually contains.
    pub actual_total: usize,
    /// Number of distinct tags present.
    pub unique_tags: usize,
    /// Tags whose row count differs from the expected per-tag count,
    /// with their actual counts, in tag order.
    pub tag_count_mismatches: Vec<(String, usize)>,
    /// Rows with an empty question or tag field.
    pub empty_field_rows: usize,
}

impl ValidationReport {
    /// Whether the output passed every structural check.
    pub fn is_clean(&self) -> bool {
        self.actual_total == self.expected_total
            && self.tag_count_mismatches.is_empty()
            && self.empty_field_rows == 0
    }

    /// Log the findings; warnings for violations, info when clean.
    pub fn log(&self, expected_per_tag: usize) {
        if self.actual_total != self.expected_total {
            tracing::warn!(
                expected = self.expected_total,
                actual = self.actual_total,
                "Merged row count mismatch"
            );
        } else {
            tracing::info!(rows = self.actual_total, "Row count matches");
        }

        if self.tag_count_mismatches.is_empty() {
            tracing::info!(
                per_tag = expected_per_tag,
                unique_tags = self.unique_tags,
                "Each tag appears the expected number of times"
            );
        } else {
            for (tag, count) in &self.tag_count_mismatches {
                tracing::warn!(
                    tag = tag.as_str(),
                    expected = expected_per_tag,
                    actual = count,
                    "Tag has unexpected row count"
                );
            }
        }

        if self.empty_field_rows > 0 {
            tracing::warn!(rows = self.empty_field_rows, "Rows with empty fields");
        }
    }
}

/// List the artifact files in a directory, sorted ascending by filename.
///
/// Filename order is tag order, which fixes the ordering of the merged
/// output.
pub fn sorted_artifacts(artifact_dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(artifact_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Concatenate all artifacts in `artifact_dir` into `output_path`.
///
/// # Errors
///
/// Returns [`MergeError::NoArtifacts`] when the directory holds no CSV
/// files, and read/write errors from the underlying IO.
pub fn merge(artifact_dir: &Path, output_path: &Path) -> Result<MergeOutcome, MergeError> {
    let files = sorted_artifacts(artifact_dir)?;
    if files.is_empty() {
        return Err(MergeError::NoArtifacts(artifact_dir.to_path_buf()));
    }

    tracing::info!(artifacts = files.len(), "Merging artifact files");

    let mut merged: Vec<GeneratedRecord> = Vec::new();
    for path in &files {
        let rows = read_artifact(path)?;
        if rows.is_empty() {
            tracing::warn!(path = %path.display(), "No data found in artifact");
        }
        merged.extend(rows);
    }

    let mut writer = csv::Writer::from_path(output_path)?;
    for record in &merged {
        writer.serialize(record)?;
    }
    writer.flush().map_err(MergeError::Io)?;

    tracing::info!(
        rows = merged.len(),
        output = %output_path.display(),
        "Merge written"
    );

    Ok(MergeOutcome {
        output_path: output_path.to_path_buf(),
        rows_written: merged.len(),
        artifacts_merged: files.len(),
    })
}

/// Re-read a merged output and check its structural invariants.
///
/// `expected_total` is the row count the merge should have produced
/// (per-tag count × artifacts merged); `expected_per_tag` is the row count
/// every tag should have. Violations are collected, not raised.
pub fn validate(
    output_path: &Path,
    expected_total: usize,
    expected_per_tag: usize,
) -> Result<ValidationReport, MergeError> {
    let rows = read_artifact(output_path)?;

    let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut empty_field_rows = 0usize;
    for row in &rows {
        *tag_counts.entry(row.tag.clone()).or_insert(0) += 1;
        if row.question.is_empty() || row.tag.is_empty() {
            empty_field_rows += 1;
        }
    }

    let tag_count_mismatches: Vec<(String, usize)> = tag_counts
        .iter()
        .filter(|(_, &count)| count != expected_per_tag)
        .map(|(tag, &count)| (tag.clone(), count))
        .collect();

    Ok(ValidationReport {
        expected_total,
        actual_total: rows.len(),
        unique_tags: tag_counts.len(),
        tag_count_mismatches,
        empty_field_rows,
    })
}

/// Read all rows of one artifact (or merged) file.
fn read_artifact(path: &Path) -> Result<Vec<GeneratedRecord>, MergeError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|source| MergeError::ArtifactReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<GeneratedRecord>() {
        rows.push(result.map_err(|source| MergeError::ArtifactReadFailed {
            path: path.to_path_buf(),
            source,
        })?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_artifact(dir: &Path, tag: &str, rows: usize) {
        let mut writer = csv::Writer::from_path(dir.join(format!("{}.csv", tag))).expect("open");
        for i in 0..rows {
            writer
                .serialize(GeneratedRecord::new(format!("{} question {}", tag, i), tag))
                .expect("serialize");
        }
        writer.flush().expect("flush");
    }

    #[test]
    fn test_merge_concatenates_in_tag_order() {
        let dir = TempDir::new().expect("tempdir");
        let out_dir = TempDir::new().expect("tempdir");
        write_artifact(dir.path(), "voting", 3);
        write_artifact(dir.path(), "nid_card", 3);

        let output = out_dir.path().join("merged.csv");
        let outcome = merge(dir.path(), &output).expect("merge");

        assert_eq!(outcome.rows_written, 6);
        assert_eq!(outcome.artifacts_merged, 2);

        let rows = read_artifact(&output).expect("read merged");
        // nid_card sorts before voting; per-artifact row order preserved.
        assert_eq!(rows[0].tag, "nid_card");
        assert_eq!(rows[0].question, "nid_card question 0");
        assert_eq!(rows[3].tag, "voting");
        assert_eq!(rows[5].question, "voting question 2");
    }

    #[test]
    fn test_merge_empty_dir_is_error() {
        let dir = TempDir::new().expect("tempdir");
        let output = dir.path().join("merged.csv");
        assert!(matches!(
            merge(dir.path(), &output),
            Err(MergeError::NoArtifacts(_))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_validate_clean_merge() {
        let dir = TempDir::new().expect("tempdir");
        let out_dir = TempDir::new().expect("tempdir");
        write_artifact(dir.path(), "voting", 4);
        write_artifact(dir.path(), "nid_card", 4);

        let output = out_dir.path().join("merged.csv");
        let outcome = merge(dir.path(), &output).expect("merge");

        let report = validate(&output, outcome.artifacts_merged * 4, 4).expect("validate");
        assert!(report.is_clean());
        assert_eq!(report.actual_total, 8);
        assert_eq!(report.unique_tags, 2);
    }

    #[test]
    fn test_validate_flags_only_the_short_tag() {
        let dir = TempDir::new().expect("tempdir");
        let out_dir = TempDir::new().expect("tempdir");
        write_artifact(dir.path(), "voting", 4);
        write_artifact(dir.path(), "nid_card", 3); // one row short

        let output = out_dir.path().join("merged.csv");
        let outcome = merge(dir.path(), &output).expect("merge");

        let report = validate(&output, outcome.artifacts_merged * 4, 4).expect("validate");
        assert!(!report.is_clean());
        assert_eq!(report.actual_total, 7);
        assert_eq!(
            report.tag_count_mismatches,
            vec![("nid_card".to_string(), 3)]
        );
    }

    #[test]
    fn test_validate_counts_empty_fields() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("merged.csv");
        let mut writer = csv::Writer::from_path(&path).expect("open");
        writer
            .serialize(GeneratedRecord::new("", "voting"))
            .expect("serialize");
        writer
            .serialize(GeneratedRecord::new("fine", "voting"))
            .expect("serialize");
        writer.flush().expect("flush");

        let report = validate(&path, 2, 2).expect("validate");
        assert_eq!(report.empty_field_rows, 1);
        assert!(!report.is_clean());
    }
}
