//! Per-tag prediction accuracy analysis.
//!
//! Aggregates an evaluation export (expected tag vs predicted tag per row)
//! into per-tag right/wrong counts and renders them as a sorted table. Counts
//! live in an ordered map keyed by tag so output order is deterministic and
//! accuracy is always derivable from the record itself.

use std::collections::BTreeMap;
use std::path::Path;

use crate::dataset::EvaluationRecord;
use crate::error::DatasetError;

/// Right/wrong tally for one tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagStats {
    /// Predictions matching the expected tag.
    pub right: u64,
    /// Predictions differing from the expected tag.
    pub wrong: u64,
}

impl TagStats {
    /// Total predictions for this tag.
    pub fn total(&self) -> u64 {
        self.right + self.wrong
    }

    /// Accuracy percentage (0.0 when the tag has no predictions).
    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.right as f64 / self.total() as f64 * 100.0
        }
    }
}

/// Sort key for the rendered analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    /// By total prediction count.
    Count,
    /// By accuracy percentage.
    Accuracy,
    /// Alphabetically by tag name (case-insensitive).
    Name,
}

/// Analyzer over an evaluation CSV.
#[derive(Debug, Clone, Default)]
pub struct TagAnalyzer {
    stats: BTreeMap<String, TagStats>,
}

impl TagAnalyzer {
    /// Load an evaluation export and compute per-tag statistics.
    ///
    /// `expected_col` and `predicted_col` name the two columns to compare;
    /// their absence is a configuration error.
    pub fn load(
        path: &Path,
        expected_col: &str,
        predicted_col: &str,
    ) -> Result<Self, DatasetError> {
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
        let expected_idx = col(expected_col)?;
        let predicted_idx = col(predicted_col)?;

        let mut stats: BTreeMap<String, TagStats> = BTreeMap::new();
        let mut total = 0u64;
        for result in reader.records() {
            let record = result?;
            let row = EvaluationRecord {
                expected: record.get(expected_idx).unwrap_or("").trim().to_string(),
                predicted: record.get(predicted_idx).unwrap_or("").trim().to_string(),
            };

            let entry = stats.entry(row.expected.clone()).or_default();
            if row.expected == row.predicted {
                entry.right += 1;
            } else {
                entry.wrong += 1;
            }
            total += 1;
        }

        tracing::info!(
            predictions = total,
            unique_tags = stats.len(),
            path = %path.display(),
            "Loaded evaluation results"
        );

        Ok(Self { stats })
    }

    /// Per-tag stats in tag order.
    pub fn stats(&self) -> &BTreeMap<String, TagStats> {
        &self.stats
    }

    /// Overall (right, wrong, accuracy%) across all tags.
    pub fn overall(&self) -> (u64, u64, f64) {
        let right: u64 = self.stats.values().map(|s| s.right).sum();
        let wrong: u64 = self.stats.values().map(|s| s.wrong).sum();
        let total = right + wrong;
        let accuracy = if total == 0 {
            0.0
        } else {
            right as f64 / total as f64 * 100.0
        };
        (right, wrong, accuracy)
    }

    /// Tags with their stats, sorted as requested.
    ///
    /// `descending` applies to count and accuracy sorts; the name sort is
    /// A-Z when `descending` is false. Ties fall back to tag order so the
    /// output is deterministic.
    pub fn sorted(&self, sort_by: SortBy, descending: bool) -> Vec<(&str, TagStats)> {
        let mut rows: Vec<(&str, TagStats)> = self
            .stats
            .iter()
            .map(|(tag, stats)| (tag.as_str(), *stats))
            .collect();

        match sort_by {
            SortBy::Count => rows.sort_by(|a, b| {
                let ord = a.1.total().cmp(&b.1.total()).then_with(|| a.0.cmp(b.0));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }),
            SortBy::Accuracy => rows.sort_by(|a, b| {
                let ord = a
                    .1
                    .accuracy()
                    .partial_cmp(&b.1.accuracy())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }),
            SortBy::Name => rows.sort_by(|a, b| {
                let ord = a.0.to_lowercase().cmp(&b.0.to_lowercase());
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }),
        }

        rows
    }

    /// Render the analysis as an aligned text table.
    pub fn render_table(&self, sort_by: SortBy, descending: bool, top_n: Option<usize>) -> String {
        let mut rows = self.sorted(sort_by, descending);
        let total_tags = rows.len();
        if let Some(n) = top_n {
            rows.truncate(n);
        }

        let (right, wrong, accuracy) = self.overall();
        let mut out = String::new();
        out.push_str(&format!(
            "Total predictions: {} | Right: {} | Wrong: {} | Overall accuracy: {:.2}%\n",
            right + wrong,
            right,
            wrong,
            accuracy
        ));
        out.push_str(&format!(
            "{:<4} {:<45} {:>8} {:>8} {:>8} {:>9}\n",
            "#", "Tag", "Right", "Wrong", "Total", "Accuracy"
        ));

        for (i, (tag, stats)) in rows.iter().enumerate() {
            let display_tag: String = if tag.chars().count() > 45 {
                let head: String = tag.chars().take(43).collect();
                format!("{}..", head)
            } else {
                tag.to_string()
            };
            out.push_str(&format!(
                "{:<4} {:<45} {:>8} {:>8} {:>8} {:>8.2}%\n",
                i + 1,
                display_tag,
                stats.right,
                stats.wrong,
                stats.total(),
                stats.accuracy()
            ));
        }

        if let Some(n) = top_n {
            if n < total_tags {
                out.push_str(&format!("Showing top {} of {} tags\n", n, total_tags));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn eval_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(
            b"expected tag,predicted tag\n\
              voting,voting\n\
              voting,nid_card\n\
              voting,voting\n\
              nid_card,nid_card\n",
        )
        .expect("write");
        file.flush().expect("flush");
        file
    }

    fn analyzer() -> TagAnalyzer {
        let file = eval_file();
        TagAnalyzer::load(file.path(), "expected tag", "predicted tag").expect("load")
    }

    #[test]
    fn test_per_tag_counts() {
        let analyzer = analyzer();
        let stats = analyzer.stats();

        assert_eq!(stats["voting"], TagStats { right: 2, wrong: 1 });
        assert_eq!(stats["nid_card"], TagStats { right: 1, wrong: 0 });
    }

    #[test]
    fn test_overall_accuracy() {
        let (right, wrong, accuracy) = analyzer().overall();
        assert_eq!(right, 3);
        assert_eq!(wrong, 1);
        assert!((accuracy - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_by_count_descending() {
        let analyzer = analyzer();
        let rows = analyzer.sorted(SortBy::Count, true);
        assert_eq!(rows[0].0, "voting"); // 3 predictions
        assert_eq!(rows[1].0, "nid_card"); // 1 prediction
    }

    #[test]
    fn test_sort_by_accuracy_ascending_puts_worst_first() {
        let analyzer = analyzer();
        let rows = analyzer.sorted(SortBy::Accuracy, false);
        assert_eq!(rows[0].0, "voting"); // 66.7% < 100%
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let file = eval_file();
        let err = TagAnalyzer::load(file.path(), "expected", "predicted tag").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
    }

    #[test]
    fn test_render_table_limits_rows() {
        let analyzer = analyzer();
        let table = analyzer.render_table(SortBy::Count, true, Some(1));
        assert!(table.contains("voting"));
        assert!(!table.contains("nid_card"));
        assert!(table.contains("Showing top 1 of 2 tags"));
    }

    #[test]
    fn test_empty_stats_accuracy_is_zero() {
        let stats = TagStats::default();
        assert_eq!(stats.accuracy(), 0.0);
    }
}
