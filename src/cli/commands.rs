//! CLI command definitions for paraforge.
//!
//! The full workflow is `tag` → `generate` → `merge`; each step is also
//! invocable on its own so a long generation run can be resumed or a merge
//! re-done without repeating upstream stages.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::analysis::{SortBy, TagAnalyzer};
use crate::dataset::ExampleStore;
use crate::llm::{LlmClient, Paraphraser, RetryPolicy};
use crate::merge;
use crate::pipeline::{GenerationConfig, PipelineOrchestrator};
use crate::tagging::{GroupTagger, QueryDataset, TaggingColumns};

/// Default output directory for the generation pipeline.
const DEFAULT_OUTPUT_DIR: &str = "./paraphrased_output";

/// Paraphrase-augmented QA dataset generator.
#[derive(Parser)]
#[command(name = "paraforge")]
#[command(about = "Tag, expand and merge QA training datasets with LLM paraphrase generation")]
#[command(version)]
#[command(
    long_about = "paraforge turns a labeled dataset of (query, answer, group) rows into a \
paraphrase-augmented training set.\n\nTypical workflow:\n  \
paraforge tag input.csv --output-dir ./out --generate\n  \
paraforge generate --examples ./out/queries_tags.csv --answers ./out/tags_answers.csv\n  \
paraforge merge --input-dir ./paraphrased_output/individual_tags"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Name query groups with topic tags and split into pipeline inputs.
    #[command(alias = "t")]
    Tag(TagArgs),

    /// Run the resumable paraphrase generation pipeline.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Merge per-tag artifacts into one dataset and validate it.
    Merge(MergeArgs),

    /// Report per-tag prediction accuracy from an evaluation export.
    Analyze(AnalyzeArgs),
}

/// Arguments for `paraforge tag`.
#[derive(Parser, Debug)]
pub struct TagArgs {
    /// Input CSV with query, answer and group-id columns.
    pub input_csv: PathBuf,

    /// Output directory for the split CSV files.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Name of the query column.
    #[arg(short, long, default_value = "query")]
    pub query_column: String,

    /// Name of the answer column.
    #[arg(short, long, default_value = "answer")]
    pub answer_column: String,

    /// Name of the group-id column (similar queries share an id).
    #[arg(short, long, default_value = "id")]
    pub id_column: String,

    /// Also run paraphrase generation and merge after tagging.
    #[arg(short, long)]
    pub generate: bool,

    /// Process only the first N tags when --generate is set.
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for `paraforge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// CSV of (question, tag) rows: real user questions per topic.
    #[arg(long, default_value = "queries_tags.csv")]
    pub examples: PathBuf,

    /// CSV of (tag, answer) rows: canonical answer per topic.
    #[arg(long, default_value = "tags_answers.csv")]
    pub answers: PathBuf,

    /// Output directory (artifacts, checkpoint, merged file).
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Number of questions to generate per tag.
    #[arg(short = 'n', long, default_value = "200")]
    pub count: usize,

    /// Number of example questions sampled into each prompt.
    #[arg(long, default_value = "30")]
    pub examples_per_tag: usize,

    /// Attempts per tag before marking it failed.
    #[arg(long, default_value = "3")]
    pub max_attempts: u32,

    /// Model identifier (defaults to PARAFORGE_MODEL or the provider default).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Tags excluded from the work list (sentinel placeholder values).
    #[arg(long = "exclude-tag", default_values = ["fraction"])]
    pub excluded_tags: Vec<String>,

    /// Process only the first N tags (test mode).
    #[arg(long)]
    pub limit: Option<usize>,

    /// Merge artifacts into one dataset after the run.
    #[arg(long)]
    pub merge: bool,
}

/// Arguments for `paraforge merge`.
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Directory containing the per-tag artifact files.
    #[arg(short, long, default_value = "./paraphrased_output/individual_tags")]
    pub input_dir: PathBuf,

    /// Output path (defaults to merged_dataset_<date>.csv beside the input).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Expected rows per tag for validation.
    #[arg(long, default_value = "200")]
    pub per_tag: usize,
}

/// Arguments for `paraforge analyze`.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Evaluation CSV with expected and predicted tag columns.
    pub csv_file: PathBuf,

    /// Sort order for the table.
    #[arg(short, long, value_enum, default_value = "count")]
    pub sort: SortArg,

    /// Show only the top N tags.
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Sort ascending instead of descending.
    #[arg(long)]
    pub ascending: bool,

    /// Name of the expected-tag column.
    #[arg(long, default_value = "expected tag")]
    pub expected_column: String,

    /// Name of the predicted-tag column.
    #[arg(long, default_value = "predicted tag")]
    pub predicted_column: String,
}

/// Sort order accepted on the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SortArg {
    /// By total prediction count.
    Count,
    /// By accuracy percentage.
    Accuracy,
    /// Alphabetically by tag name.
    Name,
}

impl From<SortArg> for SortBy {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Count => SortBy::Count,
            SortArg::Accuracy => SortBy::Accuracy,
            SortArg::Name => SortBy::Name,
        }
    }
}

/// Parse command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Execute the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Tag(args) => run_tag(args).await,
        Commands::Generate(args) => run_generate(args).await,
        Commands::Merge(args) => run_merge(args),
        Commands::Analyze(args) => run_analyze(args),
    }
}

/// Handle `paraforge tag`.
async fn run_tag(args: TagArgs) -> anyhow::Result<()> {
    let columns = TaggingColumns {
        query: args.query_column,
        answer: args.answer_column,
        id: args.id_column,
    };

    let dataset = QueryDataset::load(&args.input_csv, &columns)
        .with_context(|| format!("loading {}", args.input_csv.display()))?;

    let client = LlmClient::from_env().context("initializing LLM client")?;
    info!(
        api_base = client.api_base(),
        model = client.default_model(),
        key = client.api_key_masked(),
        "LLM client ready"
    );

    let tagger = GroupTagger::new(Box::new(client), "");
    let assignment = tagger.name_groups(&dataset).await;

    let (queries_path, answers_path) =
        crate::tagging::split_outputs(&dataset, &assignment, &args.output_dir)?;

    println!("Output files:");
    println!("  - {}", queries_path.display());
    println!("  - {}", answers_path.display());

    if args.generate {
        let output_dir = args.output_dir.join("paraphrased_output");
        let generate_args = GenerateArgs {
            examples: queries_path,
            answers: answers_path,
            output_dir,
            count: 200,
            examples_per_tag: 30,
            max_attempts: 3,
            model: None,
            excluded_tags: vec!["fraction".to_string()],
            limit: args.limit,
            merge: true,
        };
        run_generate(generate_args).await?;
    }

    Ok(())
}

/// Handle `paraforge generate`.
async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = GenerationConfig {
        examples_path: args.examples,
        answers_path: args.answers,
        output_dir: args.output_dir.clone(),
        target_count: args.count,
        examples_per_tag: args.examples_per_tag,
        excluded_tags: args.excluded_tags,
        model: args.model.unwrap_or_default(),
        retry: RetryPolicy {
            max_attempts: args.max_attempts,
            ..RetryPolicy::default()
        },
        success_delay: Duration::from_secs(1),
        limit: args.limit,
    };
    config.validate().context("invalid configuration")?;

    // Fail on missing credentials before any work is attempted.
    let client = LlmClient::from_env().context("initializing LLM client")?;
    info!(
        api_base = client.api_base(),
        model = client.default_model(),
        key = client.api_key_masked(),
        "LLM client ready"
    );

    let store = ExampleStore::load(
        &config.examples_path,
        &config.answers_path,
        &config.excluded_tags,
    )
    .context("loading source datasets")?;
    info!(tags = store.tag_count(), "Work list enumerated");

    let paraphraser = Paraphraser::new(
        Box::new(client),
        config.model.clone(),
        config.target_count,
        config.retry.clone(),
    );

    let orchestrator = PipelineOrchestrator::new(config.clone(), store, paraphraser)?;
    let summary = orchestrator.run().await?;

    println!("Processing complete!");
    println!("  Total tags:  {}", summary.total_items);
    println!("  Success:     {}", summary.stats.success);
    println!("  Failed:      {}", summary.stats.failed);
    println!("  Skipped:     {}", summary.stats.skipped);
    println!("  Elapsed:     {}s", summary.elapsed.as_secs());

    if args.merge {
        let merge_args = MergeArgs {
            input_dir: config.artifact_dir(),
            output: None,
            per_tag: config.target_count,
        };
        run_merge(merge_args)?;
    }

    Ok(())
}

/// Handle `paraforge merge`.
fn run_merge(args: MergeArgs) -> anyhow::Result<()> {
    let output = args.output.unwrap_or_else(|| default_merge_output(&args.input_dir));

    let outcome = merge::merge(&args.input_dir, &output)
        .with_context(|| format!("merging {}", args.input_dir.display()))?;

    let expected_total = outcome.artifacts_merged * args.per_tag;
    let report = merge::validate(&outcome.output_path, expected_total, args.per_tag)
        .context("validating merged output")?;
    report.log(args.per_tag);

    if report.is_clean() {
        info!("Validation passed");
    } else {
        warn!("Validation found issues; merged file was still produced");
    }

    println!(
        "Merged {} artifacts ({} rows) into {}",
        outcome.artifacts_merged,
        outcome.rows_written,
        outcome.output_path.display()
    );

    Ok(())
}

/// Handle `paraforge analyze`.
fn run_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let analyzer = TagAnalyzer::load(&args.csv_file, &args.expected_column, &args.predicted_column)
        .with_context(|| format!("loading {}", args.csv_file.display()))?;

    let table = analyzer.render_table(args.sort.into(), !args.ascending, args.top);
    println!("{}", table);

    Ok(())
}

/// Default merged-output path: dated file beside the artifact directory.
fn default_merge_output(input_dir: &std::path::Path) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    let parent = input_dir.parent().unwrap_or(input_dir);
    parent.join(format!("merged_dataset_{}.csv", date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["paraforge", "generate"]).expect("parse");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.count, 200);
        assert_eq!(args.examples_per_tag, 30);
        assert_eq!(args.max_attempts, 3);
        assert_eq!(args.excluded_tags, vec!["fraction"]);
        assert!(!args.merge);
    }

    #[test]
    fn test_generate_alias() {
        let cli = Cli::try_parse_from(["paraforge", "gen", "--count", "50"]).expect("parse");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.count, 50);
    }

    #[test]
    fn test_analyze_sort_values() {
        let cli = Cli::try_parse_from(["paraforge", "analyze", "eval.csv", "--sort", "accuracy"])
            .expect("parse");
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        assert!(matches!(args.sort, SortArg::Accuracy));
    }

    #[test]
    fn test_default_merge_output_is_dated_sibling() {
        let path = default_merge_output(std::path::Path::new("/data/out/individual_tags"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("merged_dataset_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(path.parent(), Some(std::path::Path::new("/data/out")));
    }
}
