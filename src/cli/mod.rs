//! Command-line interface for paraforge.
//!
//! Provides commands for tag generation, paraphrase expansion, artifact
//! merging and accuracy analysis.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
