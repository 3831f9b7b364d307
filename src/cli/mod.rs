//! Command-line interface module.
//!
//! This module defines the CLI structure using Clap, including
//! all commands, arguments, and options.
//!
//! # Commands
//!
//! - `chunk`: Chunk one or more checked-out repositories
//! - `init`: Create an example configuration file
//! - `validate`: Validate a configuration file
//!
//! # Example Usage
//!
//! ```bash
//! # Chunk a local checkout into ./output/<repo>/<repo>_0.jsonl
//! iacdrift chunk ./infra --repo-url https://github.com/acme/infra
//!
//! # Several checkouts, URLs matched by position
//! iacdrift chunk ./infra ./platform \
//!     --repo-url https://github.com/acme/infra \
//!     --repo-url https://github.com/acme/platform
//!
//! # Aggregate JSON to a file
//! iacdrift chunk ./infra --format json --output chunks.json
//!
//! # Initialize configuration
//! iacdrift init
//! ```

use crate::types::{OutputFormat, RepoTarget};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "iacdrift.yaml";

/// IaCDrift - Terraform configuration chunker for retrieval indexing.
#[derive(Parser, Debug)]
#[command(
    name = "iacdrift",
    author,
    version,
    about = "Terraform configuration chunker for retrieval indexing",
    long_about = "IaCDrift walks checked-out Terraform/OpenTofu repositories, parses HCL files, \
                  and emits one metadata-enriched chunk per configuration block, with exact \
                  source line ranges, ready for a retrieval index."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "IACDRIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk checked-out repositories
    #[command(visible_alias = "c")]
    Chunk(ChunkArgs),

    /// Create an example configuration file
    Init,

    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Arguments for the chunk command.
#[derive(Args, Debug)]
pub struct ChunkArgs {
    /// Repository checkouts to chunk; each is a separate repository
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Remote URL of each checkout, matched to PATH by position
    #[arg(long = "repo-url", value_name = "URL")]
    pub repo_urls: Vec<String>,

    /// Commit to record when a checkout has no readable HEAD, matched to PATH by position
    #[arg(long = "commit", value_name = "SHA")]
    pub commits: Vec<String>,

    /// Variables file used for `${var.name}` substitution (relative paths are
    /// resolved against each repository)
    #[arg(long = "vars", value_name = "FILE")]
    pub var_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "jsonl", value_enum)]
    pub format: OutputFormat,

    /// Output directory for jsonl, output file for json/text (stdout if not specified)
    #[arg(short, long, value_name = "DIR|FILE")]
    pub output: Option<PathBuf>,

    /// Base-name glob patterns of files to ignore
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,

    /// Worker threads for per-file processing
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Owner/account recorded on every chunk
    #[arg(long, value_name = "OWNER")]
    pub owner: Option<String>,
}

impl ChunkArgs {
    /// One target per path, with URL, commit and variables file attached.
    #[must_use]
    pub fn targets(&self) -> Vec<RepoTarget> {
        self.paths
            .iter()
            .enumerate()
            .map(|(i, path)| RepoTarget {
                path: path.clone(),
                url: self.repo_urls.get(i).cloned(),
                commit: self.commits.get(i).cloned(),
                var_file: self.var_file.as_ref().map(|file| {
                    if file.is_absolute() || file.exists() {
                        file.clone()
                    } else {
                        path.join(file)
                    }
                }),
            })
            .collect()
    }
}

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing() {
        // Verify CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_chunk_command() {
        let cli = Cli::parse_from(["iacdrift", "chunk", "./infra"]);
        match cli.command {
            Commands::Chunk(args) => {
                assert_eq!(args.paths, vec![PathBuf::from("./infra")]);
                assert_eq!(args.format, OutputFormat::Jsonl);
                assert!(args.output.is_none());
            }
            _ => panic!("Expected Chunk command"),
        }
    }

    #[test]
    fn test_chunk_requires_path() {
        assert!(Cli::try_parse_from(["iacdrift", "chunk"]).is_err());
    }

    #[test]
    fn test_chunk_with_options() {
        let cli = Cli::parse_from([
            "iacdrift",
            "chunk",
            "./infra",
            "--format",
            "json",
            "--output",
            "chunks.json",
            "--exclude",
            "*.auto.tfvars",
            "--workers",
            "4",
        ]);
        match cli.command {
            Commands::Chunk(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.output, Some(PathBuf::from("chunks.json")));
                assert_eq!(args.exclude_patterns, vec!["*.auto.tfvars".to_string()]);
                assert_eq!(args.workers, Some(4));
            }
            _ => panic!("Expected Chunk command"),
        }
    }

    #[test]
    fn test_targets_match_by_position() {
        let cli = Cli::parse_from([
            "iacdrift",
            "chunk",
            "/src/a",
            "/src/b",
            "--repo-url",
            "https://github.com/acme/a",
            "--commit",
            "1234567",
            "--vars",
            "terraform.tfvars",
        ]);
        let Commands::Chunk(args) = cli.command else {
            panic!("Expected Chunk command");
        };

        let targets = args.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].url.as_deref(), Some("https://github.com/acme/a"));
        assert_eq!(targets[0].commit.as_deref(), Some("1234567"));
        assert_eq!(targets[1].url, None);
        assert_eq!(targets[1].var_file, Some(PathBuf::from("/src/b/terraform.tfvars")));
    }

    #[test]
    fn test_init_command() {
        let cli = Cli::parse_from(["iacdrift", "init"]);
        assert!(matches!(cli.command, Commands::Init));
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["iacdrift", "validate", "custom.yaml"]);
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.config, PathBuf::from("custom.yaml"));
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::parse_from([
            "iacdrift",
            "-vvv",
            "--config",
            "custom.yaml",
            "chunk",
            "./infra",
        ]);
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
    }

    #[test]
    fn test_alias() {
        let cli = Cli::parse_from(["iacdrift", "c", "./infra"]);
        assert!(matches!(cli.command, Commands::Chunk(_)));
    }
}
