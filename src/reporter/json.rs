//! JSON report generator.

use crate::config::Config;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::types::{ChunkRecord, ChunkRunResult, SkippedFile};
use serde::Serialize;

/// JSON report generator.
pub struct JsonReporter {
    /// Whether to pretty-print the output
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            pretty: config.output.pretty,
        }
    }
}

impl ReportGenerator for JsonReporter {
    fn generate(&self, result: &ChunkRunResult) -> Result<String> {
        let report = JsonReport::from(result);

        let json = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(json)
    }
}

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Total number of chunks
    pub total_chunks: usize,
    /// Sorted, de-duplicated owners
    pub owners: Vec<String>,
    /// Per-repository results
    pub repositories: Vec<JsonRepository<'a>>,
    /// Repositories that could not be processed
    pub failures: Vec<JsonFailure>,
}

/// Report metadata.
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    /// Tool version
    pub version: String,
    /// Generation time
    pub timestamp: String,
}

/// One repository's chunks.
#[derive(Debug, Serialize)]
pub struct JsonRepository<'a> {
    /// Repository URL
    pub repo: &'a str,
    /// Short commit SHA
    pub commit: &'a str,
    /// Relevant files found
    pub files_processed: usize,
    /// Files chunked by the fallback path
    pub fallback_files: usize,
    /// Files skipped because of an error
    pub skipped: &'a [SkippedFile],
    /// Chunk records
    pub chunks: &'a [ChunkRecord],
}

/// A repository that failed as a whole.
#[derive(Debug, Serialize)]
pub struct JsonFailure {
    /// Checkout path
    pub path: String,
    /// Cause
    pub error: String,
}

impl<'a> From<&'a ChunkRunResult> for JsonReport<'a> {
    fn from(result: &'a ChunkRunResult) -> Self {
        Self {
            metadata: ReportMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            total_chunks: result.total_chunks(),
            owners: result.owners(),
            repositories: result
                .repositories
                .iter()
                .map(|repo| JsonRepository {
                    repo: &repo.context.url,
                    commit: &repo.context.commit,
                    files_processed: repo.files_processed,
                    fallback_files: repo.fallback_files,
                    skipped: &repo.skipped,
                    chunks: &repo.records,
                })
                .collect(),
            failures: result
                .failures
                .iter()
                .map(|(path, error)| JsonFailure {
                    path: path.display().to_string(),
                    error: error.clone(),
                })
                .collect(),
        }
    }
}
