//! Output generation module.
//!
//! This module hands chunk records to their consumers:
//! - JSONL: size-bounded line-delimited files per repository, the format
//!   the downstream indexer ingests
//! - JSON: one aggregate array, for inspection and piping
//! - Text: human-readable run summary
//!
//! # Example
//!
//! ```rust,no_run
//! use iacdrift::reporter::{JsonlWriter, Reporter};
//! use iacdrift::types::{ChunkRunResult, OutputFormat};
//! use iacdrift::Config;
//!
//! let config = Config::default();
//! let result = ChunkRunResult::default();
//!
//! let files = JsonlWriter::new(&config).write_all(&result)?;
//! let summary = Reporter::new(&config).generate(&result, OutputFormat::Text)?;
//! # Ok::<(), iacdrift::IacDriftError>(())
//! ```

mod json;
mod jsonl;
mod text;

use crate::config::Config;
use crate::error::Result;
use crate::types::{ChunkRunResult, OutputFormat};

pub use json::JsonReporter;
pub use jsonl::JsonlWriter;
pub use text::TextReporter;

/// Report generator that supports the in-memory output formats.
pub struct Reporter {
    config: Config,
}

impl Reporter {
    /// Create a new reporter with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Generate output in the specified format.
    ///
    /// JSONL output is written to disk by [`JsonlWriter`]; here it yields the
    /// text summary shown after the files are written.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn generate(&self, result: &ChunkRunResult, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => JsonReporter::new(&self.config).generate(result),
            OutputFormat::Text | OutputFormat::Jsonl => {
                TextReporter::new(&self.config).generate(result)
            }
        }
    }
}

/// Trait for report generators.
pub trait ReportGenerator {
    /// Generate a report from a chunking run.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    fn generate(&self, result: &ChunkRunResult) -> Result<String>;
}
