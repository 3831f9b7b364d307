//! HCL parsing module for Terraform/OpenTofu files.
//!
//! This module turns configuration text into a [`ParsedConfig`] tree and
//! decides which files are worth parsing at all.
//!
//! # Components
//!
//! - [`FileClassifier`]: extension, ignore-glob and keyword-prefix checks
//! - [`HclParser`]: structural parse via `hcl-rs`
//! - [`tree`]: the configuration tree shared by the normalizers and chunkers
//!
//! A failed parse is an expected outcome. [`Parser::parse`] reports it as
//! [`ParseOutcome::Unparsed`] so callers branch on the variant and hand the
//! text to the fallback chunker.
//!
//! # Example
//!
//! ```rust
//! use iacdrift::parser::{HclParser, ParseOutcome, Parser};
//! use iacdrift::types::SourceFile;
//!
//! let source = SourceFile::new("main.tf", "main.tf", "provider \"aws\" {\n  region = \"us-east-1\"\n}\n");
//! match HclParser::new().parse(&source) {
//!     ParseOutcome::Parsed(config) => assert_eq!(config.blocks("provider").len(), 1),
//!     ParseOutcome::Unparsed { reason } => panic!("{reason}"),
//! }
//! ```

mod classify;
mod hcl;
pub mod tree;

pub use classify::FileClassifier;
pub use hcl::HclParser;
pub use tree::{Block, Body, CanonicalConfig, Entry, ParsedConfig};

use crate::types::SourceFile;
use std::path::Path;

/// File extensions that may hold configuration.
pub const CONFIG_EXTENSIONS: &[&str] = &["tf", "tfvars", "hcl"];

/// Top-level keywords that mark a `.tf`/`.hcl` file as relevant.
pub const TOP_LEVEL_KEYWORDS: &[&str] = &[
    "resource",
    "data",
    "module",
    "provider",
    "terraform",
    "variable",
    "output",
    "locals",
];

/// Result of a structural parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The file parsed into a configuration tree.
    Parsed(ParsedConfig),
    /// The file could not be parsed; no partial tree is kept.
    Unparsed {
        /// Parser diagnostic
        reason: String,
    },
}

/// Trait for parsing HCL content.
///
/// This trait allows for different parsing implementations
/// (e.g., for testing with stub parsers).
pub trait Parser: Send + Sync {
    /// Parse a single file's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the HCL content is invalid.
    fn parse_content(&self, content: &str, file_path: &Path) -> crate::Result<ParsedConfig>;

    /// Parse a source file, converting any failure into [`ParseOutcome::Unparsed`].
    fn parse(&self, source: &SourceFile) -> ParseOutcome {
        match self.parse_content(&source.text, &source.path) {
            Ok(config) => ParseOutcome::Parsed(config),
            Err(e) => {
                tracing::debug!(file = %source.path.display(), error = %e, "Structural parse failed");
                ParseOutcome::Unparsed { reason: e.to_string() }
            }
        }
    }
}
