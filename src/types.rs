//! Core data types used throughout IaCDrift.
//!
//! This module defines the fundamental data structures for representing:
//! - Source files and their classification
//! - Raw chunks produced by the structured and fallback chunkers
//! - Final chunk records handed to persistence
//! - Per-repository and per-run results

use crate::error::{IacDriftError, Result};
use crate::git::RepoContext;
use crate::parser::Block;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Record type written on every chunk.
pub const RECORD_TYPE: &str = "iac_configuration";

/// Classification of a candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// `.tf` / `.hcl` file containing a recognizable top-level keyword
    Terraform,
    /// `.tfvars` variable definitions
    Tfvars,
    /// Anything else; excluded from processing
    Unknown,
}

impl FileKind {
    /// True for kinds that go through the chunking pipeline.
    #[must_use]
    pub const fn is_relevant(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terraform => write!(f, "terraform"),
            Self::Tfvars => write!(f, "tfvars"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A file's path and text, read once per processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as found on disk
    pub path: PathBuf,
    /// Path relative to the repository root, `/`-separated
    pub relative: String,
    /// Full text content
    pub text: String,
}

impl SourceFile {
    /// Create a source file from in-memory text.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
            text: text.into(),
        }
    }

    /// Read a file below `root`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `NotText` if it is not UTF-8.
    pub fn read(path: &Path, root: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| IacDriftError::io(path, e, file!(), line!()))?;
        let text = String::from_utf8(bytes).map_err(|_| crate::err!(NotText {
            path: path.to_path_buf(),
        }))?;

        Ok(Self {
            path: path.to_path_buf(),
            relative: relative_display(path, root),
            text,
        })
    }

    /// Number of lines in the file.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    /// Base name of the file.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }
}

/// Render `path` relative to `root` with `/` separators.
#[must_use]
pub fn relative_display(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        path.to_string_lossy().into_owned()
    } else {
        parts.join("/")
    }
}

/// The kind of block a chunk was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// `terraform { ... }`
    Terraform,
    /// `provider "name" { ... }`
    Provider,
    /// `resource "type" "name" { ... }`
    Resource,
    /// `module "name" { ... }`
    Module,
    /// `data "type" "name" { ... }`
    Data,
    /// `variable "name" { ... }`
    Variable,
    /// `output "name" { ... }`
    Output,
    /// `locals { ... }`
    Locals,
    /// `import { ... }`, only recognized by the fallback chunker
    Import,
    /// Line window of a file no block could be recovered from
    Fallback,
    /// Whole `.tfvars` file
    Tfvars,
}

impl ChunkKind {
    /// Block types walked by the structured generator, in emission order.
    pub const BLOCK_ORDER: [Self; 8] = [
        Self::Terraform,
        Self::Provider,
        Self::Resource,
        Self::Module,
        Self::Data,
        Self::Variable,
        Self::Output,
        Self::Locals,
    ];

    /// Keyword as written in HCL (or the synthetic tag).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
            Self::Provider => "provider",
            Self::Resource => "resource",
            Self::Module => "module",
            Self::Data => "data",
            Self::Variable => "variable",
            Self::Output => "output",
            Self::Locals => "locals",
            Self::Import => "import",
            Self::Fallback => "fallback",
            Self::Tfvars => "tfvars",
        }
    }

    /// Parse a block keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "terraform" => Some(Self::Terraform),
            "provider" => Some(Self::Provider),
            "resource" => Some(Self::Resource),
            "module" => Some(Self::Module),
            "data" => Some(Self::Data),
            "variable" => Some(Self::Variable),
            "output" => Some(Self::Output),
            "locals" => Some(Self::Locals),
            "import" => Some(Self::Import),
            _ => None,
        }
    }

    /// Number of labels a well-formed block of this kind carries.
    #[must_use]
    pub const fn label_count(self) -> usize {
        match self {
            Self::Resource | Self::Data => 2,
            Self::Provider | Self::Module | Self::Variable | Self::Output => 1,
            _ => 0,
        }
    }

    /// True for `resource` and `data`, whose addresses must be unique per file.
    #[must_use]
    pub const fn is_instance(self) -> bool {
        matches!(self, Self::Resource | Self::Data)
    }
}

impl Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive, 1-indexed line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    /// First line
    pub start: usize,
    /// Last line
    pub end: usize,
}

impl LineSpan {
    /// Create a span, keeping `end >= start`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        let start = start.max(1);
        Self { start, end: end.max(start) }
    }

    /// The span covering a whole file of `total` lines.
    #[must_use]
    pub fn whole(total: usize) -> Self {
        Self::new(1, total)
    }
}

impl Display for LineSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Content of a raw chunk before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkContent {
    /// Text cut directly from the file
    Text(String),
    /// A single block from the canonical tree
    Block(Block),
}

/// A chunk as produced by the generator or the fallback chunker.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    /// Chunk content
    pub content: ChunkContent,
    /// Block type tag
    pub kind: ChunkKind,
    /// Block address, e.g. `resource.aws_instance.web` or `aws`
    pub address: String,
    /// Labels the block header was written with
    pub labels: Vec<String>,
    /// How many earlier blocks in the file share this kind and labels
    pub occurrence: usize,
    /// Line range, when the producer already knows it
    pub span: Option<LineSpan>,
}

impl RawChunk {
    /// Chunk taken from a structured block.
    #[must_use]
    pub fn block(kind: ChunkKind, address: String, block: Block, occurrence: usize) -> Self {
        Self {
            labels: block.labels.clone(),
            content: ChunkContent::Block(block),
            kind,
            address,
            occurrence,
            span: None,
        }
    }

    /// Chunk holding verbatim text.
    #[must_use]
    pub fn text(kind: ChunkKind, address: String, text: String, labels: Vec<String>, span: Option<LineSpan>) -> Self {
        Self {
            content: ChunkContent::Text(text),
            kind,
            address,
            labels,
            occurrence: 0,
            span,
        }
    }
}

/// A chunk after line attribution, before metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedChunk {
    /// The chunk
    pub chunk: RawChunk,
    /// Where it sits in the source file
    pub span: LineSpan,
    /// Rendered text content
    pub content: String,
}

/// Retrieval-filter attributes repeated inside each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Repository URL
    pub repo: String,
    /// Short commit SHA
    pub commit: String,
    /// Repository owner
    pub owner: String,
    /// Region from the file's first provider block
    pub region: String,
    /// Account (same as owner unless overridden)
    pub account: String,
}

/// The final output unit: one chunk with all metadata attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Rendered chunk text
    pub content: String,
    /// File path relative to the repository root
    pub file: String,
    /// Line range, `start-end`
    pub lines: String,
    /// Block address
    pub resource_address: String,
    /// Block type tag
    pub resource_type: String,
    /// `modules/<name>` or `root`
    pub module: String,
    /// Provider region or `unknown`
    pub region: String,
    /// Repository URL
    pub repo: String,
    /// Short commit SHA
    pub commit: String,
    /// Repository owner
    pub owner: String,
    /// Account
    pub account: String,
    /// Always [`RECORD_TYPE`]
    #[serde(rename = "type")]
    pub record_type: String,
    /// Unique record id
    pub id: String,
    /// Run timestamp, `%Y-%m-%dT%H:%M:%SZ`
    pub update_at: String,
    /// Retrieval-filter attributes
    pub metadata: RecordMetadata,
}

/// A file that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Path relative to the repository root
    pub file: String,
    /// Human-readable cause
    pub reason: String,
}

/// One repository (checkout directory) to process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepoTarget {
    /// Local checkout directory
    pub path: PathBuf,
    /// Remote URL, used for `repo`/`owner` metadata
    pub url: Option<String>,
    /// Commit to record when the checkout has no readable HEAD
    pub commit: Option<String>,
    /// Explicit variables file
    pub var_file: Option<PathBuf>,
}

impl RepoTarget {
    /// A target for a local directory without remote metadata.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Chunks produced for one repository.
#[derive(Debug, Clone)]
pub struct RepoChunks {
    /// Repository metadata
    pub context: RepoContext,
    /// Records in file-walk order, then chunk order within each file
    pub records: Vec<ChunkRecord>,
    /// Number of relevant files found
    pub files_processed: usize,
    /// Files that went through the fallback chunker
    pub fallback_files: usize,
    /// Variables files used for substitution, sorted
    pub var_files: Vec<PathBuf>,
    /// Files skipped because of an error
    pub skipped: Vec<SkippedFile>,
}

impl RepoChunks {
    /// Count records per `resource_type`.
    #[must_use]
    pub fn counts_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.resource_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Result of one run over any number of repositories.
#[derive(Debug, Clone, Default)]
pub struct ChunkRunResult {
    /// Successfully processed repositories, in request order
    pub repositories: Vec<RepoChunks>,
    /// Repositories that could not be processed: (path, cause)
    pub failures: Vec<(PathBuf, String)>,
}

impl ChunkRunResult {
    /// Total number of chunk records.
    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.repositories.iter().map(|r| r.records.len()).sum()
    }

    /// Sorted, de-duplicated owners seen across all records.
    #[must_use]
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self
            .repositories
            .iter()
            .flat_map(|r| r.records.iter().map(|c| c.owner.clone()))
            .collect();
        owners.sort();
        owners.dedup();
        owners
    }

    /// All records, repository by repository.
    pub fn records(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.repositories.iter().flat_map(|r| r.records.iter())
    }
}

/// Output format for the `chunk` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Size-bounded JSON-lines files per repository
    #[default]
    Jsonl,
    /// One aggregate JSON array
    Json,
    /// Human-readable summary only
    Text,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jsonl => write!(f, "jsonl"),
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
        }
    }
}
