//! Per-file chunking pipeline.
//!
//! ```text
//! SourceFile ─┬─ tfvars ──────────────────────────────► one whole-file chunk
//!             └─ terraform ─► parse ─┬─ Parsed ─► canonicalize ─► resolve ─► generate + coverage
//!                                    └─ Unparsed ─► fallback (blocks, else line windows)
//!                                                     │
//!                                      every chunk ─► LineLocator ─► LocatedChunk
//! ```
//!
//! [`FileChunker`] holds no per-file state, so one instance serves all
//! worker threads.

pub mod fallback;
pub mod generator;
pub mod lines;
pub mod metadata;
pub mod render;

pub use fallback::FallbackChunker;
pub use generator::{ensure_coverage, generate, generate_chunks, ChunkAccumulator};
pub use lines::LineLocator;
pub use metadata::{module_path, region, MetadataAttacher};

use crate::config::Config;
use crate::normalize::{canonicalize, resolve, VariableTable};
use crate::parser::{HclParser, ParseOutcome, Parser};
use crate::types::{ChunkContent, ChunkKind, FileKind, LineSpan, LocatedChunk, RawChunk, SourceFile};
use std::sync::Arc;

/// Chunks of one file plus the file-level attributes derived on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct FileChunks {
    /// Located chunks in emission order
    pub chunks: Vec<LocatedChunk>,
    /// Region of the file's first provider block
    pub region: String,
    /// `modules/<name>` or `root`
    pub module: String,
    /// True when the structural parse failed
    pub used_fallback: bool,
}

/// Runs the per-file pipeline.
#[derive(Clone)]
pub struct FileChunker {
    parser: Arc<dyn Parser>,
    fallback: FallbackChunker,
}

impl std::fmt::Debug for FileChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileChunker")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl FileChunker {
    /// Create a chunker using the HCL parser.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_parser(config, Arc::new(HclParser::new()))
    }

    /// Create a chunker with a custom parser implementation.
    #[must_use]
    pub fn with_parser(config: &Config, parser: Arc<dyn Parser>) -> Self {
        Self {
            parser,
            fallback: FallbackChunker::new(&config.chunking),
        }
    }

    /// Chunk one classified file.
    ///
    /// `Unknown` files yield nothing.
    #[must_use]
    pub fn chunk_source(&self, source: &SourceFile, kind: FileKind, vars: &VariableTable) -> FileChunks {
        let module = module_path(&source.relative);
        let (raw, region, used_fallback) = match kind {
            FileKind::Tfvars => (tfvars_chunk(source).into_iter().collect(), metadata::UNKNOWN_REGION.to_string(), false),
            FileKind::Terraform => match self.parser.parse(source) {
                ParseOutcome::Parsed(config) => {
                    let canonical = resolve(canonicalize(config), vars);
                    (generate_chunks(&canonical), region(&canonical), false)
                }
                ParseOutcome::Unparsed { .. } => (
                    self.fallback.chunk(&source.text),
                    metadata::UNKNOWN_REGION.to_string(),
                    true,
                ),
            },
            FileKind::Unknown => (Vec::new(), metadata::UNKNOWN_REGION.to_string(), false),
        };

        let locator = LineLocator::new(&source.text);
        let chunks: Vec<LocatedChunk> = raw
            .into_iter()
            .map(|chunk| {
                let content = match &chunk.content {
                    ChunkContent::Text(text) => text.clone(),
                    ChunkContent::Block(block) => render::render_block(chunk.kind.as_str(), block),
                };
                let span = locator.locate(&chunk, &content);
                LocatedChunk { chunk, span, content }
            })
            .collect();

        tracing::debug!(
            file = %source.relative,
            kind = %kind,
            chunks = chunks.len(),
            fallback = used_fallback,
            "Chunked file"
        );

        FileChunks {
            chunks,
            region,
            module,
            used_fallback,
        }
    }
}

/// One chunk holding a whole `.tfvars` file, unless it is blank.
fn tfvars_chunk(source: &SourceFile) -> Option<RawChunk> {
    if source.text.trim().is_empty() {
        return None;
    }
    Some(RawChunk::text(
        ChunkKind::Tfvars,
        source.file_name().to_string(),
        source.text.clone(),
        Vec::new(),
        Some(LineSpan::whole(source.line_count())),
    ))
}
