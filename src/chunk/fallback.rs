//! Text-based chunking for files the structural parser rejected.
//!
//! Block headers are found with a regex, and each block is cut at its
//! balancing brace. A file in which no block closes is split into
//! overlapping line windows instead, so every non-empty file yields at
//! least one chunk.

use crate::chunk::generator::{block_address, lenient_address, ChunkAccumulator};
use crate::chunk::lines::{matching_brace, LineLocator};
use crate::config::ChunkingOptions;
use crate::types::{ChunkKind, LineSpan, RawChunk};

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `<keyword> ["label"|label] ["label"|label] {` at the start of a line.
static BLOCK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?m)^[ \t]*(resource|data|module|provider|terraform|variable|output|locals|import)"#,
        r#"(?:[ \t]+(?:"([^"\n]*)"|([A-Za-z_][A-Za-z0-9_-]*)))?"#,
        r#"(?:[ \t]+(?:"([^"\n]*)"|([A-Za-z_][A-Za-z0-9_-]*)))?"#,
        r#"[ \t]*\{"#,
    ))
    .expect("Invalid regex")
});

/// Address given to line-window chunks.
pub const WINDOW_ADDRESS: &str = "chunk";

/// Regex and line-window chunker.
#[derive(Debug, Clone)]
pub struct FallbackChunker {
    window_tokens: usize,
    overlap_tokens: usize,
}

impl FallbackChunker {
    /// Create a chunker with the configured window sizes.
    #[must_use]
    pub fn new(options: &ChunkingOptions) -> Self {
        Self {
            window_tokens: options.window_tokens.max(1),
            overlap_tokens: options.overlap_tokens,
        }
    }

    /// Chunk raw text. Non-empty text always yields at least one chunk.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<RawChunk> {
        let blocks = extract_blocks(text);
        if !blocks.is_empty() {
            tracing::debug!(blocks = blocks.len(), "Fallback recovered blocks");
            return blocks;
        }

        let windows = self.windows(text);
        tracing::debug!(windows = windows.len(), "Fallback produced line windows");
        windows
    }

    /// Split text into line windows of about `window_tokens` whitespace
    /// tokens, each starting with the trailing `overlap_tokens` tokens' worth
    /// of lines of the previous window.
    #[must_use]
    pub fn windows(&self, text: &str) -> Vec<RawChunk> {
        let lines: Vec<&str> = text.lines().collect();
        if text.trim().is_empty() {
            return Vec::new();
        }

        let tokens: Vec<usize> = lines.iter().map(|l| l.split_whitespace().count()).collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < lines.len() {
            // Always take at least one line, even if it alone exceeds the window.
            let mut end = start;
            let mut count = tokens[start];
            while end + 1 < lines.len() && count + tokens[end + 1] <= self.window_tokens {
                end += 1;
                count += tokens[end];
            }

            chunks.push(RawChunk::text(
                ChunkKind::Fallback,
                WINDOW_ADDRESS.to_string(),
                lines[start..=end].join("\n"),
                Vec::new(),
                Some(LineSpan::new(start + 1, end + 1)),
            ));

            if end + 1 >= lines.len() {
                break;
            }

            let mut next = end + 1;
            let mut carried = 0;
            while next > start + 1 && carried + tokens[next - 1] <= self.overlap_tokens {
                next -= 1;
                carried += tokens[next];
            }
            start = next;
        }

        chunks
    }
}

/// Cut every closed `<keyword> ... { ... }` block out of `text`.
fn extract_blocks(text: &str) -> Vec<RawChunk> {
    let locator = LineLocator::new(text);
    let mut acc = ChunkAccumulator::new();
    let mut seen: HashMap<(ChunkKind, Vec<String>), usize> = HashMap::new();
    let mut pos = 0;

    while let Some(caps) = BLOCK_HEADER.captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };
        let Some(kind) = caps.get(1).and_then(|m| ChunkKind::from_keyword(m.as_str())) else {
            pos = whole.end();
            continue;
        };

        let Some(close) = matching_brace(text, whole.start()) else {
            tracing::debug!(kind = %kind, line = locator.line_of(whole.start()), "Unclosed block in fallback");
            pos = whole.end();
            continue;
        };

        let labels: Vec<String> = [(2, 3), (4, 5)]
            .iter()
            .filter_map(|&(quoted, bare)| caps.get(quoted).or_else(|| caps.get(bare)))
            .map(|m| m.as_str().to_string())
            .collect();

        let occurrence = seen.entry((kind, labels.clone())).or_insert(0);
        let fits = block_address(kind, &labels, *occurrence);
        let address = lenient_address(kind, &labels, *occurrence);
        *occurrence += 1;

        let start = whole.start() + (whole.as_str().len() - whole.as_str().trim_start().len());
        let span = LineSpan::new(locator.line_of(start), locator.line_of(close));
        let chunk = RawChunk::text(kind, address, text[start..=close].to_string(), labels, Some(span));
        if fits.is_some() {
            acc.offer(chunk);
        } else {
            acc.offer_distinct(chunk);
        }

        pos = close + 1;
    }

    acc.into_chunks()
}
