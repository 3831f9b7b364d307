//! Block-level chunk generation.
//!
//! Two passes contribute to one [`ChunkAccumulator`]:
//!
//! 1. [`generate`] walks the canonical tree in [`ChunkKind::BLOCK_ORDER`] and
//!    emits one chunk per block whose labels fit its kind.
//! 2. [`ensure_coverage`] re-walks `variable`, `locals` and `module` blocks
//!    leniently, so a block the first pass could not address still becomes
//!    a chunk.
//!
//! The accumulator owns the set of seen `(kind, address)` keys, so neither
//! pass can emit a duplicate.

use crate::parser::{Block, CanonicalConfig};
use crate::types::{ChunkKind, RawChunk};
use std::collections::HashSet;

/// Kinds re-walked by [`ensure_coverage`].
pub const COVERAGE_KINDS: [ChunkKind; 3] = [ChunkKind::Variable, ChunkKind::Locals, ChunkKind::Module];

/// Collects chunks for one file, rejecting repeated `(kind, address)` keys.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    seen: HashSet<(ChunkKind, String)>,
    chunks: Vec<RawChunk>,
}

impl ChunkAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `chunk` unless its key was already seen. Returns true if added.
    pub fn offer(&mut self, chunk: RawChunk) -> bool {
        if self.seen.insert((chunk.kind, chunk.address.clone())) {
            self.chunks.push(chunk);
            true
        } else {
            tracing::debug!(kind = %chunk.kind, address = %chunk.address, "Skipping duplicate block");
            false
        }
    }

    /// Add `chunk`, suffixing its address with `#n` until its key is free.
    pub fn offer_distinct(&mut self, mut chunk: RawChunk) {
        let base = chunk.address.clone();
        let mut n = 1;
        while self.contains(chunk.kind, &chunk.address) {
            chunk.address = format!("{base}#{n}");
            n += 1;
        }
        self.offer(chunk);
    }

    /// True if a chunk with this key was accepted.
    #[must_use]
    pub fn contains(&self, kind: ChunkKind, address: &str) -> bool {
        self.seen.contains(&(kind, address.to_string()))
    }

    /// Number of accepted chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True when nothing was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Accepted chunks in acceptance order.
    #[must_use]
    pub fn into_chunks(self) -> Vec<RawChunk> {
        self.chunks
    }
}

/// Address of a block when its labels fit its kind.
///
/// `resource.<type>.<name>` / `data.<type>.<name>`, the first label for
/// `provider`, `module`, `variable` and `output`, the bare keyword for
/// `terraform`, `locals` and `import`. Repeated non-instance blocks get a
/// `[n]` suffix from their occurrence index.
#[must_use]
pub fn block_address(kind: ChunkKind, labels: &[String], occurrence: usize) -> Option<String> {
    let base = match kind {
        ChunkKind::Resource | ChunkKind::Data => match labels {
            [kind_label, name, ..] => format!("{kind}.{kind_label}.{name}"),
            _ => return None,
        },
        ChunkKind::Provider | ChunkKind::Module | ChunkKind::Variable | ChunkKind::Output => {
            labels.first()?.clone()
        }
        ChunkKind::Terraform | ChunkKind::Locals | ChunkKind::Import => kind.as_str().to_string(),
        ChunkKind::Fallback | ChunkKind::Tfvars => return None,
    };
    Some(with_occurrence(base, kind, occurrence))
}

/// Address used when labels do not fit: the first label, else
/// `<kind>.<unlabeled>`.
#[must_use]
pub fn lenient_address(kind: ChunkKind, labels: &[String], occurrence: usize) -> String {
    block_address(kind, labels, occurrence).unwrap_or_else(|| {
        let base = match labels {
            [] => format!("{kind}.<unlabeled>"),
            _ if kind.is_instance() => format!("{kind}.{}", labels.join(".")),
            [first, ..] => first.clone(),
        };
        with_occurrence(base, kind, occurrence)
    })
}

fn with_occurrence(base: String, kind: ChunkKind, occurrence: usize) -> String {
    if occurrence == 0 || kind.is_instance() {
        base
    } else {
        format!("{base}[{occurrence}]")
    }
}

/// Occurrence index of each block among earlier blocks with the same labels.
fn occurrences(blocks: &[Block]) -> Vec<usize> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| blocks[..i].iter().filter(|b| b.labels == block.labels).count())
        .collect()
}

/// Emit one chunk per addressable top-level block, in fixed kind order.
pub fn generate(config: &CanonicalConfig, acc: &mut ChunkAccumulator) {
    for kind in ChunkKind::BLOCK_ORDER {
        let blocks = config.blocks(kind.as_str());
        for (block, occurrence) in blocks.iter().zip(occurrences(blocks)) {
            match block_address(kind, &block.labels, occurrence) {
                Some(address) => {
                    acc.offer(RawChunk::block(kind, address, block.clone(), occurrence));
                }
                None => tracing::debug!(
                    kind = %kind,
                    labels = block.labels.len(),
                    expected = kind.label_count(),
                    "Block labels do not fit kind"
                ),
            }
        }
    }
}

/// Re-walk `variable`, `locals` and `module` blocks, adding any not yet seen.
///
/// A block whose labels do not fit its kind is always added, under a lenient
/// address made distinct from every accepted one.
///
/// Returns the number of chunks added.
pub fn ensure_coverage(config: &CanonicalConfig, acc: &mut ChunkAccumulator) -> usize {
    let before = acc.len();
    for kind in COVERAGE_KINDS {
        let blocks = config.blocks(kind.as_str());
        for (block, occurrence) in blocks.iter().zip(occurrences(blocks)) {
            match block_address(kind, &block.labels, occurrence) {
                Some(address) => {
                    if !acc.contains(kind, &address) {
                        acc.offer(RawChunk::block(kind, address, block.clone(), occurrence));
                    }
                }
                None => {
                    let address = lenient_address(kind, &block.labels, occurrence);
                    acc.offer_distinct(RawChunk::block(kind, address, block.clone(), occurrence));
                }
            }
        }
    }

    let added = acc.len() - before;
    if added > 0 {
        tracing::debug!(added, "Special handling added chunks");
    }
    added
}

/// Run both passes over a canonical tree.
#[must_use]
pub fn generate_chunks(config: &CanonicalConfig) -> Vec<RawChunk> {
    let mut acc = ChunkAccumulator::new();
    generate(config, &mut acc);
    ensure_coverage(config, &mut acc);
    acc.into_chunks()
}
