//! Structured configuration tree produced by the HCL parser.
//!
//! A file parses into a [`ParsedConfig`]: an ordered body whose entries are
//! either attributes (`key = value`) or sequences of blocks sharing one
//! keyword (`resource`, `provider`, nested `ingress`, ...). Each [`Block`]
//! keeps its labels and its own body, so `resource "aws_instance" "web"`
//! is one block with labels `["aws_instance", "web"]`.
//!
//! Attribute values reuse [`hcl::Value`]. Expressions that are not plain
//! literals (references, function calls, conditionals) are stored as their
//! interpolation string, e.g. `"${var.region}"`.

use hcl::{Map, Value};

/// One entry of a [`Body`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `key = value`
    Attribute(Value),
    /// One or more `key "label" { ... }` blocks, in declaration order.
    Blocks(Vec<Block>),
}

/// A labeled or unlabeled block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// Block labels, outermost first.
    pub labels: Vec<String>,
    /// Block contents.
    pub body: Body,
}

impl Block {
    /// Create a block from labels and a body.
    #[must_use]
    pub fn new(labels: Vec<String>, body: Body) -> Self {
        Self { labels, body }
    }

    /// The label at `index`, if present.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

/// An ordered mapping from keys to attributes or block sequences.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    entries: Map<String, Entry>,
}

impl Body {
    /// Create an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any previous entry with the same key.
    pub fn insert_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), Entry::Attribute(value));
    }

    /// Append a block under `keyword`.
    pub fn push_block(&mut self, keyword: impl Into<String>, block: Block) {
        let keyword = keyword.into();
        match self.entries.get_mut(&keyword) {
            Some(Entry::Blocks(blocks)) => blocks.push(block),
            _ => {
                self.entries.insert(keyword, Entry::Blocks(vec![block]));
            }
        }
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key) {
            Some(Entry::Attribute(value)) => Some(value),
            _ => None,
        }
    }

    /// All blocks declared under `keyword` (empty if none).
    #[must_use]
    pub fn blocks(&self, keyword: &str) -> &[Block] {
        match self.entries.get(keyword) {
            Some(Entry::Blocks(blocks)) => blocks,
            _ => &[],
        }
    }

    /// Iterate over attributes in order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().filter_map(|(k, e)| match e {
            Entry::Attribute(v) => Some((k.as_str(), v)),
            Entry::Blocks(_) => None,
        })
    }

    /// Iterate over all entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Iterate mutably over all entries in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Entry)> {
        self.entries.iter_mut().map(|(k, e)| (k.as_str(), e))
    }

    /// Keys in their current order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the body has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn sort_keys(&mut self) {
        self.entries.sort_keys();
    }
}

/// A successfully parsed configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedConfig {
    body: Body,
}

impl ParsedConfig {
    /// Wrap a top-level body.
    #[must_use]
    pub fn new(body: Body) -> Self {
        Self { body }
    }

    /// The top-level body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable access to the top-level body.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Top-level blocks of one type, in declaration order.
    #[must_use]
    pub fn blocks(&self, keyword: &str) -> &[Block] {
        self.body.blocks(keyword)
    }

    /// Top-level attributes (the whole content of a `.tfvars` file).
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.body.attributes()
    }
}

/// A [`ParsedConfig`] whose mapping keys are sorted at every level.
///
/// Only [`crate::normalize::canonicalize`] produces one, so holding a
/// `CanonicalConfig` is proof that the tree is in canonical order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalConfig(ParsedConfig);

impl CanonicalConfig {
    pub(crate) fn from_sorted(config: ParsedConfig) -> Self {
        Self(config)
    }

    /// The canonical tree.
    #[must_use]
    pub fn as_parsed(&self) -> &ParsedConfig {
        &self.0
    }

    /// Unwrap into the underlying tree.
    #[must_use]
    pub fn into_inner(self) -> ParsedConfig {
        self.0
    }

    /// Top-level blocks of one type, in declaration order.
    #[must_use]
    pub fn blocks(&self, keyword: &str) -> &[Block] {
        self.0.blocks(keyword)
    }
}
