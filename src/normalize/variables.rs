//! Variable table loading and best-effort `${var.name}` substitution.

use crate::normalize::canonical::sort_value;
use crate::parser::{Body, CanonicalConfig, Entry, HclParser, Parser};

use hcl::Value;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A whole-string reference to one variable, nothing more.
static VAR_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{var\.([A-Za-z_][A-Za-z0-9_-]*)\}$").expect("Invalid regex")
});

/// Variable values loaded from a `.tfvars` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    values: HashMap<String, Value>,
}

impl VariableTable {
    /// A table with no entries; resolution becomes a no-op.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from `name = value` pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, mut v)| {
                sort_value(&mut v);
                (k.into(), v)
            })
            .collect();
        Self { values }
    }

    /// Load the top-level attributes of a variables file.
    ///
    /// Never fails: a missing, unreadable or unparsable file yields an empty
    /// table and a warning.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Failed to read variables file");
                return Self::empty();
            }
        };

        match HclParser::new().parse_content(&content, path) {
            Ok(config) => {
                let table = Self::from_pairs(
                    config
                        .attributes()
                        .map(|(k, v)| (k.to_string(), v.clone())),
                );
                tracing::debug!(file = %path.display(), variables = table.len(), "Loaded variables file");
                table
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Failed to parse variables file");
                Self::empty()
            }
        }
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no variables are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Variables files scoped to the directories that hold them.
///
/// A file is resolved against the variables file in its own directory, else
/// the one in its nearest ancestor directory. An explicit file applies to
/// every file instead.
#[derive(Debug, Clone, Default)]
pub struct VariableScopes {
    explicit: Option<(PathBuf, VariableTable)>,
    by_dir: HashMap<PathBuf, (PathBuf, VariableTable)>,
    empty: VariableTable,
}

impl VariableScopes {
    /// Use one variables file for every file.
    #[must_use]
    pub fn explicit(path: &Path) -> Self {
        Self {
            explicit: Some((path.to_path_buf(), VariableTable::load(Some(path)))),
            ..Self::default()
        }
    }

    /// Index the variables files among `candidates`.
    ///
    /// A file counts when its base name is in `names`; in a directory holding
    /// several, the name listed first wins.
    #[must_use]
    pub fn discover(candidates: &[PathBuf], names: &[String]) -> Self {
        let mut chosen: HashMap<PathBuf, (usize, PathBuf)> = HashMap::new();
        for path in candidates {
            let rank = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| names.iter().position(|n| n == name));
            let (Some(rank), Some(dir)) = (rank, path.parent()) else {
                continue;
            };
            if chosen.get(dir).map_or(true, |(best, _)| rank < *best) {
                chosen.insert(dir.to_path_buf(), (rank, path.clone()));
            }
        }

        let by_dir = chosen
            .into_iter()
            .map(|(dir, (_, path))| {
                tracing::debug!(path = %path.display(), "Using discovered variables file");
                let table = VariableTable::load(Some(&path));
                (dir, (path, table))
            })
            .collect();

        Self {
            by_dir,
            ..Self::default()
        }
    }

    /// The table that applies to `path`, empty when none does.
    #[must_use]
    pub fn table_for(&self, path: &Path) -> &VariableTable {
        self.scope_of(path).map_or(&self.empty, |(_, table)| table)
    }

    /// The variables file that applies to `path`.
    #[must_use]
    pub fn file_for(&self, path: &Path) -> Option<&Path> {
        self.scope_of(path).map(|(file, _)| file.as_path())
    }

    /// Every variables file in use, sorted.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .explicit
            .iter()
            .chain(self.by_dir.values())
            .map(|(file, _)| file.clone())
            .collect();
        files.sort();
        files
    }

    fn scope_of(&self, path: &Path) -> Option<&(PathBuf, VariableTable)> {
        if let Some(ref explicit) = self.explicit {
            return Some(explicit);
        }
        path.ancestors().skip(1).find_map(|dir| self.by_dir.get(dir))
    }
}

/// Replace `${var.<name>}` strings with values from `table`.
///
/// Only exact, whole-string references are substituted. Unknown names and
/// compound expressions (`${var.a.b}`, `${trim(var.a)}`) are left as written.
#[must_use]
pub fn resolve(config: CanonicalConfig, table: &VariableTable) -> CanonicalConfig {
    if table.is_empty() {
        return config;
    }

    let mut tree = config.into_inner();
    resolve_body(tree.body_mut(), table);
    CanonicalConfig::from_sorted(tree)
}

fn resolve_body(body: &mut Body, table: &VariableTable) {
    for (_, entry) in body.iter_mut() {
        match entry {
            Entry::Attribute(value) => resolve_value(value, table),
            Entry::Blocks(blocks) => {
                for block in blocks {
                    resolve_body(&mut block.body, table);
                }
            }
        }
    }
}

fn resolve_value(value: &mut Value, table: &VariableTable) {
    match value {
        Value::String(s) => {
            let replacement = VAR_REFERENCE
                .captures(s)
                .and_then(|caps| table.get(&caps[1]))
                .cloned();
            if let Some(resolved) = replacement {
                *value = resolved;
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_value(item, table);
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                resolve_value(v, table);
            }
        }
        _ => {}
    }
}
