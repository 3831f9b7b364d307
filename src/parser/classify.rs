//! File classification.

use crate::config::Config;
use crate::parser::{CONFIG_EXTENSIONS, TOP_LEVEL_KEYWORDS};
use crate::types::FileKind;

use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

/// Matches a top-level keyword at the start of a line.
static KEYWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)^\s*({})\b", TOP_LEVEL_KEYWORDS.join("|"))).expect("Invalid regex")
});

/// Decides which files enter the chunking pipeline.
///
/// Ignore patterns and the prefix size come from [`Config`] at construction;
/// the classifier never reads the environment itself.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    ignore: Vec<glob::Pattern>,
    prefix_bytes: usize,
}

impl FileClassifier {
    /// Create a classifier from the scan options.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let ignore = config
            .scan
            .ignore_patterns
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Ignoring invalid ignore pattern");
                    None
                }
            })
            .collect();

        Self {
            ignore,
            prefix_bytes: config.scan.prefix_bytes,
        }
    }

    /// Classify a file on disk.
    pub fn classify(&self, path: &Path) -> FileKind {
        if self.is_ignored(path) {
            tracing::debug!(path = %path.display(), reason = "matches ignore pattern", "Skipping file");
            return FileKind::Unknown;
        }

        let Some(extension) = extension_of(path) else {
            return FileKind::Unknown;
        };

        match extension.as_str() {
            "tfvars" => FileKind::Tfvars,
            "tf" | "hcl" => match self.read_prefix(path) {
                Ok(prefix) if has_top_level_keyword(&prefix) => FileKind::Terraform,
                Ok(_) => {
                    tracing::debug!(path = %path.display(), reason = "no top-level keyword", "Skipping file");
                    FileKind::Unknown
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read file prefix");
                    FileKind::Unknown
                }
            },
            _ => FileKind::Unknown,
        }
    }

    /// Check the base name against the ignore globs.
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.ignore.iter().any(|p| p.matches(name)))
    }

    /// True if the extension alone makes the file a candidate.
    #[must_use]
    pub fn is_candidate(path: &Path) -> bool {
        extension_of(path).is_some()
    }

    fn read_prefix(&self, path: &Path) -> std::io::Result<String> {
        let mut buffer = Vec::with_capacity(self.prefix_bytes);
        File::open(path)?
            .take(self.prefix_bytes as u64)
            .read_to_end(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Lower-cased configuration extension, if the file has one.
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| CONFIG_EXTENSIONS.contains(&e.as_str()))
}

/// Keyword heuristic over a bounded prefix.
pub(crate) fn has_top_level_keyword(text: &str) -> bool {
    KEYWORD_PATTERN.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn classifier_with(patterns: &[&str]) -> FileClassifier {
        let mut config = Config::default();
        config.scan.ignore_patterns = patterns.iter().map(|p| (*p).to_string()).collect();
        FileClassifier::new(&config)
    }

    #[test]
    fn test_classify_by_extension_and_keyword() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.tf");
        let notes = dir.path().join("notes.tf");
        let vars = dir.path().join("prod.tfvars");
        let readme = dir.path().join("README.md");
        fs::write(&main, "resource \"aws_s3_bucket\" \"b\" {}\n").unwrap();
        fs::write(&notes, "# nothing to see here\n").unwrap();
        fs::write(&vars, "").unwrap();
        fs::write(&readme, "resource \"x\" \"y\" {}\n").unwrap();

        let classifier = classifier_with(&[]);
        assert_eq!(classifier.classify(&main), FileKind::Terraform);
        assert_eq!(classifier.classify(&notes), FileKind::Unknown);
        assert_eq!(classifier.classify(&vars), FileKind::Tfvars);
        assert_eq!(classifier.classify(&readme), FileKind::Unknown);
    }

    #[test]
    fn test_ignore_patterns_match_base_name() {
        let dir = TempDir::new().unwrap();
        let backend = dir.path().join("backend.tf");
        fs::write(&backend, "terraform {}\n").unwrap();

        assert_eq!(classifier_with(&["backend.*"]).classify(&backend), FileKind::Unknown);
        assert_eq!(classifier_with(&["*.tfvars"]).classify(&backend), FileKind::Terraform);
    }

    #[test]
    fn test_keyword_outside_prefix_is_not_seen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.tf");
        let mut text = "#".repeat(2000);
        text.push_str("\nresource \"a\" \"b\" {}\n");
        fs::write(&path, text).unwrap();

        assert_eq!(classifier_with(&[]).classify(&path), FileKind::Unknown);
    }

    #[test]
    fn test_missing_file_is_unknown() {
        let classifier = classifier_with(&[]);
        assert_eq!(classifier.classify(Path::new("/definitely/not/here.tf")), FileKind::Unknown);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(FileClassifier::is_candidate(Path::new("MAIN.TF")));
        assert!(FileClassifier::is_candidate(Path::new("x.hcl")));
        assert!(!FileClassifier::is_candidate(Path::new("x.tf.json")));
    }

    #[test]
    fn test_keyword_heuristic() {
        assert!(has_top_level_keyword("  module \"vpc\" {"));
        assert!(has_top_level_keyword("output \"id\" {"));
        assert!(!has_top_level_keyword("resources = 3"));
        assert!(!has_top_level_keyword("# provider"));
    }
}
