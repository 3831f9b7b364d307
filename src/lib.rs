//! # IaCDrift
//!
//! A Terraform/OpenTofu configuration chunker for retrieval indexing.
//!
//! IaCDrift walks checked-out Terraform/OpenTofu repositories, parses HCL
//! files, and emits one metadata-enriched chunk per configuration block with
//! the exact source line range it came from.
//!
//! ## Features
//!
//! - **Structural chunking**: one chunk per `resource`/`data` instance and per
//!   `provider`, `module`, `variable`, `output`, `terraform` and `locals` block
//! - **Deterministic output**: keys are canonicalized so the same file always
//!   yields the same chunks
//! - **Variable substitution**: `${var.name}` references resolved from
//!   the nearest `.tfvars` file
//! - **Fallback chunking**: malformed files still produce chunks, by block
//!   regex or by line windows
//! - **Line attribution**: every chunk carries `start-end` lines in its file
//! - **Multiple output formats**: size-bounded JSONL files, aggregate JSON,
//!   and a plain text summary
//!
//! ## Example
//!
//! ```rust,no_run
//! use iacdrift::{Chunker, Config, RepoTarget};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let chunker = Chunker::new(Config::default());
//!
//!     let repo = chunker.chunk_path(RepoTarget::local("./terraform")).await?;
//!     for record in &repo.records {
//!         println!("{} {} {}", record.file, record.lines, record.resource_address);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Note: README is not included as doc to avoid doctest failures
// See README.md for full documentation
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod chunk;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod normalize;
pub mod parser;
pub mod reporter;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use error::{IacDriftError, Result};
pub use git::RepoContext;
pub use types::{
    ChunkKind, ChunkRecord, ChunkRunResult, FileKind, OutputFormat, RepoChunks, RepoTarget,
    SkippedFile,
};

use chunk::{FileChunker, MetadataAttacher};
use normalize::VariableScopes;
use parser::FileClassifier;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use types::{relative_display, SourceFile};
use walkdir::WalkDir;

/// Timestamp format of `update_at`.
const UPDATE_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Main orchestrator that chunks whole repositories.
///
/// The `Chunker` is the primary entry point for using IaCDrift as a library.
/// It handles:
/// - Walking a checkout and classifying its files
/// - Running the per-file pipeline on a worker pool
/// - Attaching repository metadata to every chunk
///
/// Files are processed in parallel but records always come out in sorted
/// walk order, so two runs over the same tree produce the same sequence.
///
/// # Example
///
/// ```rust,no_run
/// use iacdrift::{Chunker, Config, RepoTarget};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let chunker = Chunker::new(Config::default());
///
///     let targets = vec![RepoTarget::local("./repo1"), RepoTarget::local("./repo2")];
///     let result = chunker.chunk_repositories(&targets).await;
///
///     println!("{} chunks, owners: {:?}", result.total_chunks(), result.owners());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Chunker {
    config: Config,
    classifier: FileClassifier,
    files: FileChunker,
    update_at: String,
}

impl Chunker {
    /// Create a new chunker with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let classifier = FileClassifier::new(&config);
        let files = FileChunker::new(&config);
        let update_at = chrono::Utc::now().format(UPDATE_AT_FORMAT).to_string();
        Self {
            config,
            classifier,
            files,
            update_at,
        }
    }

    /// Replace the run timestamp written to `update_at`.
    #[must_use]
    pub fn with_update_at(mut self, update_at: impl Into<String>) -> Self {
        self.update_at = update_at.into();
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Chunk one checkout, bounded by `scan.timeout_secs`.
    ///
    /// The blocking walk runs on tokio's blocking pool; when the timeout
    /// fires the caller gets an error while the walk finishes in the
    /// background and its result is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist
    /// - Processing exceeds the configured timeout
    /// - The worker pool cannot be created
    pub async fn chunk_path(&self, target: RepoTarget) -> Result<RepoChunks> {
        let path = target.path.clone();
        let seconds = self.config.scan.timeout_secs;
        let chunker = self.clone();
        let task = tokio::task::spawn_blocking(move || chunker.chunk_directory(&target));

        let joined = if seconds == 0 {
            task.await
        } else {
            tokio::time::timeout(Duration::from_secs(seconds), task)
                .await
                .map_err(|_| crate::err!(Timeout { path, seconds }))?
        };

        joined.map_err(|e| crate::err!(Internal {
            message: format!("chunking task failed: {e}"),
        }))?
    }

    /// Chunk several checkouts concurrently.
    ///
    /// A checkout that fails is logged and listed in
    /// [`ChunkRunResult::failures`]; the others are still returned.
    pub async fn chunk_repositories(&self, targets: &[RepoTarget]) -> ChunkRunResult {
        use futures::future::join_all;

        let futures: Vec<_> = targets
            .iter()
            .map(|target| self.chunk_path(target.clone()))
            .collect();
        let outcomes = join_all(futures).await;

        let mut result = ChunkRunResult::default();
        for (target, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(repo) => result.repositories.push(repo),
                Err(e) => {
                    tracing::warn!(path = %target.path.display(), error = %e, "Failed to chunk repository");
                    result.failures.push((target.path.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            repositories = result.repositories.len(),
            failures = result.failures.len(),
            chunks = result.total_chunks(),
            "Chunking finished"
        );
        result
    }

    /// Chunk one checkout on the calling thread plus the worker pool.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryNotFound` if `target.path` is not a directory and
    /// `Internal` if the worker pool cannot be built. Per-file failures are
    /// recorded in [`RepoChunks::skipped`] instead.
    pub fn chunk_directory(&self, target: &RepoTarget) -> Result<RepoChunks> {
        let root = target.path.as_path();
        if !root.is_dir() {
            return Err(crate::err!(DirectoryNotFound {
                path: root.to_path_buf(),
            }));
        }
        tracing::info!(path = %root.display(), "Chunking repository");

        let context = RepoContext::resolve(target, self.config.repository.owner.as_deref());
        let attacher = MetadataAttacher::new(&context, self.update_at.clone());

        let candidates = self.discover(root);
        let scopes = match target.var_file {
            Some(ref path) => VariableScopes::explicit(path),
            None => VariableScopes::discover(&candidates, &self.config.scan.var_file_names),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.scan.workers)
            .build()
            .map_err(|e| crate::err!(Internal {
                message: format!("failed to build worker pool: {e}"),
            }))?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            candidates
                .par_iter()
                .map(|path| self.process_file(path, root, &scopes, &attacher))
                .collect()
        });

        let mut repo = RepoChunks {
            context,
            records: Vec::new(),
            files_processed: 0,
            fallback_files: 0,
            var_files: scopes.files(),
            skipped: Vec::new(),
        };

        for outcome in outcomes {
            match outcome {
                FileOutcome::Chunked { records, used_fallback } => {
                    repo.files_processed += 1;
                    if used_fallback {
                        repo.fallback_files += 1;
                    }
                    repo.records.extend(records);
                }
                FileOutcome::Skipped { file, error } => {
                    repo.skipped.push(SkippedFile {
                        file,
                        reason: error.to_string(),
                    });
                }
                FileOutcome::Irrelevant => {}
            }
        }

        tracing::info!(
            repo = %repo.context.name,
            files = repo.files_processed,
            fallback = repo.fallback_files,
            skipped = repo.skipped.len(),
            chunks = repo.records.len(),
            "Repository chunked"
        );

        Ok(repo)
    }

    /// Candidate files below `root` in sorted walk order.
    #[must_use]
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let skip_dirs = &self.config.scan.skip_dirs;

        WalkDir::new(root)
            .follow_links(self.config.scan.follow_links)
            .max_depth(self.config.scan.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !e.file_name().to_str().is_some_and(|name| skip_dirs.iter().any(|d| d == name))
            })
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && FileClassifier::is_candidate(e.path()))
            .map(walkdir::DirEntry::into_path)
            .collect()
    }

    fn process_file(
        &self,
        path: &Path,
        root: &Path,
        scopes: &VariableScopes,
        attacher: &MetadataAttacher,
    ) -> FileOutcome {
        let kind = self.classifier.classify(path);
        if !kind.is_relevant() {
            return FileOutcome::Irrelevant;
        }

        let source = match SourceFile::read(path, root) {
            Ok(source) => source,
            Err(error) => {
                tracing::warn!(file = %path.display(), error = %error, "Skipping unreadable file");
                return FileOutcome::Skipped {
                    file: relative_display(path, root),
                    error,
                };
            }
        };

        let chunked = self.files.chunk_source(&source, kind, scopes.table_for(path));
        let records = chunked
            .chunks
            .into_iter()
            .enumerate()
            .map(|(ordinal, located)| {
                attacher.attach(located, &source.relative, &chunked.module, &chunked.region, ordinal)
            })
            .collect();

        FileOutcome::Chunked {
            records,
            used_fallback: chunked.used_fallback,
        }
    }
}

/// What happened to one candidate file.
enum FileOutcome {
    Chunked {
        records: Vec<ChunkRecord>,
        used_fallback: bool,
    },
    Skipped {
        file: String,
        error: IacDriftError,
    },
    Irrelevant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn chunker() -> Chunker {
        Chunker::new(Config::default()).with_update_at("2024-01-01T00:00:00Z")
    }

    #[test]
    fn test_chunker_creation() {
        let chunker = chunker();
        assert_eq!(chunker.config().scan.max_depth, 100);
        assert_eq!(chunker.update_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_discover_sorted_and_skips_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.tf", "locals {}\n");
        write(dir.path(), "a.tf", "locals {}\n");
        write(dir.path(), "README.md", "# readme\n");
        write(dir.path(), ".terraform/modules/x/main.tf", "locals {}\n");
        write(dir.path(), "env/prod.tfvars", "a = 1\n");

        let found: Vec<String> = chunker()
            .discover(dir.path())
            .iter()
            .map(|p| relative_display(p, dir.path()))
            .collect();
        assert_eq!(found, vec!["a.tf", "b.tf", "env/prod.tfvars"]);
    }

    #[test]
    fn test_chunk_directory_missing() {
        let err = chunker()
            .chunk_directory(&RepoTarget::local("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, IacDriftError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "provider \"aws\" {\n  region = \"eu-west-1\"\n}\n");
        fs::write(dir.path().join("binary.tf"), b"locals {}\n\xff\xfe\n").unwrap();

        let repo = chunker().chunk_directory(&RepoTarget::local(dir.path())).unwrap();
        assert_eq!(repo.files_processed, 1);
        assert_eq!(repo.records.len(), 1);
        assert_eq!(repo.skipped.len(), 1);
        assert_eq!(repo.skipped[0].file, "binary.tf");
    }

    #[test]
    fn test_var_file_discovered() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "main.tf",
            "resource \"aws_instance\" \"web\" {\n  instance_type = \"${var.size}\"\n}\n",
        );
        write(dir.path(), "terraform.tfvars", "size = \"t3.micro\"\n");

        let repo = chunker().chunk_directory(&RepoTarget::local(dir.path())).unwrap();
        assert_eq!(repo.var_files, vec![dir.path().join("terraform.tfvars")]);

        let resource = repo
            .records
            .iter()
            .find(|r| r.resource_type == "resource")
            .unwrap();
        assert!(resource.content.contains("\"t3.micro\""));
        assert!(repo.records.iter().any(|r| r.resource_type == "tfvars"));
    }

    #[test]
    fn test_var_files_scoped_per_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "envs/dev/terraform.tfvars", "size = \"t3.small\"\n");
        write(dir.path(), "envs/prod/terraform.tfvars", "size = \"m5.large\"\n");
        write(
            dir.path(),
            "envs/prod/main.tf",
            "resource \"aws_instance\" \"web\" {\n  instance_type = \"${var.size}\"\n}\n",
        );

        let repo = chunker().chunk_directory(&RepoTarget::local(dir.path())).unwrap();
        assert_eq!(
            repo.var_files,
            vec![
                dir.path().join("envs/dev/terraform.tfvars"),
                dir.path().join("envs/prod/terraform.tfvars"),
            ]
        );

        let resource = repo
            .records
            .iter()
            .find(|r| r.resource_type == "resource")
            .unwrap();
        assert!(resource.content.contains("instance_type = \"m5.large\""));
        assert!(!resource.content.contains("t3.small"));
    }

    #[test]
    fn test_ignore_patterns_apply() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "locals {\n  a = 1\n}\n");
        write(dir.path(), "override.tf", "locals {\n  b = 1\n}\n");

        let mut config = Config::default();
        config.scan.ignore_patterns = vec!["override*.tf".to_string()];
        let repo = Chunker::new(config)
            .chunk_directory(&RepoTarget::local(dir.path()))
            .unwrap();

        assert_eq!(repo.files_processed, 1);
        assert!(repo.records.iter().all(|r| r.file == "main.tf"));
    }

    #[tokio::test]
    async fn test_chunk_repositories_records_failures() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.tf", "terraform {\n  required_version = \">= 1.0\"\n}\n");

        let targets = vec![
            RepoTarget::local(dir.path()),
            RepoTarget::local(dir.path().join("missing")),
        ];
        let result = chunker().chunk_repositories(&targets).await;

        assert_eq!(result.repositories.len(), 1);
        assert_eq!(result.total_chunks(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].0, dir.path().join("missing"));
    }
}
