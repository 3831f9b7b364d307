//! Size-bounded JSON-lines persistence.
//!
//! Records of one repository go to `<dir>/<repo>/<repo>_<idx>.jsonl`. A new
//! file is started whenever the next line would push the current one past
//! `output.max_bytes_per_file`. A record larger than the limit is written
//! alone into its own file rather than split, so every line stays valid JSON.

use crate::config::Config;
use crate::error::{IacDriftError, Result};
use crate::types::{ChunkRecord, ChunkRunResult, RepoChunks};

use std::fs;
use std::path::{Path, PathBuf};

/// Writes chunk records as JSONL files.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    dir: PathBuf,
    max_bytes: usize,
}

impl JsonlWriter {
    /// Create a writer rooted at `output.dir`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            dir: config.output.dir.clone(),
            max_bytes: config.output.max_bytes_per_file.max(1),
        }
    }

    /// Write every repository of a run. Returns the files written.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write_all(&self, result: &ChunkRunResult) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for repo in &result.repositories {
            files.extend(self.write_repo(repo)?);
        }
        Ok(files)
    }

    /// Write one repository's records.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write_repo(&self, repo: &RepoChunks) -> Result<Vec<PathBuf>> {
        let base = sanitize(&repo.context.name);
        let dir = self.dir.join(&base);
        self.write_records(&repo.records, &dir, &base)
    }

    /// Write records into `dir` as `<base>_<idx>.jsonl` files.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write_records(&self, records: &[ChunkRecord], dir: &Path, base: &str) -> Result<Vec<PathBuf>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(dir).map_err(|e| IacDriftError::io(dir, e, file!(), line!()))?;

        let mut files = Vec::new();
        let mut buffer = String::new();
        let mut count = 0usize;

        for record in records {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');

            if line.len() > self.max_bytes {
                tracing::warn!(
                    address = %record.resource_address,
                    bytes = line.len(),
                    limit = self.max_bytes,
                    "Record exceeds file size limit, writing it alone"
                );
                self.flush(&mut buffer, &mut count, dir, base, &mut files)?;
                let mut single = line;
                let mut one = 1;
                self.flush(&mut single, &mut one, dir, base, &mut files)?;
                continue;
            }

            if buffer.len() + line.len() > self.max_bytes {
                self.flush(&mut buffer, &mut count, dir, base, &mut files)?;
            }
            buffer.push_str(&line);
            count += 1;
        }
        self.flush(&mut buffer, &mut count, dir, base, &mut files)?;

        Ok(files)
    }

    fn flush(
        &self,
        buffer: &mut String,
        count: &mut usize,
        dir: &Path,
        base: &str,
        files: &mut Vec<PathBuf>,
    ) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }

        let path = dir.join(format!("{base}_{}.jsonl", files.len()));
        fs::write(&path, buffer.as_bytes()).map_err(|e| IacDriftError::io(&path, e, file!(), line!()))?;
        tracing::info!(
            file = %path.display(),
            chunks = *count,
            kib = %format!("{:.1}", buffer.len() as f64 / 1024.0),
            "Saved chunk file"
        );

        files.push(path);
        buffer.clear();
        *count = 0;
        Ok(())
    }
}

/// Keep repository names safe as path components.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "repository".to_string()
    } else {
        cleaned
    }
}
