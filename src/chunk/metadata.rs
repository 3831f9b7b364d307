//! Region and module derivation, and assembly of final records.

use crate::git::RepoContext;
use crate::parser::CanonicalConfig;
use crate::types::{ChunkRecord, LocatedChunk, RecordMetadata, RECORD_TYPE};

use hcl::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Region recorded when no provider declares one.
pub const UNKNOWN_REGION: &str = "unknown";

/// Module path recorded for files outside `modules/`.
pub const ROOT_MODULE: &str = "root";

/// Region of the first `provider` block, or `"unknown"`.
///
/// Only the first provider is consulted, so multi-region files report the
/// first region declared. A region that is still an unresolved interpolation
/// counts as unknown.
#[must_use]
pub fn region(config: &CanonicalConfig) -> String {
    config
        .blocks("provider")
        .first()
        .and_then(|provider| provider.body.attribute("region"))
        .and_then(|value| match value {
            Value::String(s) if !s.is_empty() && !s.contains("${") => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN_REGION.to_string())
}

/// `modules/<name>` for a path below a `modules` directory, else `"root"`.
///
/// `relative` is the `/`-separated path inside the repository.
#[must_use]
pub fn module_path(relative: &str) -> String {
    let parts: Vec<&str> = relative.split('/').filter(|p| !p.is_empty()).collect();
    let dirs = &parts[..parts.len().saturating_sub(1)];

    dirs.iter()
        .position(|p| *p == "modules")
        .and_then(|i| dirs.get(i + 1))
        .map_or_else(|| ROOT_MODULE.to_string(), |name| format!("modules/{name}"))
}

/// Repository-wide attributes stamped onto every record.
#[derive(Debug, Clone)]
pub struct MetadataAttacher {
    repo: String,
    commit: String,
    owner: String,
    account: String,
    update_at: String,
}

impl MetadataAttacher {
    /// Create an attacher for one repository and run timestamp.
    #[must_use]
    pub fn new(context: &RepoContext, update_at: impl Into<String>) -> Self {
        Self {
            repo: context.url.clone(),
            commit: context.commit.clone(),
            owner: context.owner.clone(),
            account: context.owner.clone(),
            update_at: update_at.into(),
        }
    }

    /// Compose the final record for one located chunk.
    ///
    /// `ordinal` is the chunk's position within its file; it keeps ids unique
    /// even when two chunks share an address and span.
    #[must_use]
    pub fn attach(
        &self,
        located: LocatedChunk,
        file: &str,
        module: &str,
        region: &str,
        ordinal: usize,
    ) -> ChunkRecord {
        let lines = located.span.to_string();
        let address = located.chunk.address;
        let id = record_id(&[
            &self.repo,
            &self.commit,
            file,
            &address,
            &lines,
            &ordinal.to_string(),
        ]);

        ChunkRecord {
            content: located.content,
            file: file.to_string(),
            lines,
            resource_address: address,
            resource_type: located.chunk.kind.to_string(),
            module: module.to_string(),
            region: region.to_string(),
            repo: self.repo.clone(),
            commit: self.commit.clone(),
            owner: self.owner.clone(),
            account: self.account.clone(),
            record_type: RECORD_TYPE.to_string(),
            id,
            update_at: self.update_at.clone(),
            metadata: RecordMetadata {
                repo: self.repo.clone(),
                commit: self.commit.clone(),
                owner: self.owner.clone(),
                region: region.to_string(),
                account: self.account.clone(),
            },
        }
    }
}

/// Hex SHA-256 over NUL-separated parts.
fn record_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
