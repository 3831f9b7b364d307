//! Repository context for chunk records.
//!
//! Every record names the repository it came from: URL, owner, name and the
//! short commit of the checkout. Owner and name are read from the remote URL;
//! the commit comes from the local checkout's `HEAD`. No network access is
//! involved, cloning happens before this crate is called.
//!
//! # Example
//!
//! ```rust
//! use iacdrift::git::parse_owner_repo;
//!
//! assert_eq!(
//!     parse_owner_repo("git@github.com:acme/infra.git"),
//!     Some(("acme".to_string(), "infra".to_string()))
//! );
//! ```

use crate::error::{IacDriftError, Result};
use crate::types::RepoTarget;

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Repository URL recorded for local directories without a remote.
pub const LOCAL_REPO: &str = "local";

/// Commit recorded when none can be determined.
pub const NO_COMMIT: &str = "none";

/// Owner recorded when the URL does not name one.
pub const UNKNOWN_OWNER: &str = "unknown";

const SHORT_SHA_LEN: usize = 7;

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/](?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?/?$").expect("Invalid regex")
});

static SCP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+:(?P<path>[^/].*)$").expect("Invalid regex"));

/// Where a set of chunks came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContext {
    /// Remote URL, or `local`
    pub url: String,
    /// Repository name
    pub name: String,
    /// Short commit SHA, or `none`
    pub commit: String,
    /// Owner (organisation or user)
    pub owner: String,
}

impl RepoContext {
    /// Build the context for a checkout.
    ///
    /// `owner_override` replaces the owner parsed from the URL.
    #[must_use]
    pub fn resolve(target: &RepoTarget, owner_override: Option<&str>) -> Self {
        let url = target.url.clone().unwrap_or_else(|| LOCAL_REPO.to_string());

        let (owner, name) = parse_owner_repo(&url).unwrap_or_else(|| {
            let name = target
                .path
                .canonicalize()
                .unwrap_or_else(|_| target.path.clone())
                .file_name()
                .and_then(|n| n.to_str())
                .map_or_else(|| LOCAL_REPO.to_string(), String::from);
            (UNKNOWN_OWNER.to_string(), name)
        });

        let commit = match head_commit(&target.path) {
            Ok(sha) => sha,
            Err(e) => {
                tracing::debug!(path = %target.path.display(), error = %e, "No readable HEAD");
                target.commit.clone().unwrap_or_else(|| NO_COMMIT.to_string())
            }
        };

        let owner = owner_override.map_or(owner, String::from);

        tracing::debug!(repo = %url, owner = %owner, commit = %commit, "Resolved repository context");
        Self { url, name, commit, owner }
    }
}

/// Extract `(owner, repo)` from a repository URL.
///
/// GitHub HTTPS and SSH forms are recognised directly; other hosts use the
/// first and last path segments.
#[must_use]
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let url = url.trim();

    if let Some(caps) = GITHUB_URL.captures(url) {
        return Some((caps["owner"].to_string(), caps["repo"].to_string()));
    }

    let path = match SCP_URL.captures(url) {
        Some(caps) => caps["path"].to_string(),
        None => url::Url::parse(url).ok()?.path().to_string(),
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, .., repo] => Some((
            (*owner).to_string(),
            repo.trim_end_matches(".git").to_string(),
        )),
        _ => None,
    }
}

/// Short SHA of `HEAD` in the repository at `path`.
///
/// # Errors
///
/// Returns `Git` if `path` is not a repository or has no commits.
pub fn head_commit(path: &Path) -> Result<String> {
    let repo = git2::Repository::open(path).map_err(|e| git_error(&e, file!(), line!()))?;
    let head = repo.head().map_err(|e| git_error(&e, file!(), line!()))?;
    let commit = head
        .peel_to_commit()
        .map_err(|e| git_error(&e, file!(), line!()))?;

    let sha = commit.id().to_string();
    Ok(sha.chars().take(SHORT_SHA_LEN).collect())
}

fn git_error(e: &git2::Error, src_path: &'static str, src_line: u32) -> IacDriftError {
    IacDriftError::git(e.message().to_string(), src_path, src_line)
}
