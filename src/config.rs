//! Configuration module for IaCDrift.
//!
//! This module handles loading and validating configuration from:
//! - YAML configuration files (`iacdrift.yaml`)
//! - Environment variables
//! - CLI arguments
//!
//! # Configuration File Format
//!
//! ```yaml
//! # iacdrift.yaml
//!
//! scan:
//!   ignore_patterns:
//!     - "*.auto.tfvars"
//!   max_depth: 100
//!   workers: 0
//!   timeout_secs: 300
//!
//! chunking:
//!   window_tokens: 400
//!   overlap_tokens: 50
//!
//! output:
//!   dir: output
//!   max_bytes_per_file: 20971520
//!
//! repository:
//!   owner: ${IACDRIFT_OWNER}
//! ```

use crate::error::{IacDriftError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Environment variable holding comma-separated ignore globs.
pub const IGNORE_ENV: &str = "IACDRIFT_IGNORE";

/// Older name for [`IGNORE_ENV`], still honoured.
pub const LEGACY_IGNORE_ENV: &str = "LIST_IGNORE_FILE";

/// File discovery and classification options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Glob patterns matched against a file's base name; matching files are skipped.
    pub ignore_patterns: Vec<String>,

    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,

    /// Maximum depth for recursive directory scanning.
    pub max_depth: usize,

    /// Follow symbolic links while walking.
    pub follow_links: bool,

    /// Worker threads for per-file processing (0 = one per core).
    pub workers: usize,

    /// Upper bound on processing one directory tree, in seconds (0 = unbounded).
    pub timeout_secs: u64,

    /// Bytes of a `.tf`/`.hcl` file inspected by the classifier.
    pub prefix_bytes: usize,

    /// Base names of per-directory variables files, in priority order, used
    /// when no variables file is given explicitly.
    pub var_file_names: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            skip_dirs: vec![
                ".git".to_string(),
                ".terraform".to_string(),
                ".terragrunt-cache".to_string(),
            ],
            max_depth: 100,
            follow_links: false,
            workers: 0,
            timeout_secs: 300,
            prefix_bytes: 1000,
            var_file_names: vec!["terraform.tfvars".to_string(), "vars.tfvars".to_string()],
        }
    }
}

/// Fallback chunking options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    /// Whitespace-separated tokens per line window.
    pub window_tokens: usize,

    /// Tokens carried over from the end of one window into the next.
    pub overlap_tokens: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            window_tokens: 400,
            overlap_tokens: 50,
        }
    }
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Directory receiving per-repository JSONL files.
    pub dir: PathBuf,

    /// Size limit of one JSONL file in bytes.
    pub max_bytes_per_file: usize,

    /// Pretty-print aggregate JSON output.
    pub pretty: bool,

    /// Use colored output in the text summary.
    pub colored: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            max_bytes_per_file: 20 * 1024 * 1024,
            pretty: true,
            colored: true,
        }
    }
}

/// Repository metadata overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepositoryOptions {
    /// Owner/account recorded on every chunk instead of the one derived from the URL.
    pub owner: Option<String>,
}

/// Main configuration structure with nested sections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Scanning options
    pub scan: ScanOptions,

    /// Fallback chunking options
    pub chunking: ChunkingOptions,

    /// Output options
    pub output: OutputOptions,

    /// Repository metadata overrides
    pub repository: RepositoryOptions,
}

impl Config {
    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or a value is out of range.
    pub fn from_yaml(content: &str) -> Result<Self> {
        tracing::debug!("Parsing configuration from YAML");
        let expanded = expand_env_vars(content);

        let config: Config = serde_yaml::from_str(&expanded).map_err(|e| {
            IacDriftError::config_parse(e.to_string(), Some(Box::new(e)), file!(), line!())
        })?;
        config.validate()?;

        tracing::debug!(
            ignore_patterns = config.scan.ignore_patterns.len(),
            window_tokens = config.chunking.window_tokens,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` for the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.window_tokens == 0 {
            return Err(crate::err!(ConfigValue {
                key: "chunking.window_tokens".to_string(),
                message: "must be greater than zero".to_string(),
            }));
        }
        if self.chunking.overlap_tokens >= self.chunking.window_tokens {
            return Err(crate::err!(ConfigValue {
                key: "chunking.overlap_tokens".to_string(),
                message: format!(
                    "must be smaller than window_tokens ({})",
                    self.chunking.window_tokens
                ),
            }));
        }
        if self.output.max_bytes_per_file == 0 {
            return Err(crate::err!(ConfigValue {
                key: "output.max_bytes_per_file".to_string(),
                message: "must be greater than zero".to_string(),
            }));
        }
        for pattern in &self.scan.ignore_patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(crate::err!(ConfigValue {
                    key: "scan.ignore_patterns".to_string(),
                    message: format!("invalid glob '{pattern}': {e}"),
                }));
            }
        }
        Ok(())
    }

    /// Generate an example YAML configuration.
    #[must_use]
    pub fn example_yaml() -> String {
        r#"# IaCDrift Configuration File

# File discovery and classification
scan:
  # Glob patterns matched against file base names; matches are skipped
  ignore_patterns: []
  #   - "*.auto.tfvars"
  #   - "override.tf"

  # Directory names never descended into
  skip_dirs:
    - ".git"
    - ".terraform"
    - ".terragrunt-cache"

  # Maximum depth for recursive directory scanning
  max_depth: 100

  # Follow symbolic links
  follow_links: false

  # Worker threads for per-file processing (0 = one per core)
  workers: 0

  # Upper bound on processing one repository, in seconds (0 = unbounded)
  timeout_secs: 300

  # Bytes of a .tf/.hcl file inspected before deciding it is Terraform
  prefix_bytes: 1000

  # Variables files looked up per directory when none is given on the
  # command line. A file uses the one in its own directory, else the nearest
  # parent's.
  var_file_names:
    - "terraform.tfvars"
    - "vars.tfvars"

# Line-window fallback for files no block can be recovered from
chunking:
  window_tokens: 400
  overlap_tokens: 50

# Output options
output:
  dir: "output"
  max_bytes_per_file: 20971520
  pretty: true
  colored: true

# Repository metadata
repository: {}
  # owner: ${IACDRIFT_OWNER}
"#
        .to_string()
    }

    /// Merge CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &crate::cli::ChunkArgs) {
        if !args.exclude_patterns.is_empty() {
            self.scan
                .ignore_patterns
                .extend(args.exclude_patterns.iter().cloned());
        }
        if let Some(workers) = args.workers {
            self.scan.workers = workers;
        }
        if let Some(ref owner) = args.owner {
            self.repository.owner = Some(owner.clone());
        }
        if let Some(ref dir) = args.output {
            if args.format == crate::types::OutputFormat::Jsonl {
                self.output.dir.clone_from(dir);
            }
        }
    }

    /// Merge ignore patterns from the environment.
    ///
    /// This should be called once after loading config so the classifier
    /// only ever sees an explicit pattern list.
    pub fn load_ignore_from_env(&mut self) {
        for var in [IGNORE_ENV, LEGACY_IGNORE_ENV] {
            if let Ok(value) = std::env::var(var) {
                let patterns = split_patterns(&value);
                if !patterns.is_empty() {
                    tracing::debug!(env_var = %var, count = patterns.len(), "Loaded ignore patterns from environment");
                    self.scan.ignore_patterns.extend(patterns);
                }
            }
        }
    }
}

/// Split a comma-separated pattern list, dropping blanks.
fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex"));

static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex"));

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. Unknown variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    BARE_VAR
        .replace_all(&braced, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
