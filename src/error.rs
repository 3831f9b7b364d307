//! Error types for IaCDrift.
//!
//! This module defines the error hierarchy using `thiserror`. All errors
//! carry the source location where they were raised and can be propagated
//! with the `?` operator.
//!
//! # Error Categories
//!
//! - **IO errors**: unreadable files, missing directories
//! - **Parse errors**: HCL syntax errors (normally absorbed by the fallback path)
//! - **Git errors**: reading the HEAD of a local checkout
//! - **Config errors**: invalid configuration files
//! - **Output errors**: writing chunk records
//!
//! Most of these never leave the per-file pipeline: a file that cannot be
//! read or understood is skipped and recorded, and processing continues.
//!
//! # Example
//!
//! ```rust
//! use iacdrift::error::{IacDriftError, Result};
//!
//! fn read(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .map_err(|e| IacDriftError::io(path, e, file!(), line!()))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Macro to create errors with automatic source location tracking.
///
/// Fields may use the struct shorthand.
///
/// Usage:
/// ```ignore
/// return Err(err!(ConfigValue { key: "output.dir".to_string(), message }));
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident { $($field:ident $(: $value:expr)?),* $(,)? }) => {
        $crate::error::IacDriftError::$variant {
            $($field $(: $value)?,)*
            src_path: file!(),
            src_line: line!(),
        }
    };
}

/// A specialized Result type for IaCDrift operations.
pub type Result<T> = std::result::Result<T, IacDriftError>;

/// The main error type for IaCDrift.
#[derive(Error, Debug)]
pub enum IacDriftError {
    // =========================================================================
    // I/O and File System Errors
    // =========================================================================
    /// I/O error with path context.
    #[error("I/O error at '{path}' ({src_path}:{src_line}): {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Directory not found.
    #[error("Directory not found: {path} ({src_path}:{src_line})")]
    DirectoryNotFound {
        /// The missing directory path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A file was not valid UTF-8 text.
    #[error("File is not valid UTF-8: {path} ({src_path}:{src_line})")]
    NotText {
        /// The offending file
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // HCL Parsing Errors
    // =========================================================================
    /// HCL parsing error.
    #[error("Failed to parse HCL in '{file}' \n\t({src_path}:{src_line}): {message}")]
    HclParse {
        /// The file being parsed
        file: PathBuf,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Git Errors
    // =========================================================================
    /// Git operation error.
    #[error("Git error ({src_path}:{src_line}): {message}")]
    Git {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration parsing error.
    #[error("Failed to parse configuration ({src_path}:{src_line}): {message}")]
    ConfigParse {
        /// Error message
        message: String,
        /// The underlying error (if any)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}' ({src_path}:{src_line}): {message}")]
    ConfigValue {
        /// The configuration key
        key: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Processing Errors
    // =========================================================================
    /// Processing a directory took longer than `scan.timeout_secs`.
    #[error("Timed out after {seconds}s processing '{path}' ({src_path}:{src_line})")]
    Timeout {
        /// The directory being processed
        path: PathBuf,
        /// The configured limit
        seconds: u64,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Output serialization or writing error.
    #[error("Failed to write output ({src_path}:{src_line}): {message}")]
    Output {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Internal error (should not happen in normal operation).
    #[error("Internal error ({src_path}:{src_line}): {message}")]
    Internal {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },
}

impl IacDriftError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error, src_path: &'static str, src_line: u32) -> Self {
        Self::Io { path: path.into(), source, src_path, src_line }
    }

    /// Creates an `HclParse` error.
    #[must_use]
    pub fn hcl_parse(file: PathBuf, message: String, src_path: &'static str, src_line: u32) -> Self {
        Self::HclParse { file, message, src_path, src_line }
    }

    /// Creates a `Git` error.
    #[must_use]
    pub fn git(message: String, src_path: &'static str, src_line: u32) -> Self {
        Self::Git { message, src_path, src_line }
    }

    /// Creates a `ConfigParse` error.
    #[must_use]
    pub fn config_parse(message: String, source: Option<Box<dyn std::error::Error + Send + Sync>>, src_path: &'static str, src_line: u32) -> Self {
        Self::ConfigParse { message, source, src_path, src_line }
    }

    /// Returns the appropriate exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => 13,
            Self::DirectoryNotFound { .. } => 15,
            Self::ConfigParse { .. } => 18,
            Self::ConfigValue { .. } => 19,
            Self::Timeout { .. } => 24,
            Self::Output { .. } => 25,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for IacDriftError {
    fn from(source: serde_json::Error) -> Self {
        Self::Output {
            message: format!("JSON serialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}
