//! Error types. One enum per concern, all built on `thiserror`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems encountered while scanning one file.
///
/// Only [`ScanError::UnknownEcosystem`] aborts a file. The other variants are
/// recovered from and travel with the partial result as diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanError {
    /// A string or comment was still open at end of input.
    #[error("unterminated {state} starting at line {line} (offset {offset})")]
    MalformedSpan {
        offset: usize,
        line: u32,
        state: String,
    },

    /// The path argument is not a static literal.
    #[error("path at line {line} is not statically determinable: {expression}")]
    UnresolvedPath { line: u32, expression: String },

    /// A declaration (or the whole file) ran past its assembly ceiling.
    #[error("declaration at line {line} exceeded the assembly budget of {limit}")]
    AssemblyBudgetExceeded { line: u32, limit: u64 },

    /// No profile is registered under the requested ecosystem id.
    #[error("no ecosystem profile registered for '{id}'")]
    UnknownEcosystem { id: String },
}

impl ScanError {
    /// Whether this error prevents any result for the file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownEcosystem { .. })
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedSpan { .. } => "malformed_span",
            Self::UnresolvedPath { .. } => "unresolved_path",
            Self::AssemblyBudgetExceeded { .. } => "assembly_budget_exceeded",
            Self::UnknownEcosystem { .. } => "unknown_ecosystem",
        }
    }
}

/// Errors loading declarative ecosystem profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to parse profile table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("profile '{profile}' is invalid: {reason}")]
    Invalid { profile: String, reason: String },

    #[error("ecosystem '{id}' is registered twice")]
    Duplicate { id: String },

    #[error("failed to read profile file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading `routemap.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
