//! Public result types.

use serde::{Deserialize, Serialize};

use routemap_core::errors::ScanError;

use crate::scanner::DiscardedCandidate;

/// How much of an endpoint's path was statically known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    #[default]
    Static,
    /// Literal prefix followed by a wildcard.
    DynamicPathUnresolved,
    /// Declaration abandoned at its assembly ceiling.
    BudgetExceeded,
}

impl Confidence {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::DynamicPathUnresolved => "dynamic-path-unresolved",
            Self::BudgetExceeded => "budget-exceeded",
        }
    }

    /// The less certain of two levels.
    pub fn weakest(self, other: Self) -> Self {
        fn rank(c: Confidence) -> u8 {
            match c {
                Confidence::Static => 0,
                Confidence::DynamicPathUnresolved => 1,
                Confidence::BudgetExceeded => 2,
            }
        }
        if rank(other) > rank(self) {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One (method, path) pair declared in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Upper-case method, or `ANY`.
    pub method: String,
    /// Full normalized path: leading slash, `{name}` parameters, no trailing slash.
    pub path: String,
    /// Joined prefixes and path before parameter normalization.
    pub raw_path: String,
    pub file: String,
    pub line: u32,
    pub handler_name: Option<String>,
    /// Position of the originating declaration in the file.
    pub declaration_order: u32,
    pub confidence: Confidence,
    pub ecosystem: String,
    /// Profile pattern that matched.
    pub pattern: String,
}

/// Everything learned about one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileScan {
    pub file: String,
    pub ecosystem: String,
    pub endpoints: Vec<Endpoint>,
    #[serde(skip)]
    pub discarded: Vec<DiscardedCandidate>,
    /// Malformed spans, unresolved paths, and budget overruns.
    pub diagnostics: Vec<ScanError>,
    /// The file budget ran out, or a declaration was abandoned at its ceiling.
    pub partial: bool,
}

impl FileScan {
    pub fn methods_for(&self, path: &str) -> Vec<&str> {
        self.endpoints
            .iter()
            .filter(|e| e.path == path)
            .map(|e| e.method.as_str())
            .collect()
    }

    pub fn has(&self, method: &str, path: &str) -> bool {
        self.endpoints
            .iter()
            .any(|e| e.method == method && e.path == path)
    }
}

/// One `(path, source, ecosystem)` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub source: String,
    pub ecosystem: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, source: impl Into<String>, ecosystem: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            ecosystem: ecosystem.into(),
        }
    }
}

/// Per-file result of a batch scan, in input order.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Scanned(FileScan),
    Failed { path: String, error: ScanError },
    /// Skipped because the batch was cancelled first.
    Cancelled { path: String },
}

impl FileOutcome {
    pub fn scan(&self) -> Option<&FileScan> {
        match self {
            Self::Scanned(scan) => Some(scan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub endpoint_count: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub partial: usize,
}

impl BatchReport {
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.outcomes
            .iter()
            .filter_map(FileOutcome::scan)
            .flat_map(|s| s.endpoints.iter())
    }
}
