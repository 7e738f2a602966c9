//! Configuration loaded from `routemap.toml`.
//!
//! Every field is optional; `effective_*` accessors resolve defaults so a
//! partially written file behaves like the defaults for everything it omits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutemapConfig {
    pub scan: ScanConfig,
    pub profiles: ProfilesConfig,
}

impl RoutemapConfig {
    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load configuration for a project.
    ///
    /// An explicit path must exist. Without one, `routemap.toml` under `root`
    /// is used when present and defaults otherwise.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    ::tracing::debug!(root = %root.display(), "no routemap.toml, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

/// Limits and knobs for a single file scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File-level ceiling on declaration-assembly steps.
    pub iteration_budget: Option<u64>,
    /// Ceiling on tokens one declaration may extend over.
    pub max_declaration_tokens: Option<u32>,
    /// Ceiling on bracket nesting inside one declaration.
    pub max_bracket_depth: Option<u32>,
    /// Worker threads for batch scans. 0 or unset uses the rayon default.
    pub threads: Option<usize>,
    /// Marker appended to partially literal paths.
    pub wildcard: Option<String>,
    /// Entries kept by the scan cache. 0 disables caching.
    pub cache_capacity: Option<u64>,
}

impl ScanConfig {
    pub fn effective_iteration_budget(&self) -> u64 {
        self.iteration_budget.unwrap_or(DEFAULT_ITERATION_BUDGET)
    }

    pub fn effective_max_declaration_tokens(&self) -> u32 {
        self.max_declaration_tokens
            .unwrap_or(DEFAULT_MAX_DECLARATION_TOKENS)
    }

    pub fn effective_max_bracket_depth(&self) -> u32 {
        self.max_bracket_depth.unwrap_or(DEFAULT_MAX_BRACKET_DEPTH)
    }

    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or(0)
    }

    pub fn effective_wildcard(&self) -> &str {
        self.wildcard.as_deref().unwrap_or(DEFAULT_WILDCARD)
    }

    pub fn effective_cache_capacity(&self) -> u64 {
        self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }
}

/// Which ecosystem profiles are active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    /// Ecosystem ids to keep. Empty keeps every built-in profile.
    pub enabled: Vec<String>,
    /// Additional profile tables to load, relative to the project root.
    pub extra: Vec<PathBuf>,
}

impl ProfilesConfig {
    pub fn is_enabled(&self, id: &str) -> bool {
        self.enabled.is_empty() || self.enabled.iter().any(|e| e == id)
    }
}
