//! Engine-wide defaults.

/// File-level ceiling on declaration-assembly steps before a scan is abandoned.
pub const DEFAULT_ITERATION_BUDGET: u64 = 2_000_000;

/// Maximum tokens a single declaration may extend over.
pub const DEFAULT_MAX_DECLARATION_TOKENS: u32 = 4_096;

/// Maximum bracket nesting inside one declaration.
pub const DEFAULT_MAX_BRACKET_DEPTH: u32 = 256;

/// Marker appended to a path whose tail could not be resolved statically.
pub const DEFAULT_WILDCARD: &str = "*";

/// Number of file scans kept by the in-memory scan cache.
pub const DEFAULT_CACHE_CAPACITY: u64 = 4_096;

/// Name of the project-level configuration file.
pub const CONFIG_FILE_NAME: &str = "routemap.toml";

/// Environment variable read by [`crate::tracing::init_tracing`].
pub const LOG_ENV: &str = "ROUTEMAP_LOG";

/// Filter used when `ROUTEMAP_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "warn";
