//! Per-file pipeline and the parallel batch driver.
//!
//! `scan_file` runs the five passes in order on one file. `ScanEngine`
//! owns the profile registry, the scan settings and the cache, and fans a
//! batch of files out over rayon. Files share nothing mutable.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use routemap_core::config::{RoutemapConfig, ScanConfig};
use routemap_core::errors::{ProfileError, ScanError};
use routemap_core::traits::CancellationToken;

use crate::assembly::EndpointAssembler;
use crate::cache::ScanCache;
use crate::profiles::{EcosystemProfile, ProfileRegistry};
use crate::scanner::{DeclarationScanner, ScanLimits, SourceView};
use crate::scope::ScopeTreeBuilder;
use crate::types::{BatchReport, FileOutcome, FileScan, SourceFile};

/// Scan one file with an already resolved profile.
pub fn scan_file(profile: &EcosystemProfile, file: &str, source: &str, config: &ScanConfig) -> FileScan {
    let span = tracing::debug_span!("scan_file", file, ecosystem = %profile.id);
    let _guard = span.enter();

    let view = SourceView::build(source, profile);
    for malformed in &view.classification.malformed {
        tracing::warn!(file, error = %malformed, "malformed span recovered");
    }

    let output = DeclarationScanner::new(profile, ScanLimits::from_config(config)).scan(&view);
    let tree = ScopeTreeBuilder::new(&view.blocks).build(&output.constructs);
    for node in tree.nodes().iter().skip(1) {
        tracing::trace!(id = node.id, parent = ?node.parent, prefix = node.prefix_segment(), line = node.line, "scope node");
    }
    let endpoints = EndpointAssembler::new(profile, file).assemble(&output.candidates, &tree, &view.blocks);

    let mut diagnostics = view.classification.malformed.clone();
    diagnostics.extend(output.diagnostics);
    tracing::debug!(
        endpoints = endpoints.len(),
        discarded = output.discarded.len(),
        steps = output.steps,
        partial = output.partial,
        "file scanned"
    );

    FileScan {
        file: file.to_string(),
        ecosystem: profile.id.clone(),
        endpoints,
        discarded: output.discarded,
        diagnostics,
        partial: output.partial,
    }
}

/// Shared entry point for scanning many files.
pub struct ScanEngine {
    registry: Arc<ProfileRegistry>,
    config: ScanConfig,
    cache: Option<ScanCache>,
    pool: Option<rayon::ThreadPool>,
}

impl ScanEngine {
    pub fn new(registry: Arc<ProfileRegistry>, config: ScanConfig) -> Self {
        let capacity = config.effective_cache_capacity();
        let cache = (capacity > 0).then(|| ScanCache::new(capacity));
        let threads = config.effective_threads();
        let pool = if threads == 0 {
            None
        } else {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!(threads, error = %e, "could not build scan pool, using the global pool");
                    None
                }
            }
        };
        Self {
            registry,
            config,
            cache,
            pool,
        }
    }

    /// Built-in profiles with default settings.
    pub fn with_defaults() -> Result<Self, ProfileError> {
        Ok(Self::new(Arc::new(ProfileRegistry::builtin()?), ScanConfig::default()))
    }

    pub fn from_config(config: &RoutemapConfig, root: &Path) -> Result<Self, ProfileError> {
        let registry = ProfileRegistry::from_config(&config.profiles, root)?;
        Ok(Self::new(Arc::new(registry), config.scan.clone()))
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&ScanCache> {
        self.cache.as_ref()
    }

    /// Scan one input. Only an unknown ecosystem is an error; everything
    /// else is reported on the returned scan.
    pub fn scan_source(&self, input: &SourceFile) -> Result<Arc<FileScan>, ScanError> {
        let profile = self.registry.get(&input.ecosystem).inspect_err(|e| {
            tracing::warn!(file = %input.path, error = %e, "file skipped");
        })?;
        let key = self
            .cache
            .as_ref()
            .map(|_| ScanCache::key(&input.ecosystem, &input.path, &input.source));
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if let Some(hit) = cache.get(key) {
                tracing::trace!(file = %input.path, "scan cache hit");
                return Ok(hit);
            }
        }
        let scan = Arc::new(scan_file(&profile, &input.path, &input.source, &self.config));
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, Arc::clone(&scan));
        }
        Ok(scan)
    }

    /// Scan files in parallel. Outcomes keep input order; files not yet
    /// started when `cancel` fires are reported as cancelled.
    pub fn scan_batch(&self, files: &[SourceFile], cancel: &CancellationToken) -> BatchReport {
        let start = Instant::now();
        let run = || -> Vec<FileOutcome> {
            files
                .par_iter()
                .map(|input| {
                    if cancel.is_cancelled() {
                        return FileOutcome::Cancelled {
                            path: input.path.clone(),
                        };
                    }
                    match self.scan_source(input) {
                        Ok(scan) => FileOutcome::Scanned(Arc::unwrap_or_clone(scan)),
                        Err(error) => FileOutcome::Failed {
                            path: input.path.clone(),
                            error,
                        },
                    }
                })
                .collect()
        };
        let outcomes = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let mut report = BatchReport {
            outcomes,
            ..BatchReport::default()
        };
        for outcome in &report.outcomes {
            match outcome {
                FileOutcome::Scanned(scan) => {
                    report.endpoint_count += scan.endpoints.len();
                    if scan.partial {
                        report.partial += 1;
                    }
                }
                FileOutcome::Failed { .. } => report.failed += 1,
                FileOutcome::Cancelled { .. } => report.cancelled += 1,
            }
        }
        tracing::info!(
            files = files.len(),
            endpoints = report.endpoint_count,
            failed = report.failed,
            cancelled = report.cancelled,
            partial = report.partial,
            cache_entries = self.cache.as_ref().map_or(0, ScanCache::entry_count),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch scan complete"
        );
        report
    }
}
