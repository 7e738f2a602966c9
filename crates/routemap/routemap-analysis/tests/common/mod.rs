//! Shared helpers for the integration tests.

#![allow(dead_code)]

use routemap_analysis::{scan_file, FileScan, ProfileRegistry};
use routemap_core::config::ScanConfig;

pub fn scan(ecosystem: &str, source: &str) -> FileScan {
    let registry = ProfileRegistry::builtin().expect("builtin profiles");
    let profile = registry.get(ecosystem).expect("known ecosystem");
    scan_file(&profile, "fixture", source, &ScanConfig::default())
}

/// `(method, path)` pairs in emission order.
pub fn routes(scan: &FileScan) -> Vec<(String, String)> {
    scan.endpoints
        .iter()
        .map(|e| (e.method.clone(), e.path.clone()))
        .collect()
}

pub fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(m, p)| (m.to_string(), p.to_string()))
        .collect()
}

pub fn handler_of<'a>(scan: &'a FileScan, method: &str, path: &str) -> Option<&'a str> {
    scan.endpoints
        .iter()
        .find(|e| e.method == method && e.path == path)
        .and_then(|e| e.handler_name.as_deref())
}
