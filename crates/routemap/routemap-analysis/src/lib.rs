//! # routemap-analysis
//!
//! Extraction engine for HTTP endpoint declarations.
//!
//! A file goes through five ordered passes, each pure given the ecosystem
//! profile and the previous pass's output:
//!
//! 1. [`lexical`] labels every byte as code, comment, or string.
//! 2. [`scanner`] tokenizes live code and matches route patterns, extending
//!    multiline declarations by comment/string-aware bracket balancing.
//! 3. [`alias`] tracks destructured and renamed registrar identifiers per
//!    lexical block; the scanner consults it while matching.
//! 4. [`scope`] builds the prefix tree (containers, groups, router variables,
//!    mounts, resources) and composes normalized paths.
//! 5. [`assembly`] turns resolved candidates into ordered [`Endpoint`]s.
//!
//! Ecosystems are data: see [`profiles`].

pub mod alias;
pub mod assembly;
pub mod cache;
pub mod http;
pub mod lexical;
pub mod pipeline;
pub mod profiles;
pub mod scanner;
pub mod scope;
pub mod types;

pub use pipeline::{scan_file, ScanEngine};
pub use profiles::{EcosystemProfile, ProfileRegistry};
pub use types::{BatchReport, Confidence, Endpoint, FileOutcome, FileScan, SourceFile};
