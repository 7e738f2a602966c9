//! # routemap-core
//!
//! Core types, errors, configuration, tracing, and constants shared by the
//! routemap crates. Nothing in here knows about any particular ecosystem.

pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing;
pub mod traits;
pub mod types;
