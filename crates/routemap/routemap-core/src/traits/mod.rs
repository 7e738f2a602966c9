//! Shared traits and handles used across routemap crates.

pub mod cancellation;

pub use cancellation::CancellationToken;
