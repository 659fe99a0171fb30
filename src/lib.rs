//! cachegate - Cache restore/save steps for CI pipelines
//!
//! Resolves cache keys from step inputs, restores and saves entries through
//! an artifact store, and decides which store failures fail the pipeline.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod inputs;
pub mod store;
pub mod ui;

pub use error::{CachegateError, CachegateResult};
