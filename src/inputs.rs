//! Step inputs
//!
//! Pipeline runners hand step inputs to the process as `INPUT_<NAME>`
//! environment variables. Values given explicitly (CLI flags, tests) take
//! precedence over the environment.

use crate::error::{CachegateError, CachegateResult};
use std::collections::HashMap;
use std::env;

/// Names of the inputs consumed by the cache steps
pub mod names {
    /// Primary cache key
    pub const KEY: &str = "key";
    /// Newline-separated list of paths to cache
    pub const PATH: &str = "path";
    /// Newline-separated list of fallback key prefixes
    pub const RESTORE_KEYS: &str = "restore-keys";
    /// Whether a miss fails the step (anything but `false` means yes)
    pub const REQUIRED: &str = "required";
    /// Chunk size handed to the store on save
    pub const UPLOAD_CHUNK_SIZE: &str = "upload-chunk-size";
}

/// Source of named step inputs
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    overrides: HashMap<String, String>,
    read_env: bool,
}

impl Inputs {
    /// Inputs backed by the process environment
    pub fn from_env() -> Self {
        Self {
            overrides: HashMap::new(),
            read_env: true,
        }
    }

    /// Inputs with no environment fallback
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set an explicit value, shadowing the environment
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.overrides.insert(name.to_string(), value.into());
    }

    /// Builder form of [`Inputs::set`]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Get a trimmed input value; empty values count as absent
    pub fn get(&self, name: &str) -> Option<String> {
        let raw = match self.overrides.get(name) {
            Some(value) => Some(value.clone()),
            None if self.read_env => env_lookup(name),
            None => None,
        }?;

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Get an input that must be present
    pub fn get_required(&self, name: &str) -> CachegateResult<String> {
        self.get(name)
            .ok_or_else(|| CachegateError::ConfigMissing(name.to_string()))
    }

    /// Get a newline-separated list input
    ///
    /// Lines are trimmed and blank lines dropped. Order and duplicates are
    /// preserved.
    pub fn get_array(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|value| split_lines(&value))
            .unwrap_or_default()
    }

    /// Get an optional non-negative integer input
    pub fn get_int(&self, name: &str) -> CachegateResult<Option<u64>> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value.parse::<u64>().map(Some).map_err(|_| {
                CachegateError::input_invalid(name, format!("expected an integer, got '{value}'"))
            }),
        }
    }
}

/// Split a multi-line input into trimmed, non-empty lines
pub fn split_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Environment variable names tried for an input, most specific first
fn env_var_names(name: &str) -> [String; 2] {
    let upper = name.replace(' ', "_").to_uppercase();
    let portable = upper.replace('-', "_");
    [format!("INPUT_{upper}"), format!("INPUT_{portable}")]
}

fn env_lookup(name: &str) -> Option<String> {
    env_var_names(name)
        .iter()
        .find_map(|var| env::var(var).ok())
}
