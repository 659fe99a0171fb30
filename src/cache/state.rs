//! Run state carried from the restore step to the save step
//!
//! Each pipeline step is a separate process, so the state is persisted as
//! JSON under the state directory, one file per run and path set. A job that
//! caches several path sets keeps one state per set. Values are write-once:
//! once the restore step commits a key, later steps only read it.

use crate::cache::keys::{CacheKey, CachePaths};
use crate::error::{CachegateError, CachegateResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// State entry names
pub mod entries {
    /// Primary key resolved by the restore step
    pub const CACHE_PRIMARY_KEY: &str = "CACHE_KEY";
    /// Key of the entry actually restored
    pub const CACHE_MATCHED_KEY: &str = "CACHE_RESULT";
}

/// Run id used when no runner variables are present
pub const LOCAL_RUN_ID: &str = "local";

/// Leading characters of the scope used in state file names
const SCOPE_CHARS: usize = 16;

/// Key-value state scoped to one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Run this state belongs to
    pub run_id: String,

    /// Path-set version this state belongs to
    pub scope: String,

    /// Recorded values
    values: BTreeMap<String, String>,

    /// When the state was created
    pub created_at: DateTime<Utc>,

    /// When a value was last recorded
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Create an empty state for a run and scope
    pub fn new(run_id: impl Into<String>, scope: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            scope: scope.into(),
            values: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a value. Recording the same value twice is a no-op, a
    /// different value for an existing name is rejected.
    pub fn record(&mut self, name: &str, value: &str) -> CachegateResult<()> {
        match self.values.get(name) {
            Some(existing) if existing == value => Ok(()),
            Some(existing) => Err(CachegateError::RunStateConflict {
                run_id: self.run_id.clone(),
                name: name.to_string(),
                existing: existing.clone(),
            }),
            None => {
                self.values.insert(name.to_string(), value.to_string());
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }

    /// Get a recorded value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn record_primary_key(&mut self, key: &CacheKey) -> CachegateResult<()> {
        self.record(entries::CACHE_PRIMARY_KEY, key.as_str())
    }

    pub fn record_matched_key(&mut self, key: &str) -> CachegateResult<()> {
        self.record(entries::CACHE_MATCHED_KEY, key)
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.get(entries::CACHE_PRIMARY_KEY)
    }

    pub fn matched_key(&self) -> Option<&str> {
        self.get(entries::CACHE_MATCHED_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Scope of the run state for a path set
pub fn state_scope(paths: &CachePaths) -> String {
    paths.version()
}

/// File-backed persistence for run state
#[derive(Debug, Clone)]
pub struct RunStateStore {
    dir: PathBuf,
}

impl RunStateStore {
    /// Store run state files under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the state files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the state file path for a run and scope
    pub fn file_path(&self, run_id: &str, scope: &str) -> PathBuf {
        let scope: String = scope.chars().take(SCOPE_CHARS).collect();
        self.dir.join(format!(
            "{}-{}.json",
            sanitize_name(run_id),
            sanitize_name(&scope)
        ))
    }

    /// Load the state of a run, if any was saved
    pub async fn load(&self, run_id: &str, scope: &str) -> CachegateResult<Option<RunState>> {
        let path = self.file_path(run_id, scope);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| CachegateError::io(format!("reading run state {}", path.display()), e))?;

        let state: RunState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    /// Save run state to file
    pub async fn save(&self, state: &RunState) -> CachegateResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CachegateError::io("creating run state directory", e))?;

        let path = self.file_path(&state.run_id, &state.scope);
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content)
            .await
            .map_err(|e| CachegateError::io(format!("writing run state {}", path.display()), e))?;

        debug!("Saved run state to {}", path.display());
        Ok(())
    }

    /// Discard the state of a finished run
    pub async fn delete(&self, run_id: &str, scope: &str) -> CachegateResult<()> {
        let path = self.file_path(run_id, scope);
        if path.exists() {
            fs::remove_file(&path).await.map_err(|e| {
                CachegateError::io(format!("deleting run state {}", path.display()), e)
            })?;
        }
        Ok(())
    }
}

/// Work out which run this process belongs to
///
/// An explicit id wins; otherwise runner variables are consulted so the
/// restore and save steps of one job agree without extra wiring.
pub fn detect_run_id(explicit: Option<&str>) -> String {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());

    if let Some(run) = var("GITHUB_RUN_ID") {
        return match (var("GITHUB_RUN_ATTEMPT"), var("GITHUB_JOB")) {
            (Some(attempt), Some(job)) => format!("{run}-{attempt}-{job}"),
            (None, Some(job)) => format!("{run}-{job}"),
            _ => run,
        };
    }

    var("CI_JOB_ID")
        .or_else(|| var("BUILDKITE_JOB_ID"))
        .unwrap_or_else(|| LOCAL_RUN_ID.to_string())
}

/// Keep run ids and scopes safe to use as file names
fn sanitize_name(name: &str) -> String {
    name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
