//! In-memory artifact store for orchestrator tests

use crate::cache::{CacheKey, CachePaths, RestoreKeys};
use crate::store::{ArtifactStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Mutex;

/// Fake store holding keys only, newest last
#[derive(Default)]
pub struct FakeStore {
    keys: Mutex<Vec<String>>,
    failure: Mutex<Option<StoreError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn with_keys(keys: &[&str]) -> Self {
        let store = Self::default();
        store
            .keys
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        store
    }

    /// Make the next store call fail
    pub fn fail_with(self, err: StoreError) -> Self {
        *self.failure.lock().unwrap() = Some(err);
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, call: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn exists(&self, _paths: &CachePaths, key: &CacheKey) -> StoreResult<bool> {
        self.enter("exists")?;
        Ok(self.keys.lock().unwrap().iter().any(|k| key == k.as_str()))
    }

    async fn restore(
        &self,
        _paths: &CachePaths,
        primary_key: &CacheKey,
        restore_keys: &RestoreKeys,
    ) -> StoreResult<Option<String>> {
        self.enter("restore")?;
        let keys = self.keys.lock().unwrap();

        if keys.iter().any(|k| primary_key == k.as_str()) {
            return Ok(Some(primary_key.to_string()));
        }

        Ok(restore_keys
            .iter()
            .find_map(|prefix| keys.iter().rev().find(|k| k.starts_with(prefix)))
            .cloned())
    }

    async fn save(
        &self,
        _paths: &CachePaths,
        key: &CacheKey,
        _chunk_size: Option<u64>,
    ) -> StoreResult<()> {
        self.enter("save")?;
        let mut keys = self.keys.lock().unwrap();

        if keys.iter().any(|k| key == k.as_str()) {
            return Err(StoreError::ReserveConflict(format!(
                "Unable to reserve cache with key {key}, another job may be creating this cache."
            )));
        }

        keys.push(key.to_string());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

pub fn key(value: &str) -> CacheKey {
    CacheKey::new(value).unwrap()
}

pub fn paths() -> CachePaths {
    CachePaths::new(vec!["target".to_string()]).unwrap()
}
