//! Local filesystem artifact store
//!
//! Each entry lives in its own directory under `<root>/entries`:
//!
//! | File | Purpose |
//! |------|---------|
//! | `data/<n>` | copy of the n-th cache path |
//! | `manifest.json` | key, version, timestamps; written last |
//!
//! The directory name is derived from the path-set version and the key, so
//! creating it is the reservation: a second writer gets `AlreadyExists`.
//! Entries without a manifest are still being written and are invisible to
//! lookups.

use crate::cache::{CacheKey, CachePaths, RestoreKeys};
use crate::store::{ArtifactStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Longest key the store accepts
const MAX_KEY_LENGTH: usize = 512;

/// Most keys (primary + restore keys) one lookup may carry
const MAX_LOOKUP_KEYS: usize = 10;

/// Copy buffer used when no chunk size is given
const DEFAULT_BUFFER_BYTES: u64 = 1024 * 1024;

/// Upper bound for the copy buffer, whatever the chunk size
const MAX_BUFFER_BYTES: u64 = 8 * 1024 * 1024;

const MANIFEST_FILE: &str = "manifest.json";
const DATA_DIR: &str = "data";

/// Metadata written once an entry is complete
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryManifest {
    key: String,
    version: String,
    paths: Vec<String>,
    created_at: DateTime<Utc>,
    size_bytes: u64,
}

/// Artifact store backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root` (created lazily on first save)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entries_dir(&self) -> PathBuf {
        self.root.join("entries")
    }

    fn entry_dir(&self, version: &str, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(version.as_bytes());
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        let id = hex::encode(&hasher.finalize()[..16]);
        self.entries_dir().join(id)
    }

    /// Read a complete entry's manifest
    async fn read_manifest(dir: &Path) -> StoreResult<Option<EntryManifest>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StoreError::io(format!("reading {}", path.display()), e))?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: dir.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// All complete entries saved for a path-set version
    async fn list_manifests(&self, version: &str) -> StoreResult<Vec<EntryManifest>> {
        let entries_dir = self.entries_dir();
        if !entries_dir.exists() {
            return Ok(vec![]);
        }

        let mut manifests = vec![];
        let mut entries = fs::read_dir(&entries_dir)
            .await
            .map_err(|e| StoreError::io("reading store entries", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io("reading store entry", e))?
        {
            match Self::read_manifest(&entry.path()).await {
                Ok(Some(manifest)) if manifest.version == version => manifests.push(manifest),
                Ok(_) => {}
                Err(e) => debug!("Skipping unreadable entry {}: {}", entry.path().display(), e),
            }
        }

        Ok(manifests)
    }

    /// Fill a reserved entry; on any failure the reservation is released so
    /// a later run can retry
    async fn fill_reserved(
        entry_dir: &Path,
        key: &CacheKey,
        paths: &CachePaths,
        version: String,
        sources: Vec<(usize, PathBuf)>,
        chunk_size: Option<u64>,
    ) -> StoreResult<u64> {
        let result = Self::fill_entry(entry_dir, key, paths, version, sources, chunk_size).await;
        if result.is_err() {
            release_reservation(entry_dir).await;
        }
        result
    }

    /// Copy the sources into `entry_dir`, then commit the manifest
    async fn fill_entry(
        entry_dir: &Path,
        key: &CacheKey,
        paths: &CachePaths,
        version: String,
        sources: Vec<(usize, PathBuf)>,
        chunk_size: Option<u64>,
    ) -> StoreResult<u64> {
        let buffer = chunk_size.unwrap_or(DEFAULT_BUFFER_BYTES);
        let data_dir = entry_dir.join(DATA_DIR);
        let size_bytes =
            tokio::task::spawn_blocking(move || write_entry(&data_dir, &sources, buffer))
                .await
                .map_err(io::Error::other)
                .and_then(|result| result)
                .map_err(|e| StoreError::io(format!("saving entry {key}"), e))?;

        let manifest = EntryManifest {
            key: key.to_string(),
            version,
            paths: paths.iter().map(str::to_string).collect(),
            created_at: Utc::now(),
            size_bytes,
        };
        let content = serde_json::to_string_pretty(&manifest)
            .map_err(|e| StoreError::io("serializing manifest", io::Error::other(e)))?;

        let tmp = entry_dir.join(format!("{MANIFEST_FILE}.tmp"));
        fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::io("writing manifest", e))?;
        fs::rename(&tmp, entry_dir.join(MANIFEST_FILE))
            .await
            .map_err(|e| StoreError::io("committing manifest", e))?;

        Ok(size_bytes)
    }

    /// Exact primary key first, then each prefix in order, newest first
    async fn find(
        &self,
        version: &str,
        primary_key: &CacheKey,
        restore_keys: &RestoreKeys,
    ) -> StoreResult<Option<EntryManifest>> {
        let exact_dir = self.entry_dir(version, primary_key.as_str());
        if let Some(manifest) = Self::read_manifest(&exact_dir).await? {
            if manifest.key == primary_key.as_str() {
                return Ok(Some(manifest));
            }
        }

        if restore_keys.is_empty() {
            return Ok(None);
        }

        let manifests = self.list_manifests(version).await?;
        for prefix in restore_keys.iter() {
            let newest = manifests
                .iter()
                .filter(|m| m.key.starts_with(prefix))
                .max_by_key(|m| m.created_at);
            if let Some(manifest) = newest {
                debug!("Restore key {} matched {}", prefix, manifest.key);
                return Ok(Some(manifest.clone()));
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn exists(&self, paths: &CachePaths, key: &CacheKey) -> StoreResult<bool> {
        validate_key(key.as_str())?;

        let dir = self.entry_dir(&paths.version(), key.as_str());
        Ok(Self::read_manifest(&dir)
            .await?
            .is_some_and(|m| m.key == key.as_str()))
    }

    async fn restore(
        &self,
        paths: &CachePaths,
        primary_key: &CacheKey,
        restore_keys: &RestoreKeys,
    ) -> StoreResult<Option<String>> {
        if restore_keys.len() + 1 > MAX_LOOKUP_KEYS {
            return Err(StoreError::Validation(format!(
                "Key Validation Error: Keys are limited to a maximum of {MAX_LOOKUP_KEYS}."
            )));
        }
        validate_key(primary_key.as_str())?;
        for prefix in restore_keys.iter() {
            validate_key(prefix)?;
        }

        let version = paths.version();
        let Some(manifest) = self.find(&version, primary_key, restore_keys).await? else {
            return Ok(None);
        };

        let data_dir = self.entry_dir(&version, &manifest.key).join(DATA_DIR);
        let targets: Vec<PathBuf> = paths.iter().map(expand_path).collect();
        let bytes = tokio::task::spawn_blocking(move || {
            read_entry(&data_dir, &targets, DEFAULT_BUFFER_BYTES)
        })
        .await
        .map_err(|e| StoreError::io("joining restore task", io::Error::other(e)))?
        .map_err(|e| StoreError::io(format!("restoring entry {}", manifest.key), e))?;

        info!("Cache size: {}", format_bytes(bytes));
        Ok(Some(manifest.key))
    }

    async fn save(
        &self,
        paths: &CachePaths,
        key: &CacheKey,
        chunk_size: Option<u64>,
    ) -> StoreResult<()> {
        validate_key(key.as_str())?;
        if chunk_size == Some(0) {
            return Err(StoreError::Validation(
                "Upload chunk size must be greater than zero".to_string(),
            ));
        }

        let sources: Vec<(usize, PathBuf)> = paths
            .iter()
            .map(expand_path)
            .enumerate()
            .filter(|(_, path)| path.exists())
            .collect();
        if sources.is_empty() {
            return Err(StoreError::NothingToSave);
        }

        let version = paths.version();
        let entries_dir = self.entries_dir();
        fs::create_dir_all(&entries_dir)
            .await
            .map_err(|e| StoreError::io(format!("creating {}", entries_dir.display()), e))?;

        let entry_dir = self.entry_dir(&version, key.as_str());
        match fs::create_dir(&entry_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::ReserveConflict(format!(
                    "Unable to reserve cache with key {key}, another job may be creating this cache."
                )));
            }
            Err(e) => return Err(StoreError::io("reserving cache entry", e)),
        }
        debug!("Reserved {} at {}", key, entry_dir.display());

        let size_bytes =
            Self::fill_reserved(&entry_dir, key, paths, version, sources, chunk_size).await?;

        info!("Cache size: {}", format_bytes(size_bytes));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// Remove a half-written entry so its key can be reserved again
async fn release_reservation(entry_dir: &Path) {
    if let Err(e) = fs::remove_dir_all(entry_dir).await {
        debug!("Failed to clean up {}: {}", entry_dir.display(), e);
    }
}

fn validate_key(key: &str) -> StoreResult<()> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(StoreError::Validation(format!(
            "Key Validation Error: {key} cannot be larger than {MAX_KEY_LENGTH} characters."
        )));
    }
    if key.contains(',') {
        return Err(StoreError::Validation(format!(
            "Key Validation Error: {key} cannot contain commas."
        )));
    }
    Ok(())
}

/// Expand a leading `~` to the home directory
fn expand_path(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

/// Format bytes as human-readable size (e.g., "1.5 GB")
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn buffer_len(chunk_size: u64) -> usize {
    chunk_size.clamp(1, MAX_BUFFER_BYTES) as usize
}

fn write_entry(data_dir: &Path, sources: &[(usize, PathBuf)], chunk_size: u64) -> io::Result<u64> {
    std::fs::create_dir_all(data_dir)?;
    let mut total = 0;
    for (index, source) in sources {
        total += copy_into(source, &data_dir.join(index.to_string()), buffer_len(chunk_size))?;
    }
    Ok(total)
}

fn read_entry(data_dir: &Path, targets: &[PathBuf], chunk_size: u64) -> io::Result<u64> {
    let mut total = 0;
    for (index, target) in targets.iter().enumerate() {
        let source = data_dir.join(index.to_string());
        // path did not exist when the entry was saved
        if std::fs::symlink_metadata(&source).is_err() {
            continue;
        }
        total += copy_into(&source, target, buffer_len(chunk_size))?;
    }
    Ok(total)
}

/// Copy a file, symlink or directory tree to `dst`, returning bytes copied
fn copy_into(src: &Path, dst: &Path, buf_len: usize) -> io::Result<u64> {
    let file_type = std::fs::symlink_metadata(src)?.file_type();

    if file_type.is_symlink() {
        copy_symlink(src, dst)?;
        return Ok(0);
    }
    if file_type.is_file() {
        return copy_file(src, dst, buf_len);
    }

    let mut total = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        let kind = entry.file_type();

        if kind.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if kind.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            total += copy_file(entry.path(), &target, buf_len)?;
        }
    }
    Ok(total)
}

fn copy_file(src: &Path, dst: &Path, buf_len: usize) -> io::Result<u64> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut reader = File::open(src)?;
    let mut writer = File::create(dst)?;
    let mut buf = vec![0u8; buf_len];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;

    std::fs::set_permissions(dst, std::fs::metadata(src)?.permissions())?;
    Ok(total)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = std::fs::read_link(src)?;
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::symlink_metadata(dst).is_ok() {
        std::fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dst: &Path) -> io::Result<()> {
    debug!("Skipping symlink {}", src.display());
    Ok(())
}
