//! Step outputs for downstream pipeline steps
//!
//! Outputs are appended to the runner's output file (`GITHUB_OUTPUT` style
//! `name=value` lines) when one is configured, otherwise printed to stdout.

use crate::cache::keys::CacheKey;
use crate::error::{CachegateError, CachegateResult};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Output names
pub mod names {
    pub const CACHE_PRIMARY_KEY: &str = "cache-primary-key";
    pub const CACHE_MATCHED_KEY: &str = "cache-matched-key";
    /// `true` only when the primary key matched exactly
    pub const CACHE_HIT: &str = "cache-hit";
}

/// Where outputs end up
#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Stdout,
    Memory,
}

/// Output channel of one step
#[derive(Debug)]
pub struct Outputs {
    target: Target,
    emitted: Vec<(String, String)>,
}

impl Outputs {
    /// Write outputs to `file`, or stdout when `None`
    pub fn new(file: Option<PathBuf>) -> Self {
        let target = match file {
            Some(path) => Target::File(path),
            None => Target::Stdout,
        };
        Self {
            target,
            emitted: Vec::new(),
        }
    }

    /// Outputs that are only recorded in memory
    pub fn capture() -> Self {
        Self {
            target: Target::Memory,
            emitted: Vec::new(),
        }
    }

    /// Emit one output
    pub async fn set(&mut self, name: &str, value: &str) -> CachegateResult<()> {
        debug!("Output {} = {}", name, value);
        self.emitted.push((name.to_string(), value.to_string()));

        match self.target {
            Target::File(ref path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|e| {
                        CachegateError::io(format!("opening output file {}", path.display()), e)
                    })?;

                file.write_all(format_output(name, value).as_bytes())
                    .await
                    .map_err(|e| {
                        CachegateError::io(format!("writing output file {}", path.display()), e)
                    })?;
                file.flush()
                    .await
                    .map_err(|e| CachegateError::io("flushing output file", e))?;
            }
            Target::Stdout => print!("{}", format_output(name, value)),
            Target::Memory => {}
        }

        Ok(())
    }

    pub async fn set_primary_key(&mut self, key: &CacheKey) -> CachegateResult<()> {
        self.set(names::CACHE_PRIMARY_KEY, key.as_str()).await
    }

    pub async fn set_matched_key(&mut self, key: &str) -> CachegateResult<()> {
        self.set(names::CACHE_MATCHED_KEY, key).await
    }

    pub async fn set_cache_hit(&mut self, hit: bool) -> CachegateResult<()> {
        self.set(names::CACHE_HIT, if hit { "true" } else { "false" })
            .await
    }

    /// Last value emitted for an output
    pub fn get(&self, name: &str) -> Option<&str> {
        self.emitted
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every output in emission order
    pub fn emitted(&self) -> &[(String, String)] {
        &self.emitted
    }
}

/// Format one output line; multi-line values use a heredoc delimiter
fn format_output(name: &str, value: &str) -> String {
    if !value.contains('\n') {
        return format!("{name}={value}\n");
    }

    let digest = Sha256::digest(value.as_bytes());
    let delimiter = format!("cachegate_{}", hex::encode(&digest[..6]));
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn single_line_format() {
        assert_eq!(format_output("cache-hit", "true"), "cache-hit=true\n");
    }

    #[test]
    fn multi_line_format_uses_delimiter() {
        let out = format_output("cache-primary-key", "a\nb");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("cache-primary-key<<cachegate_"));
        assert_eq!(lines[1], "a");
        assert_eq!(lines[2], "b");
        assert_eq!(format!("cache-primary-key<<{}", lines[3]), lines[0]);
    }

    #[tokio::test]
    async fn appends_to_output_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("github_output");
        std::fs::write(&path, "earlier=1\n").unwrap();

        let mut outputs = Outputs::new(Some(path.clone()));
        outputs.set_primary_key(&CacheKey::new("v1-deps").unwrap()).await.unwrap();
        outputs.set_cache_hit(true).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "earlier=1\ncache-primary-key=v1-deps\ncache-hit=true\n");
    }

    #[tokio::test]
    async fn get_returns_last_value() {
        let mut outputs = Outputs::capture();
        outputs.set_cache_hit(false).await.unwrap();
        outputs.set_cache_hit(true).await.unwrap();

        assert_eq!(outputs.get(names::CACHE_HIT), Some("true"));
        assert!(outputs.get(names::CACHE_MATCHED_KEY).is_none());
        assert_eq!(outputs.emitted().len(), 2);
    }
}
