//! Blob store for downloaded source documents.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Named text blobs with modification times.
pub trait BlobStore: Send + Sync {
    fn get(&self, name: &str) -> Result<String>;

    fn put(&self, name: &str, data: &str) -> Result<()>;

    /// Time the blob was last written, `None` if it does not exist.
    fn modified(&self, name: &str) -> Result<Option<SystemTime>>;

    /// Whether the blob exists and was written less than `max_age` ago.
    fn is_fresh(&self, name: &str, max_age: Duration) -> Result<bool> {
        let Some(modified) = self.modified(name)? else {
            return Ok(false);
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        debug!(name, age_secs = age.as_secs(), "Cached blob age");
        Ok(age < max_age)
    }
}

/// Stores blobs as files under a root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl BlobStore for FileStore {
    fn get(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        debug!(path = %path.display(), "Reading cached blob");
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
    }

    fn put(&self, name: &str, data: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.path(name);
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))
    }

    fn modified(&self, name: &str) -> Result<Option<SystemTime>> {
        let path = self.path(name);
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to inspect {}", path.display())),
        }
    }
}
