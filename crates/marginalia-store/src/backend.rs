//! Key-value backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use marginalia_core::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Storage backend trait for the host's key-value store.
///
/// Allows abstracting over browser storage, files, or anything else that
/// can get, set, and delete a blob by key.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value at `key`, `None` if unset.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `data` at `key`, replacing any previous value.
    async fn set(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Delete the value at `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-process backend for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Filesystem backend: one JSON file per key under a base directory.
///
/// Path format: `{base_path}/{sanitized-key}.json`
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File holding `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.json", name))
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full_path = self.path_for(key);
        if !fs::try_exists(&full_path).await? {
            return Ok(None);
        }
        Ok(Some(fs::read(full_path).await?))
    }

    async fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.path_for(key);
        debug!(store_key = %key, full_path = %full_path.display(), size = data.len(), "file_backend: set");

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            warn!(base_path = %self.base_path.display(), error = %e, "file_backend: create_dir_all failed");
            e
        })?;

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_backend: File::create failed");
            e
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_backend: rename failed");
            e
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.path_for(key);
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("k").await.unwrap(), None);
        backend.set("k", b"value").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"value".to_vec()));
        backend.delete("k").await.unwrap();
        backend.delete("k").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[test]
    fn test_path_for_sanitizes_key() {
        let backend = FilesystemBackend::new("/tmp/store");
        assert_eq!(
            backend.path_for("marginalia.highlights"),
            PathBuf::from("/tmp/store/marginalia.highlights.json")
        );
        assert_eq!(
            backend.path_for("../etc/passwd"),
            PathBuf::from("/tmp/store/.._etc_passwd.json")
        );
    }
}
