//! Binary blob storage for captured images and model bytes
//!
//! Keys are short generated identifiers (`image_<id>`, `model_<id>`,
//! `thumb_<id>`). The directory store keeps one file per key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid blob key: {0:?}")]
    InvalidKey(String),
}

/// Key-value store for binary data
pub trait BlobStore {
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Returns whether the key was present
    fn remove(&mut self, key: &str) -> Result<bool, StoreError>;

    fn contains(&self, key: &str) -> bool;
}

/// In-memory blob store
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), bytes);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.blobs.remove(key).is_some())
    }

    fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

/// Blob store backed by a directory, one file per key
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    dir: PathBuf,
}

impl DirBlobStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

impl BlobStore for DirBlobStore {
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::write(&path, &bytes)?;
        debug!(key, size = bytes.len(), "Stored blob");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Removed blob");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }
}

/// Memory store whose `remove` fails for one key
#[cfg(test)]
pub(crate) struct StickyBlobStore {
    pub inner: MemoryBlobStore,
    pub sticky_key: String,
}

#[cfg(test)]
impl BlobStore for StickyBlobStore {
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.inner.put(key, bytes)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        if key == self.sticky_key {
            return Err(StoreError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )));
        }
        self.inner.remove(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryBlobStore::new();
        store.put("image_a", vec![1, 2, 3]).unwrap();

        assert!(store.contains("image_a"));
        assert_eq!(store.get("image_a").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get("image_b").unwrap(), None);
        assert!(store.remove("image_a").unwrap());
        assert!(!store.remove("image_a").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_dir_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut store = DirBlobStore::open(temp.path().join("images")).unwrap();

        store.put("image_123", b"png".to_vec()).unwrap();
        assert!(store.contains("image_123"));
        assert!(temp.path().join("images/image_123").is_file());

        let reopened = DirBlobStore::open(temp.path().join("images")).unwrap();
        assert_eq!(reopened.get("image_123").unwrap(), Some(b"png".to_vec()));
        assert_eq!(reopened.get("image_missing").unwrap(), None);

        assert!(store.remove("image_123").unwrap());
        assert!(!store.contains("image_123"));
    }

    #[test]
    fn test_dir_store_rejects_path_keys() {
        let temp = TempDir::new().unwrap();
        let mut store = DirBlobStore::open(temp.path()).unwrap();

        assert!(matches!(
            store.put("../escape", vec![0]),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
        assert!(!store.contains("a/b"));
    }
}
