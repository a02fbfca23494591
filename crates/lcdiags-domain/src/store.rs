//! Key-value status store.
//!
//! The gateway publishes status documents under keys such as
//! `cgw/SiteStatus`. Views only need `get(key)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{DomainError, Result};

/// Read-only access to status documents.
pub trait StatusStore: Send + Sync {
    /// Raw document for `key`, or `None` when nothing is published.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Store backed by JSON files in a directory.
///
/// The last key segment is converted to snake case: `cgw/SiteStatus` is read
/// from `<dir>/site_status.json`.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the document for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name = key.rsplit('/').next().unwrap_or(key);
        self.dir.join(format!("{}.json", snake_case(name)))
    }
}

impl StatusStore for FileStatusStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, path = %path.display(), "status document not found");
                Ok(None)
            }
            Err(e) => Err(DomainError::Read { path, source: e }),
        }
    }
}

/// In-memory store, for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.write().remove(key)
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_to_file_name() {
        let store = FileStatusStore::new("/data");
        assert_eq!(
            store.path_for("cgw/SiteStatus"),
            PathBuf::from("/data/site_status.json")
        );
        assert_eq!(
            store.path_for("cgw/ChargingStationsStatus"),
            PathBuf::from("/data/charging_stations_status.json")
        );
        assert_eq!(store.path_for("leases"), PathBuf::from("/data/leases.json"));
    }

    #[test]
    fn test_file_store_get() {
        let tmp = TempDir::new().unwrap();
        let store = FileStatusStore::new(tmp.path());
        assert!(store.get("cgw/SiteStatus").unwrap().is_none());

        std::fs::write(tmp.path().join("site_status.json"), b"{}").unwrap();
        assert_eq!(store.get("cgw/SiteStatus").unwrap().unwrap(), b"{}");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStatusStore::new();
        store.set("k", "v");
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"v"[..]));
        store.remove("k");
        assert!(store.get("k").unwrap().is_none());
    }
}
