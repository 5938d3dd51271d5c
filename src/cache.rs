//! Narrow key-value persistence for watermarks, snapshots, and transcripts.
//!
//! Modeled as an injected capability rather than ambient filesystem access
//! so any durable store can back it. The default implementation keeps one
//! file per key under a root directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::WatchError;

/// Cache key for the home-timeline snapshot (JSON array of mapped posts).
/// The snapshot is reused until this key is removed externally.
pub const HOME_TIMELINE_KEY: &str = "home_timeline.json";

/// Cache key holding the last-check watermark for a watched username.
pub fn watermark_key(username: &str) -> String {
    format!("last_{}.txt", username.to_lowercase())
}

/// Cache key for the debug transcript of a processed post.
pub fn transcript_key(post_id: &str) -> String {
    format!("generation_{}.txt", post_id)
}

/// Durable key-value persistence contract.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, WatchError>;
    fn put(&self, key: &str, value: &str) -> Result<(), WatchError>;
    fn remove(&self, key: &str) -> Result<(), WatchError>;
}

/// Filesystem-backed cache store: one file per key under a root directory.
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform cache directory for this application.
    pub fn default_root() -> Result<PathBuf, WatchError> {
        let dirs = directories::ProjectDirs::from("", "feedwatch", "feedwatch").ok_or_else(
            || WatchError::ConfigError("could not determine platform cache directory".to_string()),
        )?;
        Ok(dirs.cache_dir().to_path_buf())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys map to file names directly; path separators are flattened so a
    /// key can never escape the root.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.root.join(safe)
    }
}

impl CacheStore for FsCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, WatchError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), WatchError> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), WatchError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn get_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::new(dir.path());
        assert_eq!(store.get("absent").unwrap(), None);
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::new(dir.path().join("nested"));
        store.put("last_alice.txt", "2024-05-01T12:00:00+00:00").unwrap();
        assert_eq!(
            store.get("last_alice.txt").unwrap().as_deref(),
            Some("2024-05-01T12:00:00+00:00")
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::new(dir.path());
        store.put("k", "v").unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn keys_cannot_escape_the_root() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::new(dir.path().join("cache"));
        store.put("../escape", "v").unwrap();
        assert!(!dir.path().join("escape").exists());
        assert_eq!(store.get("../escape").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn watermark_key_is_lowercased() {
        assert_eq!(watermark_key("Alice"), "last_alice.txt");
    }
}
