use crate::app::ports::ObjectStore;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A local directory laid out like a bucket: key `a/b.json` lives at `<root>/a/b.json`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(PipelineError::storage(key, "key must be a relative path"));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| PipelineError::storage(prefix, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        debug!(prefix, count = keys.len(), "Listed keys");
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PipelineError::storage(key, e)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.key_path(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| PipelineError::storage(key, "key has no parent directory"))?;
        fs::create_dir_all(parent).map_err(|e| PipelineError::storage(key, e))?;

        // Write next to the target and rename, so readers never see a partial object
        let mut tmp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| PipelineError::storage(key, e))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PipelineError::storage(key, e))?;
        tmp.persist(&path)
            .map_err(|e| PipelineError::storage(key, e.error))?;

        debug!(key, bytes = bytes.len(), "Wrote object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_and_list() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());

        store.put("data/b.json", b"{}".to_vec()).await.unwrap();
        store.put("data/a.json", b"[]".to_vec()).await.unwrap();
        store.put("internal/x.json", b"1".to_vec()).await.unwrap();

        assert_eq!(
            store.list("data/").await.unwrap(),
            vec!["data/a.json".to_string(), "data/b.json".to_string()]
        );
        assert_eq!(store.get("data/a.json").await.unwrap(), Some(b"[]".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_key_and_missing_root_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path().join("nope"));
        assert!(store.list("data/").await.unwrap().is_empty());
        assert_eq!(store.get("data/a.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_whole_object() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.put("k.json", b"first version".to_vec()).await.unwrap();
        store.put("k.json", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("k.json").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.put("/abs.json", Vec::new()).await.is_err());
    }
}
