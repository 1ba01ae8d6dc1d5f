//! Local directory backend (implements `KvBackend`).
//!
//! Every key becomes one file directly under `root`. File names are the
//! hex-encoded key so arbitrary file names (slashes included) stay flat and
//! `keys()` can decode them back.

use crate::cadapter::client::KvBackend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

#[derive(Clone)]
pub struct LocalFsBackend {
    root: PathBuf,
}

impl LocalFsBackend {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(key))
    }
}

#[async_trait]
impl KvBackend for LocalFsBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(buf) => Ok(Some(buf)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    #[tracing::instrument(level = "trace", skip(self, value), fields(len = value.len()))]
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        let mut f = fs::File::create(&path)
            .await
            .with_context(|| format!("create {}", path.display()))?;
        f.write_all(value).await?;
        f.flush().await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(encoded) = file_name.to_str() else {
                continue;
            };
            // Foreign files dropped into the directory are not keys.
            match hex::decode(encoded).ok().and_then(|raw| String::from_utf8(raw).ok()) {
                Some(key) => out.push(key),
                None => tracing::debug!(file = encoded, "skip non-key file"),
            }
        }
        out.sort();
        Ok(out)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(fs::try_exists(self.path_for(key)).await?)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn nuke(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.root.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_localfs_put_get_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(tmp.path().join("ns"));

        // nothing written yet: the directory does not even exist
        assert!(backend.keys().await.unwrap().is_empty());
        assert!(backend.get("dir/file.txt_0").await.unwrap().is_none());

        backend.put("dir/file.txt_0", b"hello").await.unwrap();
        backend.put("other", b"").await.unwrap();
        assert_eq!(
            backend.get("dir/file.txt_0").await.unwrap(),
            Some(b"hello".to_vec())
        );
        assert_eq!(backend.keys().await.unwrap(), vec!["dir/file.txt_0", "other"]);
        assert!(backend.exists("other").await.unwrap());

        backend.remove("other").await.unwrap();
        backend.remove("other").await.unwrap();
        assert!(!backend.exists("other").await.unwrap());

        backend.nuke().await.unwrap();
        backend.nuke().await.unwrap();
        assert!(backend.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_localfs_ignores_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(tmp.path());
        backend.put("k", b"v").await.unwrap();
        std::fs::write(tmp.path().join("README"), b"not a key").unwrap();

        assert_eq!(backend.keys().await.unwrap(), vec!["k"]);
    }
}
