//! Key/value client wrapping backend get/put/keys/remove operations.

use crate::cadapter::localfs::LocalFsBackend;
use crate::cadapter::memory::InMemoryBackend;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Namespace holding one record per file.
pub const CATALOG_NAMESPACE: &str = "files";
/// Namespace holding one record per `(file, chunk_index)`.
pub const CHUNK_NAMESPACE: &str = "file_data";

/// A single key/value namespace.
///
/// Implementations must treat a missing key as `Ok(None)` / `Ok(())` rather
/// than an error; only genuine backend failures are reported as `Err`.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    async fn keys(&self) -> Result<Vec<String>>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn remove(&self, key: &str) -> Result<()>;

    /// Delete every record in the namespace.
    async fn nuke(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct KvClient {
    namespace: Arc<str>,
    backend: Arc<dyn KvBackend>,
}

impl KvClient {
    pub fn new(namespace: &str, backend: Arc<dyn KvBackend>) -> Self {
        Self {
            namespace: Arc::from(namespace),
            backend,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(key).await
    }

    pub async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        tracing::trace!(namespace = %self.namespace, key, len = value.len(), "put");
        self.backend.put(key, value).await
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.backend.keys().await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        tracing::trace!(namespace = %self.namespace, key, "remove");
        self.backend.remove(key).await
    }

    pub async fn nuke(&self) -> Result<()> {
        tracing::debug!(namespace = %self.namespace, "nuke");
        self.backend.nuke().await
    }
}

/// The two independent namespaces a file store needs.
#[derive(Clone)]
pub struct KvStorage {
    pub catalog: KvClient,
    pub chunks: KvClient,
}

impl KvStorage {
    pub fn new(catalog: Arc<dyn KvBackend>, chunks: Arc<dyn KvBackend>) -> Self {
        Self {
            catalog: KvClient::new(CATALOG_NAMESPACE, catalog),
            chunks: KvClient::new(CHUNK_NAMESPACE, chunks),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryBackend::new()),
            Arc::new(InMemoryBackend::new()),
        )
    }

    /// Lay both namespaces out as sibling directories under `root`.
    pub fn local_fs<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self::new(
            Arc::new(LocalFsBackend::new(root.join(CATALOG_NAMESPACE))),
            Arc::new(LocalFsBackend::new(root.join(CHUNK_NAMESPACE))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let storage = KvStorage::in_memory();
        storage.catalog.put("a", b"catalog").await.unwrap();
        storage.chunks.put("a", b"chunk").await.unwrap();

        assert_eq!(
            storage.catalog.get("a").await.unwrap().as_deref(),
            Some(&b"catalog"[..])
        );
        storage.chunks.nuke().await.unwrap();
        assert!(!storage.chunks.exists("a").await.unwrap());
        assert!(storage.catalog.exists("a").await.unwrap());
        assert_eq!(storage.catalog.namespace(), CATALOG_NAMESPACE);
    }
}
