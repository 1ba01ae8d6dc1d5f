//! In-memory backend for local development and tests.

use crate::cadapter::client::KvBackend;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryBackend {
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.map.write().await.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.map.read().await.keys().cloned().collect())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.map.read().await.contains_key(key))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.map.write().await.remove(key);
        Ok(())
    }

    async fn nuke(&self) -> Result<()> {
        self.map.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let backend = InMemoryBackend::new();
        assert!(backend.get("k").await.unwrap().is_none());

        backend.put("k", &[1, 2, 3]).await.unwrap();
        backend.put("j", &[4]).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(backend.keys().await.unwrap(), vec!["j", "k"]);

        backend.remove("k").await.unwrap();
        // removing twice is fine
        backend.remove("k").await.unwrap();
        assert!(!backend.exists("k").await.unwrap());

        backend.nuke().await.unwrap();
        assert!(backend.keys().await.unwrap().is_empty());
    }
}
