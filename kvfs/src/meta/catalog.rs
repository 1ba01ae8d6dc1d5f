//! Catalog namespace access: one JSON `FileRecord` per file name.

use super::record::FileRecord;
use crate::cadapter::client::KvClient;
use anyhow::{Context, Result};

#[derive(Clone)]
pub struct FileCatalog {
    client: KvClient,
}

impl FileCatalog {
    pub fn new(client: KvClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, name: &str) -> Result<Option<FileRecord>> {
        let Some(raw) = self.client.get(name).await? else {
            return Ok(None);
        };
        let record: FileRecord = serde_json::from_slice(&raw)
            .with_context(|| format!("corrupt catalog record for {name}"))?;
        Ok(Some(record))
    }

    pub async fn save(&self, record: &FileRecord) -> Result<()> {
        let raw = serde_json::to_vec(record)?;
        self.client.put(&record.key, &raw).await
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.client.keys().await
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.client.exists(name).await
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        self.client.remove(name).await
    }

    pub async fn nuke(&self) -> Result<()> {
        self.client.nuke().await
    }
}
