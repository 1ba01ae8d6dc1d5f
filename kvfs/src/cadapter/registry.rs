//! Process-wide registry of opened storages.
//!
//! A storage is opened at most once per name and shared by every file store
//! that asks for it. The registry is an ordinary value: create one at startup,
//! hand an `Arc` of it to whoever opens stores, and call `shutdown` before the
//! process exits so backends are dropped in an orderly fashion.

use crate::cadapter::client::KvStorage;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Default)]
pub struct BackendRegistry {
    opened: Mutex<HashMap<String, KvStorage>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the storage registered under `name`, running `opener` only if
    /// nothing is registered yet. Concurrent callers for the same name wait
    /// for the first opener instead of racing it.
    pub async fn open<F, Fut>(&self, name: &str, opener: F) -> Result<KvStorage>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<KvStorage>>,
    {
        let mut opened = self.opened.lock().await;
        if let Some(storage) = opened.get(name) {
            debug!(name, "reuse opened storage");
            return Ok(storage.clone());
        }
        let storage = opener().await?;
        info!(name, "storage opened");
        opened.insert(name.to_string(), storage.clone());
        Ok(storage)
    }

    pub async fn is_open(&self, name: &str) -> bool {
        self.opened.lock().await.contains_key(name)
    }

    /// Forget a storage. Stores still holding a clone keep working; the next
    /// `open` runs the opener again.
    pub async fn close(&self, name: &str) -> bool {
        let closed = self.opened.lock().await.remove(name).is_some();
        if closed {
            info!(name, "storage closed");
        }
        closed
    }

    pub async fn shutdown(&self) {
        let mut opened = self.opened.lock().await;
        info!(count = opened.len(), "closing all storages");
        opened.clear();
    }
}
