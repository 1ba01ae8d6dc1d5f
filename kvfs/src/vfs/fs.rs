//! Byte-addressable files over the catalog and chunk namespaces.
//!
//! Mutations (`set_bytes`, `append_bytes`, `save_file`) go through the
//! per-file [`OperationQueue`]; they are registered when called and the
//! returned [`QueuedOp`] only yields the outcome. Everything else runs
//! directly and may observe a file between two queued writes.

use super::codec::{FileData, decode_text};
use super::config::FsConfig;
use super::error::{FsError, FsResult};
use super::queue::{OperationQueue, QueuedOp};
use super::ready::ReadyGate;
use crate::cadapter::client::KvStorage;
use crate::cadapter::registry::BackendRegistry;
use crate::chuck::{ChunkLayout, ChunkStore};
use crate::meta::{ContentType, FileCatalog, FileRecord, Metadata};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Token `reset_all` requires before it wipes anything.
pub const RESET_TOKEN: &str = "yesplx";

#[derive(Clone)]
struct Storage {
    catalog: FileCatalog,
    chunks: ChunkStore,
}

impl Storage {
    fn open(storage: KvStorage, layout: ChunkLayout) -> Self {
        Self {
            catalog: FileCatalog::new(storage.catalog),
            chunks: ChunkStore::new(storage.chunks, layout),
        }
    }
}

struct Inner {
    layout: ChunkLayout,
    storage: ReadyGate<Storage>,
}

#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
    queue: OperationQueue,
}

fn check_name(name: &str) -> FsResult<()> {
    if name.is_empty() {
        return Err(FsError::InvalidArgument(
            "file name must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl FileStore {
    pub fn new(layout: ChunkLayout, storage: KvStorage) -> Self {
        Self::with_gate(layout, ReadyGate::ready(Storage::open(storage, layout)))
    }

    /// Build a store whose backend is still being opened. Calls made before
    /// `init` resolves wait for it; if it fails they report the failure.
    pub fn deferred<F>(layout: ChunkLayout, init: F) -> Self
    where
        F: Future<Output = anyhow::Result<KvStorage>> + Send + 'static,
    {
        let gate = ReadyGate::spawn(async move {
            let storage = init.await?;
            Ok(Storage::open(storage, layout))
        });
        Self::with_gate(layout, gate)
    }

    /// Open (or reuse) the configured backend through `registry`.
    pub async fn with_registry(config: &FsConfig, registry: &BackendRegistry) -> FsResult<Self> {
        let layout = config
            .layout()
            .map_err(|e| FsError::InvalidArgument(e.to_string()))?;
        let backend = &config.backend;
        let storage = registry
            .open(&backend.registry_key(), || backend.connect())
            .await?;
        Ok(Self::new(layout, storage))
    }

    fn with_gate(layout: ChunkLayout, storage: ReadyGate<Storage>) -> Self {
        Self {
            inner: Arc::new(Inner { layout, storage }),
            queue: OperationQueue::new(),
        }
    }

    pub fn layout(&self) -> ChunkLayout {
        self.inner.layout
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn is_ready(&self) -> bool {
        self.inner.storage.is_ready()
    }

    pub async fn list_files(&self) -> FsResult<Vec<String>> {
        let storage = self.inner.storage().await?;
        Ok(storage.catalog.keys().await?)
    }

    pub async fn file_exists(&self, name: &str) -> FsResult<bool> {
        let storage = self.inner.storage().await?;
        Ok(storage.catalog.exists(name).await?)
    }

    /// Create the record, or replace the metadata of an existing one.
    /// Chunk data, size and content type are left alone.
    pub async fn create_file(&self, name: &str, metadata: Option<Metadata>) -> FsResult<()> {
        check_name(name)?;
        self.inner
            .put_metadata(name, metadata.unwrap_or_default(), true)
            .await
    }

    /// Replace the metadata of an existing file.
    pub async fn set_file_metadata(&self, name: &str, metadata: Metadata) -> FsResult<()> {
        check_name(name)?;
        self.inner.put_metadata(name, metadata, false).await
    }

    pub async fn get_file_metadata(&self, name: &str) -> FsResult<FileRecord> {
        self.inner.record(name).await
    }

    /// Remove a file and its chunks. Deleting a missing file succeeds.
    pub async fn delete_file(&self, name: &str) -> FsResult<()> {
        self.inner.delete(name).await
    }

    /// Wipe both namespaces, but only when `token` is [`RESET_TOKEN`].
    pub async fn reset_all(&self, token: &str) -> FsResult<()> {
        if token != RESET_TOKEN {
            warn!("reset_all called without the confirmation token; nothing removed");
            return Ok(());
        }
        let storage = self.inner.storage().await?;
        storage.catalog.nuke().await?;
        storage.chunks.nuke().await?;
        info!("all files removed");
        Ok(())
    }

    pub fn save_file(&self, name: &str, data: impl Into<FileData>) -> QueuedOp<()> {
        let inner = Arc::clone(&self.inner);
        let owned = name.to_string();
        let data = data.into();
        self.queue
            .enqueue(name, async move { inner.save(&owned, data).await })
    }

    pub async fn load_file(&self, name: &str) -> FsResult<FileData> {
        self.inner.load(name).await
    }

    /// Bytes `[start, end)`, with `end` clamped to the file size.
    pub async fn get_bytes(&self, name: &str, start: u64, end: u64) -> FsResult<Vec<u8>> {
        self.inner.get_bytes(name, start, end).await
    }

    pub fn set_bytes(&self, name: &str, data: impl Into<Vec<u8>>, start: u64) -> QueuedOp<()> {
        let inner = Arc::clone(&self.inner);
        let owned = name.to_string();
        let data = data.into();
        self.queue.enqueue(name, async move {
            let storage = inner.storage().await?;
            inner.set_bytes(&storage, &owned, &data, start).await
        })
    }

    /// Write at the file's size as seen when the job runs, not when queued.
    pub fn append_bytes(&self, name: &str, data: impl Into<Vec<u8>>) -> QueuedOp<()> {
        let inner = Arc::clone(&self.inner);
        let owned = name.to_string();
        let data = data.into();
        self.queue.enqueue(name, async move {
            let storage = inner.storage().await?;
            let start = inner
                .max_size(&storage, &owned)
                .await?
                .unwrap_or_default();
            inner.set_bytes(&storage, &owned, &data, start).await
        })
    }

    pub async fn get_max_size(&self, name: &str) -> FsResult<Option<u64>> {
        let storage = self.inner.storage().await?;
        self.inner.max_size(&storage, name).await
    }

    /// Number of chunk slots the file's size spans.
    pub async fn chunk_count(&self, name: &str) -> FsResult<u64> {
        let record = self.inner.record(name).await?;
        Ok(self.inner.layout.chunk_count(record.size.unwrap_or(0)))
    }
}

impl Inner {
    async fn storage(&self) -> FsResult<Storage> {
        Ok(self.storage.get().await?)
    }

    async fn record(&self, name: &str) -> FsResult<FileRecord> {
        let storage = self.storage().await?;
        storage
            .catalog
            .get(name)
            .await?
            .ok_or_else(|| FsError::not_found(name))
    }

    async fn put_metadata(&self, name: &str, data: Metadata, create: bool) -> FsResult<()> {
        let storage = self.storage().await?;
        let record = match storage.catalog.get(name).await? {
            Some(mut record) => {
                record.data = data;
                record
            }
            None if create => FileRecord::new(name).with_data(data),
            None => return Err(FsError::not_found(name)),
        };
        storage.catalog.save(&record).await?;
        debug!(name, "metadata saved");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, name: &str) -> FsResult<()> {
        let storage = self.storage().await?;
        let Some(record) = storage.catalog.get(name).await? else {
            debug!("nothing to delete");
            return Ok(());
        };
        let stored = storage.chunks.stored_indices(name).await?;
        for &index in &stored {
            storage.chunks.remove(name, index).await?;
        }
        storage.catalog.remove(name).await?;
        info!(chunks = stored.len(), size = ?record.size, "file deleted");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, data), fields(content_type = %data.content_type()))]
    async fn save(&self, name: &str, data: FileData) -> FsResult<()> {
        check_name(name)?;
        let storage = self.storage().await?;
        let content_type = data.content_type();
        let bytes = data.into_bytes();
        let len = bytes.len() as u64;

        let mut record = storage
            .catalog
            .get(name)
            .await?
            .unwrap_or_else(|| FileRecord::new(name));

        for span in self.layout.whole_chunks(bytes.len()) {
            storage
                .chunks
                .put(name, span.index, &bytes[span.in_buf()])
                .await?;
        }

        let new_chunks = self.layout.chunk_count(len);
        if self.layout.chunk_count(record.size.unwrap_or(0)) > new_chunks {
            for index in storage.chunks.stored_indices(name).await? {
                if index >= new_chunks {
                    storage.chunks.remove(name, index).await?;
                }
            }
        }

        record.set_content_type(content_type);
        record.size = Some(len);
        storage.catalog.save(&record).await?;
        debug!(len, "file saved");
        Ok(())
    }

    async fn load(&self, name: &str) -> FsResult<FileData> {
        let storage = self.storage().await?;
        let record = storage
            .catalog
            .get(name)
            .await?
            .ok_or_else(|| FsError::not_found(name))?;
        let unknown = || FsError::UnknownEncoding {
            name: name.to_string(),
        };
        let content_type: ContentType = record
            .content_type
            .as_deref()
            .ok_or_else(unknown)?
            .parse()
            .map_err(|_| unknown())?;

        let size = record.size.unwrap_or(0);
        let len = usize::try_from(size)
            .map_err(|_| FsError::InvalidArgument(format!("file {name} too large to load")))?;
        let bytes = self.read_range(&storage, name, 0, len).await?;

        match content_type {
            ContentType::Binary => Ok(FileData::Binary(bytes)),
            ContentType::Text => decode_text(&bytes)
                .map(FileData::Text)
                .map_err(|reason| FsError::Corrupt {
                    name: name.to_string(),
                    reason,
                }),
        }
    }

    async fn get_bytes(&self, name: &str, start: u64, end: u64) -> FsResult<Vec<u8>> {
        let storage = self.storage().await?;
        let size = self
            .max_size(&storage, name)
            .await?
            .ok_or_else(|| FsError::not_found(name))?;
        let end = end.min(size);
        if end <= start {
            return Ok(Vec::new());
        }
        let len = usize::try_from(end - start)
            .map_err(|_| FsError::InvalidArgument(format!("range {start}..{end} too large")))?;
        self.read_range(&storage, name, start, len).await
    }

    async fn read_range(
        &self,
        storage: &Storage,
        name: &str,
        start: u64,
        len: usize,
    ) -> FsResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        for span in self.layout.spans(start, len) {
            storage
                .chunks
                .read_span(name, &span, &mut buf[span.in_buf()])
                .await?;
        }
        Ok(buf)
    }

    /// A failing chunk write aborts the loop; earlier chunks stay written and
    /// the size is not advanced.
    #[tracing::instrument(level = "debug", skip(self, storage, data), fields(len = data.len()))]
    async fn set_bytes(
        &self,
        storage: &Storage,
        name: &str,
        data: &[u8],
        start: u64,
    ) -> FsResult<()> {
        check_name(name)?;
        let end = start.checked_add(data.len() as u64).ok_or_else(|| {
            FsError::InvalidArgument(format!("write at {start} overflows the file size"))
        })?;
        for span in self.layout.spans(start, data.len()) {
            storage
                .chunks
                .write_span(name, &span, &data[span.in_buf()])
                .await?;
        }
        self.set_max_size(storage, name, end).await
    }

    async fn set_max_size(&self, storage: &Storage, name: &str, candidate: u64) -> FsResult<()> {
        let mut record = storage
            .catalog
            .get(name)
            .await?
            .unwrap_or_else(|| FileRecord::new(name));
        if record.grow_size(candidate) {
            storage.catalog.save(&record).await?;
        }
        Ok(())
    }

    async fn max_size(&self, storage: &Storage, name: &str) -> FsResult<Option<u64>> {
        Ok(storage.catalog.get(name).await?.and_then(|r| r.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn store(chunk_size: u64) -> FileStore {
        FileStore::new(ChunkLayout::new(chunk_size), KvStorage::in_memory())
    }

    #[tokio::test]
    async fn test_create_keeps_size_and_type() {
        let fs = store(4);
        fs.save_file("f", "abc").await.unwrap();

        let mut meta = Metadata::new();
        meta.insert("tag".into(), json!(1));
        fs.create_file("f", Some(meta.clone())).await.unwrap();

        let record = fs.get_file_metadata("f").await.unwrap();
        assert_eq!(record.data, meta);
        assert_eq!(record.size, Some(6));
        assert_eq!(record.content_type.as_deref(), Some("string"));
        assert_eq!(fs.load_file("f").await.unwrap(), FileData::from("abc"));
    }

    #[tokio::test]
    async fn test_set_file_metadata_requires_file() {
        let fs = store(4);
        let err = fs.set_file_metadata("nope", Metadata::new()).await.unwrap_err();
        assert!(err.is_not_found());

        fs.create_file("f", None).await.unwrap();
        let mut meta = Metadata::new();
        meta.insert("k".into(), json!("v"));
        fs.set_file_metadata("f", meta.clone()).await.unwrap();
        assert_eq!(fs.get_file_metadata("f").await.unwrap().data, meta);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let fs = store(4);
        assert!(matches!(
            fs.create_file("", None).await,
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.set_bytes("", vec![1u8], 0).await,
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_load_without_content_type() {
        let fs = store(4);
        fs.set_bytes("raw", vec![1u8, 2, 3], 0).await.unwrap();
        assert!(matches!(
            fs.load_file("raw").await,
            Err(FsError::UnknownEncoding { .. })
        ));
        assert!(fs.load_file("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_bytes_clamps_and_requires_size() {
        let fs = store(3);
        assert!(fs.get_bytes("f", 0, 4).await.unwrap_err().is_not_found());

        fs.set_bytes("f", b"hello".to_vec(), 0).await.unwrap();
        assert_eq!(fs.get_bytes("f", 1, 100).await.unwrap(), b"ello");
        assert!(fs.get_bytes("f", 4, 2).await.unwrap().is_empty());
        assert!(fs.get_bytes("f", 9, 12).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_shrinks_and_drops_stale_chunks() {
        let fs = store(4);
        fs.save_file("f", vec![9u8; 10]).await.unwrap();
        assert_eq!(fs.chunk_count("f").await.unwrap(), 3);

        fs.save_file("f", vec![1u8; 5]).await.unwrap();
        assert_eq!(fs.get_max_size("f").await.unwrap(), Some(5));
        assert_eq!(fs.chunk_count("f").await.unwrap(), 2);
        assert_eq!(fs.load_file("f").await.unwrap(), FileData::Binary(vec![1; 5]));

        let storage = fs.inner.storage().await.unwrap();
        assert!(storage.chunks.get("f", 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_chunks() {
        let fs = store(2);
        fs.set_bytes("f", vec![5u8; 7], 0).await.unwrap();
        fs.delete_file("f").await.unwrap();

        assert!(!fs.file_exists("f").await.unwrap());
        let storage = fs.inner.storage().await.unwrap();
        for index in 0..4 {
            assert!(storage.chunks.get("f", index).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_sparse_delete_touches_only_stored_chunks() {
        let fs = store(1);
        let far = 1u64 << 40;
        fs.set_bytes("f", vec![1u8], far).await.unwrap();
        fs.set_bytes("f_1", vec![2u8], 0).await.unwrap();

        // walking every slot below the size would never finish
        tokio::time::timeout(Duration::from_secs(5), fs.delete_file("f"))
            .await
            .expect("delete of a sparse file must not scan empty slots")
            .unwrap();

        let storage = fs.inner.storage().await.unwrap();
        assert!(storage.chunks.get("f", far).await.unwrap().is_none());
        assert_eq!(storage.chunks.get("f_1", 0).await.unwrap(), Some(vec![2]));
        assert_eq!(fs.get_bytes("f_1", 0, 1).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_save_over_sparse_file_drops_far_chunk() {
        let fs = store(1);
        let far = 1u64 << 40;
        fs.set_bytes("f", vec![1u8], far).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), fs.save_file("f", vec![7u8, 8]))
            .await
            .expect("save over a sparse file must not scan empty slots")
            .unwrap();

        assert_eq!(fs.get_max_size("f").await.unwrap(), Some(2));
        let storage = fs.inner.storage().await.unwrap();
        assert!(storage.chunks.get("f", far).await.unwrap().is_none());
        assert_eq!(storage.chunks.stored_indices("f").await.unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_reset_wipes_chunks_only_with_token() {
        let fs = store(2);
        fs.save_file("keep", vec![1u8, 2, 3]).await.unwrap();
        let storage = fs.inner.storage().await.unwrap();

        fs.reset_all("nope").await.unwrap();
        assert_eq!(storage.chunks.get("keep", 0).await.unwrap(), Some(vec![1, 2]));
        assert_eq!(storage.chunks.get("keep", 1).await.unwrap(), Some(vec![3]));

        fs.reset_all(RESET_TOKEN).await.unwrap();
        assert!(storage.chunks.get("keep", 0).await.unwrap().is_none());
        assert!(storage.chunks.get("keep", 1).await.unwrap().is_none());
        assert!(storage.catalog.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_text_payload() {
        let fs = store(4);
        fs.save_file("t", "ab").await.unwrap();
        // odd-length overwrite leaves an undecodable text payload
        fs.set_bytes("t", vec![0x41u8], 4).await.unwrap();
        assert!(matches!(
            fs.load_file("t").await,
            Err(FsError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_with_registry_shares_storage() {
        let registry = BackendRegistry::new();
        let config = FsConfig::default();

        let a = FileStore::with_registry(&config, &registry).await.unwrap();
        let b = FileStore::with_registry(&config, &registry).await.unwrap();
        a.set_bytes("shared", b"x".to_vec(), 0).await.unwrap();
        assert!(b.file_exists("shared").await.unwrap());
    }

    #[tokio::test]
    async fn test_deferred_failure_is_backend_error() {
        let fs = FileStore::deferred(ChunkLayout::default(), async {
            Err(anyhow::anyhow!("cannot open"))
        });
        assert!(matches!(fs.list_files().await, Err(FsError::Backend(_))));
        assert!(matches!(
            fs.set_bytes("f", vec![1u8], 0).await,
            Err(FsError::Backend(_))
        ));
    }
}
