//! Chunk records on top of the key/value client (keyspace: `{file_name}_{chunk_index}`).

use super::layout::{ChunkLayout, ChunkSpan};
use crate::cadapter::client::KvClient;
use anyhow::Result;

#[derive(Clone)]
pub struct ChunkStore {
    client: KvClient,
    layout: ChunkLayout,
}

impl ChunkStore {
    pub fn new(client: KvClient, layout: ChunkLayout) -> Self {
        Self { client, layout }
    }

    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    pub fn key_for(file_name: &str, chunk_index: u64) -> String {
        format!("{file_name}_{chunk_index}")
    }

    pub async fn get(&self, file_name: &str, chunk_index: u64) -> Result<Option<Vec<u8>>> {
        self.client.get(&Self::key_for(file_name, chunk_index)).await
    }

    pub async fn put(&self, file_name: &str, chunk_index: u64, chunk: &[u8]) -> Result<()> {
        debug_assert!(chunk.len() as u64 <= self.layout.chunk_size);
        self.client
            .put(&Self::key_for(file_name, chunk_index), chunk)
            .await
    }

    pub async fn remove(&self, file_name: &str, chunk_index: u64) -> Result<()> {
        self.client
            .remove(&Self::key_for(file_name, chunk_index))
            .await
    }

    pub async fn nuke(&self) -> Result<()> {
        self.client.nuke().await
    }

    /// Indices of the chunks actually stored for `file_name`, ascending.
    /// Sparse files only pay for the chunks they hold, not for every slot
    /// below their size.
    pub async fn stored_indices(&self, file_name: &str) -> Result<Vec<u64>> {
        let mut indices: Vec<u64> = self
            .client
            .keys()
            .await?
            .iter()
            .filter_map(|key| parse_chunk_key(key, file_name))
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    /// Copy a span of a chunk into `out` (`out.len() == span.len()`).
    /// Missing chunks and bytes past a short chunk's end stay zero.
    pub async fn read_span(&self, file_name: &str, span: &ChunkSpan, out: &mut [u8]) -> Result<()> {
        debug_assert_eq!(out.len(), span.len());
        if let Some(chunk) = self.get(file_name, span.index).await? {
            let copy_end = span.end_in_chunk.min(chunk.len());
            if copy_end > span.start_in_chunk {
                let n = copy_end - span.start_in_chunk;
                out[..n].copy_from_slice(&chunk[span.start_in_chunk..copy_end]);
            }
        }
        Ok(())
    }

    /// Overlay `data` onto the span of a chunk.
    ///
    /// The existing chunk is fetched and zero-extended up to the span end
    /// before overlaying, so no gap inside the chunk is left undefined. A span
    /// that covers the whole chunk skips the fetch.
    pub async fn write_span(&self, file_name: &str, span: &ChunkSpan, data: &[u8]) -> Result<()> {
        debug_assert_eq!(data.len(), span.len());
        if span.covers_chunk(self.layout.chunk_size) {
            return self.put(file_name, span.index, data).await;
        }
        let mut chunk = self.get(file_name, span.index).await?.unwrap_or_default();
        if chunk.len() < span.end_in_chunk {
            chunk.resize(span.end_in_chunk, 0);
        }
        chunk[span.in_chunk()].copy_from_slice(data);
        self.put(file_name, span.index, &chunk).await
    }
}

/// `{file_name}_{index}` with a canonical decimal index, else `None`.
/// Keys of a file named `{file_name}_x` never match since their suffix holds
/// a second `_`.
fn parse_chunk_key(key: &str, file_name: &str) -> Option<u64> {
    let digits = key.strip_prefix(file_name)?.strip_prefix('_')?;
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return None;
    }
    digits.parse().ok()
}
