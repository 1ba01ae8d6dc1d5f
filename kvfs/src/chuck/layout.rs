//! Chunk layout and byte-range mapping.
//!
//! - Fixed-size chunk partitioning of a file's byte space.
//! - `ChunkLayout::spans` splits `[start, start + len)` into per-chunk spans,
//!   each carrying the slice of the caller's buffer it maps to.
//! - Pure arithmetic: nothing here touches storage.

use std::ops::Range;

/// Default chunk size (1 KiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub chunk_size: u64,
}

impl Default for ChunkLayout {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkLayout {
    /// Panics if `chunk_size` is zero; configuration is validated before a
    /// layout is built (see `FsConfig::layout`).
    pub fn new(chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self { chunk_size }
    }

    #[inline]
    pub fn chunk_index_of(&self, file_offset: u64) -> u64 {
        file_offset / self.chunk_size
    }

    #[inline]
    pub fn within_chunk_offset(&self, file_offset: u64) -> u64 {
        file_offset % self.chunk_size
    }

    /// Number of chunk slots a file of `size` bytes spans.
    #[inline]
    pub fn chunk_count(&self, size: u64) -> u64 {
        size.div_ceil(self.chunk_size)
    }

    /// Split `[start, start + len)` into chunk-local spans, in file order.
    pub fn spans(&self, start: u64, len: usize) -> ChunkSpanIter {
        ChunkSpanIter {
            layout: *self,
            cursor: start,
            buf_off: 0,
            remaining: len,
        }
    }

    /// Whole-buffer chunking: sequential chunks from index 0, every one full
    /// except possibly the last.
    pub fn whole_chunks(&self, len: usize) -> ChunkSpanIter {
        self.spans(0, len)
    }
}

/// One chunk's share of a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: u64,
    /// Inclusive start inside the chunk.
    pub start_in_chunk: usize,
    /// Exclusive end inside the chunk.
    pub end_in_chunk: usize,
    /// Matching `[buf_start, buf_end)` in the caller's buffer.
    pub buf_start: usize,
    pub buf_end: usize,
}

impl ChunkSpan {
    #[inline]
    pub fn len(&self) -> usize {
        self.end_in_chunk - self.start_in_chunk
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn in_chunk(&self) -> Range<usize> {
        self.start_in_chunk..self.end_in_chunk
    }

    #[inline]
    pub fn in_buf(&self) -> Range<usize> {
        self.buf_start..self.buf_end
    }

    /// True when the span replaces the whole chunk, so the stored content
    /// does not need to be fetched first.
    #[inline]
    pub fn covers_chunk(&self, chunk_size: u64) -> bool {
        self.start_in_chunk == 0 && self.end_in_chunk as u64 == chunk_size
    }
}

pub struct ChunkSpanIter {
    layout: ChunkLayout,
    /// Current absolute file offset
    cursor: u64,
    /// Current offset in the caller's buffer
    buf_off: usize,
    remaining: usize,
}

impl Iterator for ChunkSpanIter {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.layout.chunk_index_of(self.cursor);
        let offset = self.layout.within_chunk_offset(self.cursor) as usize;
        let capacity = (self.layout.chunk_size as usize) - offset;
        let take = self.remaining.min(capacity);

        let span = ChunkSpan {
            index,
            start_in_chunk: offset,
            end_in_chunk: offset + take,
            buf_start: self.buf_off,
            buf_end: self.buf_off + take,
        };
        self.cursor += take as u64;
        self.buf_off += take;
        self.remaining -= take;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.remaining == 0 {
            return (0, Some(0));
        }
        let first = self.layout.within_chunk_offset(self.cursor);
        let n = self.layout.chunk_count(first + self.remaining as u64) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkSpanIter {}
