//! Chunk layout and chunk storage (chuck)
//!
//! Responsibilities:
//! - Map arbitrary file byte ranges onto fixed-size chunks (`layout`). This
//!   part is pure arithmetic and does no I/O.
//! - Read and write individual chunk records through the key/value adapter
//!   (`store`), zero-filling holes and short chunks.
//!
//! Submodules:
//! - `layout`: `ChunkLayout` and the `ChunkSpan` iterator
//! - `store`: `ChunkStore`, keyed by `(file_name, chunk_index)`
pub mod layout;
pub mod store;

pub use layout::{ChunkLayout, ChunkSpan, DEFAULT_CHUNK_SIZE};
pub use store::ChunkStore;
