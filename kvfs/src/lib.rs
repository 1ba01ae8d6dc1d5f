// Library crate for kvfs: chunked virtual files on top of a key/value store.

pub mod cadapter;
pub mod chuck;
pub mod meta;
pub mod vfs;

pub use cadapter::client::{KvBackend, KvClient, KvStorage};
pub use cadapter::registry::BackendRegistry;
pub use chuck::ChunkLayout;
pub use meta::{ContentType, FileRecord, Metadata};
pub use vfs::{BackendConfig, FileData, FileStore, FsConfig, FsError, FsResult};
