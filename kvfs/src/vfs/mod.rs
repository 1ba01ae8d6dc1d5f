//! File store (vfs)
//!
//! Responsibilities:
//! - Expose named, byte-addressable files on top of the catalog (`meta`) and
//!   chunk storage (`chuck`).
//! - Serialize mutations per file through the operation queue while leaving
//!   reads unqueued.
//! - Park calls until an asynchronously opened backend becomes ready.
//!
//! Submodules:
//! - `fs`: `FileStore`, the public file API
//! - `queue`: per-file FIFO `OperationQueue`
//! - `ready`: `ReadyGate` for deferred backend initialisation
//! - `codec`: whole-file payloads and the 16-bit text codec
//! - `config`: YAML configuration
//! - `error`: `FsError`
pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod queue;
pub mod ready;

pub use codec::FileData;
pub use config::{BackendConfig, ConfigError, FsConfig};
pub use error::{FsError, FsResult};
pub use fs::{FileStore, RESET_TOKEN};
pub use queue::{OperationQueue, QueueState, QueuedOp};
