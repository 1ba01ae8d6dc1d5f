//! File catalog
//!
//! Responsibilities:
//! - Track which files exist and keep one record per file: caller metadata,
//!   recorded size and the content type of the last whole-file save.
//! - Serialize records as JSON into the catalog namespace of the key/value
//!   adapter.
//!
//! Submodules:
//! - `record`: `FileRecord` and `ContentType`
//! - `catalog`: `FileCatalog`, the record store
pub mod catalog;
pub mod record;

pub use catalog::FileCatalog;
pub use record::{ContentType, FileRecord, Metadata};
