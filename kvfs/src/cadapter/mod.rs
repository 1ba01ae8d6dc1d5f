//! Key/value storage adapter (cAdapter)
//!
//! Submodules:
//! - `client`: the `KvBackend` trait, the per-namespace `KvClient` and the
//!   `KvStorage` pair (catalog + chunk namespaces) handed to the file store
//! - `memory`: in-process backend used for tests and ephemeral stores
//! - `localfs`: local directory backend, one file per key
//! - `registry`: process-wide registry of opened storages
//!
//! The backend only persists opaque blobs under string keys. Everything about
//! chunk layout and file records lives above this layer.
pub mod client;
pub mod localfs;
pub mod memory;
pub mod registry;
