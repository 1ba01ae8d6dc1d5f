//! Error surface of the file store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    /// The file (or, for size-dependent reads, its recorded size) is missing.
    #[error("not found: {name}")]
    NotFound { name: String },

    /// Whole-file load of a file that was never saved whole.
    #[error("no content type recorded for {name}")]
    UnknownEncoding { name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupt payload in {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// A queued operation was dropped before delivering its result.
    #[error("operation queue closed before the operation completed")]
    QueueClosed,

    /// Failure reported by the key/value backend, passed through unchanged.
    #[error("{0}")]
    Backend(#[from] anyhow::Error),
}

impl FsError {
    pub(crate) fn not_found(name: &str) -> Self {
        FsError::NotFound {
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

pub type FsResult<T> = Result<T, FsError>;
