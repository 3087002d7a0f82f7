use crate::shortener::ReducedUrl;
use thiserror::Error;

/// Failures of the underlying storage medium (disk, database connection).
///
/// An unknown short token is never a `StorageError`; lookups report absence
/// as `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
    #[error("storage serialization failed: {0}")]
    Serialization(String),
    #[error("storage initialization failed: {0}")]
    Initialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Errors returned by the reduction engine.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// Reducing a single URL failed in the backend.
    #[error("can't add short url to storage: {0}")]
    Reduction(#[source] StorageError),
    /// The first chunk of a batch failed, nothing was shortened.
    #[error("failed to create short urls for the whole batch: {source}")]
    NoBatchShorten {
        #[source]
        source: StorageError,
    },
    /// A later chunk of a batch failed. `shortened` holds every item of the
    /// chunks that were committed before the failure, in input order.
    #[error("failed to create short urls for part of the batch ({} shortened): {source}", shortened.len())]
    SomeBatchShortenFailed {
        shortened: Vec<ReducedUrl>,
        #[source]
        source: StorageError,
    },
    /// A strict lookup hit a backend failure.
    #[error("can't look up short url: {0}")]
    Lookup(#[source] StorageError),
}

impl ShortenerError {
    /// Returns the partially shortened batch, if any chunk succeeded.
    pub fn partial_result(&self) -> Option<&[ReducedUrl]> {
        match self {
            ShortenerError::SomeBatchShortenFailed { shortened, .. } => Some(shortened),
            _ => None,
        }
    }
}
