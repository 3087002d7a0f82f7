use crate::error::StorageError;
use crate::token::ShortToken;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored mapping between an original URL and its short token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlMapping {
    /// Backend-assigned identifier, monotonic per backend.
    pub id: i64,
    /// Caller-supplied value used to match batch inputs to outputs.
    pub correlation_id: String,
    /// The long URL. Unique per backend.
    pub original_url: String,
    /// The short token the URL is reachable under.
    pub short_url: ShortToken,
    /// When the mapping was first inserted.
    pub created_at: Timestamp,
    /// Soft-delete flag. Stored but never consulted.
    pub deleted: bool,
}

/// A mapping that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrlMapping {
    pub correlation_id: String,
    pub original_url: String,
    /// Candidate token; only used if `original_url` is not stored yet.
    pub short_url: ShortToken,
}

impl NewUrlMapping {
    pub fn new(
        correlation_id: impl Into<String>,
        original_url: impl Into<String>,
        short_url: impl Into<ShortToken>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            original_url: original_url.into(),
            short_url: short_url.into(),
        }
    }

    /// Materializes the mapping with a backend-assigned id and creation time.
    pub fn into_mapping(self, id: i64, created_at: Timestamp) -> UrlMapping {
        UrlMapping {
            id,
            correlation_id: self.correlation_id,
            original_url: self.original_url,
            short_url: self.short_url,
            created_at,
            deleted: false,
        }
    }
}

/// Persistence contract shared by every storage backend.
///
/// `original_url` is the dedup key: adding a URL that is already stored is a
/// no-op that hands back the stored token. Token uniqueness is not
/// guaranteed by this contract.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Stores a mapping unless its `original_url` is already present.
    ///
    /// Returns the stored token, which is the existing one for a known URL
    /// and the candidate token otherwise.
    async fn add_url(&self, mapping: NewUrlMapping) -> Result<ShortToken>;

    /// Stores a sequence of mappings with `add_url` semantics.
    ///
    /// The output has one entry per input, in input order. Each entry holds
    /// the stored mapping with the caller's `correlation_id` for that item.
    async fn add_batch(&self, mappings: Vec<NewUrlMapping>) -> Result<Vec<UrlMapping>>;

    /// Retrieves the mapping for a given short token.
    /// Returns `None` if the token does not exist.
    async fn get_url(&self, token: &ShortToken) -> Result<Option<UrlMapping>>;
}
