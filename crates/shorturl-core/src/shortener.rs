use crate::error::ShortenerError;
use crate::repository::UrlMapping;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, ShortenerError>;

/// A request to reduce one long URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceRequest {
    #[serde(default)]
    pub correlation_id: String,
    pub original_url: String,
}

impl ReduceRequest {
    pub fn new(correlation_id: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            original_url: original_url.into(),
        }
    }
}

/// One reduced item of a batch, with its fully-qualified short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedUrl {
    pub correlation_id: String,
    pub original_url: String,
    pub short_url: String,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Reduces a URL and returns the fully-qualified short URL.
    ///
    /// Reducing a URL that is already stored returns its existing short URL.
    async fn reduce_url(&self, request: ReduceRequest) -> Result<String>;

    /// Reduces many URLs, preserving input order in the output.
    ///
    /// On partial failure the error is
    /// [`ShortenerError::SomeBatchShortenFailed`] and carries what was
    /// shortened before the failure.
    async fn batch_reduce_url(&self, requests: Vec<ReduceRequest>) -> Result<Vec<ReducedUrl>>;

    /// Resolves a short token to its original URL.
    ///
    /// Returns `None` both when the token is unknown and when the backend
    /// failed; use [`Shortener::lookup`] to tell the two apart.
    async fn get_url(&self, token: &str) -> Option<String>;

    /// Resolves a short token to its stored mapping, surfacing backend errors.
    async fn lookup(&self, token: &str) -> Result<Option<UrlMapping>>;
}
