use crate::index::{correlate, MappingIndex};
use async_trait::async_trait;
use shorturl_core::repository::Result;
use shorturl_core::{NewUrlMapping, Repository, ShortToken, UrlMapping};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory implementation of the Repository trait.
///
/// A single reader/writer lock guards the whole mapping set. Lookups by
/// token share the read lock; inserts hold the write lock across the
/// existence check and the insert.
#[derive(Debug)]
pub struct InMemoryRepository {
    index: RwLock<MappingIndex>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(MappingIndex::new()),
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: RwLock::new(MappingIndex::with_capacity(capacity)),
        }
    }

    /// Number of stored mappings.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn add_url(&self, mapping: NewUrlMapping) -> Result<ShortToken> {
        let mut index = self.index.write().await;

        if let Some(existing) = index.get_by_url(&mapping.original_url) {
            debug!(original_url = %existing.original_url, short_url = %existing.short_url, "url already stored");
            return Ok(existing.short_url.clone());
        }

        let stored = index.prepare(mapping)?;
        let token = stored.short_url.clone();
        index.put(stored)?;

        Ok(token)
    }

    async fn add_batch(&self, mappings: Vec<NewUrlMapping>) -> Result<Vec<UrlMapping>> {
        let mut index = self.index.write().await;
        let mut stored = Vec::with_capacity(mappings.len());

        for mapping in mappings {
            if let Some(existing) = index.get_by_url(&mapping.original_url) {
                stored.push(correlate(existing, mapping.correlation_id));
                continue;
            }

            let created = index.prepare(mapping)?;
            stored.push(created.clone());
            index.put(created)?;
        }

        Ok(stored)
    }

    async fn get_url(&self, token: &ShortToken) -> Result<Option<UrlMapping>> {
        Ok(self.index.read().await.find_by_token(token).cloned())
    }
}
