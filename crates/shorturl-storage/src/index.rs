use jiff::Timestamp;
use shorturl_core::repository::Result;
use shorturl_core::{NewUrlMapping, ShortToken, StorageError, UrlMapping};
use std::collections::HashMap;

/// Mapping set keyed by `original_url`, shared by the in-memory and file
/// backends. Callers provide the locking.
#[derive(Debug)]
pub(crate) struct MappingIndex {
    by_url: HashMap<String, UrlMapping>,
    next_id: i64,
}

impl MappingIndex {
    pub(crate) fn new() -> Self {
        Self {
            by_url: HashMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            by_url: HashMap::with_capacity(capacity),
            next_id: 1,
        }
    }

    pub(crate) fn get_by_url(&self, original_url: &str) -> Option<&UrlMapping> {
        self.by_url.get(original_url)
    }

    /// Linear scan over every mapping.
    pub(crate) fn find_by_token(&self, token: &ShortToken) -> Option<&UrlMapping> {
        self.by_url.values().find(|m| &m.short_url == token)
    }

    /// Builds the mapping a new URL would be stored as, without storing it.
    pub(crate) fn prepare(&self, mapping: NewUrlMapping) -> Result<UrlMapping> {
        if self.next_id == i64::MAX {
            return Err(StorageError::InvalidData("url id space exhausted".to_string()));
        }
        Ok(mapping.into_mapping(self.next_id, Timestamp::now()))
    }

    /// Stores a mapping, replacing any previous one for the same URL, and
    /// keeps the id counter ahead of every id seen. Nothing is stored when
    /// the id leaves no room for a successor.
    pub(crate) fn put(&mut self, mapping: UrlMapping) -> Result<()> {
        let after = mapping.id.checked_add(1).ok_or_else(|| {
            StorageError::InvalidData(format!("url id {} is out of range", mapping.id))
        })?;
        self.next_id = self.next_id.max(after);
        self.by_url.insert(mapping.original_url.clone(), mapping);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.by_url.len()
    }

    #[cfg(test)]
    pub(crate) fn next_id(&self) -> i64 {
        self.next_id
    }
}

/// The stored mapping for a batch item, reported under the caller's
/// correlation id.
pub(crate) fn correlate(stored: &UrlMapping, correlation_id: String) -> UrlMapping {
    UrlMapping {
        correlation_id,
        ..stored.clone()
    }
}
