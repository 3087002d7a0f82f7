use crate::Generator;
use shorturl_core::ShortToken;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic generator producing `prefix000000`, `prefix000001`, ...
///
/// Useful wherever predictable tokens are needed, such as tests and
/// fixtures. Tokens are unique within one instance only.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Creates a generator whose first token uses `offset` as its counter.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
        }
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortToken {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortToken::new(format!("{}{:06}", self.prefix, count))
    }
}
