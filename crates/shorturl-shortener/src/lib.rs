//! URL reduction engine.
//!
//! This crate provides [`ShortenerService`], the [`Shortener`]
//! implementation that ties a token generator to a storage backend. Core
//! types are re-exported from `shorturl_core`.

pub mod service;

pub use service::{ShortenerConfig, ShortenerService, DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE};
pub use shorturl_core::{ReduceRequest, ReducedUrl, Shortener, ShortenerError};
