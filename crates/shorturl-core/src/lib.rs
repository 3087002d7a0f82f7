//! Core types and traits for the shorturl reduction engine.
//!
//! This crate provides the shared data model, the persistence contract
//! implemented by every storage backend, and the `Shortener` contract that
//! adapters call into.

pub mod error;
pub mod repository;
pub mod shortener;
pub mod token;

pub use error::{ShortenerError, StorageError};
pub use repository::{NewUrlMapping, Repository, UrlMapping};
pub use shortener::{ReduceRequest, ReducedUrl, Shortener};
pub use token::ShortToken;
