//! Storage backends for the shorturl reduction engine.
//!
//! Every backend implements [`Repository`]; [`AnyRepository`] picks one at
//! runtime from a [`StorageConfig`].

pub mod config;
pub mod file;
mod index;
pub mod memory;
pub mod postgres;

pub use config::{AnyRepository, StorageConfig};
pub use file::FileRepository;
pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use shorturl_core::{NewUrlMapping, Repository, ShortToken, StorageError, UrlMapping};
