use crate::{FileRepository, InMemoryRepository, PostgresRepository};
use async_trait::async_trait;
use shorturl_core::repository::Result;
use shorturl_core::{NewUrlMapping, Repository, ShortToken, UrlMapping};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tracing::info;

/// Which storage backend to construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Mappings live only as long as the process.
    InMemory,
    /// Append-only JSON-lines file. `None` keeps the file backend purely in
    /// memory.
    File { path: Option<PathBuf> },
    /// PostgreSQL reachable through the given connection string.
    Postgres { dsn: String },
}

impl StorageConfig {
    /// Picks a backend from deployment settings: a DSN wins, then a file
    /// path, then plain memory. Empty strings count as unset.
    pub fn from_settings(dsn: Option<String>, file_path: Option<PathBuf>) -> Self {
        if let Some(dsn) = dsn.filter(|d| !d.is_empty()) {
            return StorageConfig::Postgres { dsn };
        }

        match file_path.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => StorageConfig::File { path: Some(path) },
            None => StorageConfig::InMemory,
        }
    }
}

impl Display for StorageConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageConfig::InMemory => write!(f, "in-memory"),
            StorageConfig::File { .. } => write!(f, "file"),
            StorageConfig::Postgres { .. } => write!(f, "postgres"),
        }
    }
}

/// A repository chosen at runtime from a [`StorageConfig`].
#[derive(Debug)]
pub enum AnyRepository {
    InMemory(InMemoryRepository),
    File(FileRepository),
    Postgres(PostgresRepository),
}

impl AnyRepository {
    /// Constructs the configured backend. The PostgreSQL schema is created
    /// if missing.
    pub async fn open(config: StorageConfig) -> Result<Self> {
        info!(storage_backend = %config, "opening storage backend");

        let repository = match config {
            StorageConfig::InMemory => AnyRepository::InMemory(InMemoryRepository::new()),
            StorageConfig::File { path } => AnyRepository::File(FileRepository::open(path).await?),
            StorageConfig::Postgres { dsn } => {
                let repository = PostgresRepository::connect(&dsn).await?;
                repository.migrate().await?;
                AnyRepository::Postgres(repository)
            }
        };

        Ok(repository)
    }
}

#[async_trait]
impl Repository for AnyRepository {
    async fn add_url(&self, mapping: NewUrlMapping) -> Result<ShortToken> {
        match self {
            AnyRepository::InMemory(repo) => repo.add_url(mapping).await,
            AnyRepository::File(repo) => repo.add_url(mapping).await,
            AnyRepository::Postgres(repo) => repo.add_url(mapping).await,
        }
    }

    async fn add_batch(&self, mappings: Vec<NewUrlMapping>) -> Result<Vec<UrlMapping>> {
        match self {
            AnyRepository::InMemory(repo) => repo.add_batch(mappings).await,
            AnyRepository::File(repo) => repo.add_batch(mappings).await,
            AnyRepository::Postgres(repo) => repo.add_batch(mappings).await,
        }
    }

    async fn get_url(&self, token: &ShortToken) -> Result<Option<UrlMapping>> {
        match self {
            AnyRepository::InMemory(repo) => repo.get_url(token).await,
            AnyRepository::File(repo) => repo.get_url(token).await,
            AnyRepository::Postgres(repo) => repo.get_url(token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsn_takes_precedence() {
        let config = StorageConfig::from_settings(
            Some("postgres://u:p@localhost/db".to_string()),
            Some(PathBuf::from("/tmp/short-url-db.json")),
        );
        assert_eq!(
            config,
            StorageConfig::Postgres {
                dsn: "postgres://u:p@localhost/db".to_string()
            }
        );
    }

    #[test]
    fn file_path_without_dsn() {
        let config = StorageConfig::from_settings(None, Some(PathBuf::from("/tmp/db.json")));
        assert_eq!(
            config,
            StorageConfig::File {
                path: Some(PathBuf::from("/tmp/db.json"))
            }
        );
    }

    #[test]
    fn empty_settings_fall_back_to_memory() {
        assert_eq!(StorageConfig::from_settings(None, None), StorageConfig::InMemory);
        assert_eq!(
            StorageConfig::from_settings(Some(String::new()), Some(PathBuf::new())),
            StorageConfig::InMemory
        );
    }

    #[tokio::test]
    async fn opens_in_memory_backend() {
        let repo = AnyRepository::open(StorageConfig::InMemory).await.unwrap();
        assert!(matches!(repo, AnyRepository::InMemory(_)));

        let token = repo
            .add_url(NewUrlMapping::new("c", "http://example.com", "abc123"))
            .await
            .unwrap();
        let got = repo.get_url(&token).await.unwrap().unwrap();
        assert_eq!(got.original_url, "http://example.com");
    }

    #[tokio::test]
    async fn opens_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.json");

        let repo = AnyRepository::open(StorageConfig::File {
            path: Some(path.clone()),
        })
        .await
        .unwrap();
        repo.add_batch(vec![NewUrlMapping::new("1", "http://a.example", "aaaa")])
            .await
            .unwrap();

        assert!(matches!(repo, AnyRepository::File(_)));
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 1);
    }
}
