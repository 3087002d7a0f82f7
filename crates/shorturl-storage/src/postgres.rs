use async_trait::async_trait;
use jiff::Timestamp;
use shorturl_core::repository::Result;
use shorturl_core::{NewUrlMapping, Repository, ShortToken, StorageError, UrlMapping};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{error, info};

/// Schema applied by [`PostgresRepository::migrate`].
pub const SCHEMA: &str = include_str!("../ddl/postgres/short_urls.sql");

/// Insert-or-return-existing keyed on `original_url`.
///
/// The no-op update makes `RETURNING` yield the stored row on conflict.
const UPSERT: &str = r#"
    INSERT INTO short_urls (correlation_id, original_url, short_url, created_at)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (original_url) DO UPDATE SET
        original_url = EXCLUDED.original_url
    RETURNING id, correlation_id, original_url, short_url, created_at, deleted
"#;

/// PostgreSQL implementation of the repository contract.
///
/// Uniqueness of `original_url` is enforced by the table itself. A batch is
/// written in one transaction: if any row fails, nothing from that batch is
/// kept.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        info!("short_urls schema is up to date");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_created_at(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid created_at timestamp '{}': {e}", seconds))
    })
}

fn row_to_mapping(row: &PgRow) -> Result<UrlMapping> {
    let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(UrlMapping {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        correlation_id: row.try_get("correlation_id").map_err(map_sqlx_error)?,
        original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
        short_url: ShortToken::new(short_url),
        created_at: parse_created_at(created_at)?,
        deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
    })
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn add_url(&self, mapping: NewUrlMapping) -> Result<ShortToken> {
        let row = sqlx::query(UPSERT)
            .bind(mapping.correlation_id.as_str())
            .bind(mapping.original_url.as_str())
            .bind(mapping.short_url.as_str())
            .bind(Timestamp::now().as_second())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(original_url = %mapping.original_url, error = %e, "postgres add url failed");
                map_sqlx_error(e)
            })?;

        let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
        Ok(ShortToken::new(short_url))
    }

    async fn add_batch(&self, mappings: Vec<NewUrlMapping>) -> Result<Vec<UrlMapping>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let now = Timestamp::now().as_second();
        let mut stored = Vec::with_capacity(mappings.len());

        // Dropping `tx` on an early return rolls the whole batch back.
        for mapping in mappings {
            let row = sqlx::query(UPSERT)
                .bind(mapping.correlation_id.as_str())
                .bind(mapping.original_url.as_str())
                .bind(mapping.short_url.as_str())
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    error!(original_url = %mapping.original_url, error = %e, "failed to save url, rolling back batch");
                    map_sqlx_error(e)
                })?;

            let mut saved = row_to_mapping(&row)?;
            saved.correlation_id = mapping.correlation_id;
            stored.push(saved);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(stored)
    }

    async fn get_url(&self, token: &ShortToken) -> Result<Option<UrlMapping>> {
        let row = sqlx::query(
            r#"
            SELECT id, correlation_id, original_url, short_url, created_at, deleted
            FROM short_urls
            WHERE short_url = $1
            LIMIT 1
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_mapping).transpose()
    }
}
