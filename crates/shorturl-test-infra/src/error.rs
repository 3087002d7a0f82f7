use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container failed: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    /// The server never accepted a connection within the retry budget.
    #[error("postgres not reachable after {attempts} attempts: {source}")]
    Unreachable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
