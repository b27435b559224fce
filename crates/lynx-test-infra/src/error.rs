use thiserror::Error;

/// Failures while bringing up or talking to a Redis fixture.
#[derive(Debug, Error)]
pub enum TestInfraError {
    /// The Redis container could not be started or inspected.
    #[error("redis container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    /// The fixture started but a client could not open or use a connection.
    #[error("redis client error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
