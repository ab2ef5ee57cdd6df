use std::fmt;

/// Result type for Message DB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Message DB client operations
#[derive(Debug)]
pub enum Error {
    /// Expected version mismatch on write
    ConcurrencyError {
        stream_name: String,
        expected_version: i64,
    },

    /// Invalid input data
    ValidationError(String),

    /// Database unreachable or pool could not be built
    ConnectionError(String),

    /// SQL errors, constraint violations, undecodable rows
    DatabaseError(String),

    /// Connection pool exhausted or broken
    PoolError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConcurrencyError {
                stream_name,
                expected_version,
            } => write!(
                f,
                "Concurrency error on stream '{}': expected version {}",
                stream_name, expected_version
            ),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Error::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            Error::PoolError(msg) => write!(f, "Pool error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_error) = err.as_db_error() {
            return Error::DatabaseError(format!(
                "{}: {}",
                db_error.code().code(),
                db_error.message()
            ));
        }
        Error::DatabaseError(format!("{:?}", err))
    }
}

impl From<deadpool_postgres::PoolError> for Error {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Error::PoolError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ValidationError(format!("JSON error: {}", err))
    }
}
