use jobrun_core::ContextError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database path cannot be empty for embedded engines")]
    EmptyTarget,

    /// `dsn` is always credential-redacted.
    #[error("failed to parse DSN {dsn}: {reason}")]
    DsnParse { dsn: String, reason: String },

    #[error("unsupported database engine: {0}")]
    UnsupportedEngine(String),

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Query(String),

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl DbError {
    pub(crate) fn connection(msg: impl std::fmt::Display) -> Self {
        DbError::Connection(msg.to_string())
    }

    pub(crate) fn query(msg: impl std::fmt::Display) -> Self {
        DbError::Query(msg.to_string())
    }
}
