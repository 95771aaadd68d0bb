use jobrun_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("value column '{0}' not found in result set")]
    ValueColumnNotFound(String),

    #[error("error iterating rows: {0}")]
    Query(#[from] DbError),
}
