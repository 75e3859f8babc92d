use thiserror::Error;

use crate::target::DatabaseTarget;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database not connected")]
    NotConnected,
    #[error("database already connected: {0}")]
    AlreadyConnected(DatabaseTarget),
    /// Raised by DuckDB itself; carried through untouched.
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),
    #[error("invalid database target: {0}")]
    InvalidTarget(String),
    #[error("{0}")]
    InvalidCommand(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
