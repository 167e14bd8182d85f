use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LessonsError>;

#[derive(Error, Debug)]
pub enum LessonsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Lessons ledger {path} is corrupted: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Ledger lock error: {0}")]
    LockError(String),
}
