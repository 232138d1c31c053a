use crate::procedure::{RecordStatus, Transition};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read configuration file {path}: {source}", path = path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration schema mismatch in {origin} at {path}: {message}")]
    ConfigParse {
        origin: String,
        path: String,
        message: String,
    },
    #[error("unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),
    #[error("unknown histology classification: {0}")]
    UnknownHistology(String),
    #[error("unknown region class: {0}")]
    UnknownRegionClass(String),
    #[error("cannot {transition} a record with status {from}")]
    LifecycleViolation {
        from: RecordStatus,
        transition: Transition,
    },
    #[error("lesion {0} not found")]
    LesionNotFound(u32),
    #[error("failed to serialize procedure record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize procedure record: {0}")]
    Deserialization(serde_json::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
