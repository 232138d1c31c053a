//! Excision Record Storage
//!
//! This crate persists procedure records as pretty-printed JSON files, one record per file, in
//! one folder per billing state:
//!
//! ```text
//! <root>/
//! ├── Unprocessed/
//! │   └── 1714658400000.json
//! ├── Billed/
//! └── Archived/        # archived records and deletion tombstones
//! ```
//!
//! ## Design Principles
//!
//! - A record's file name is its `procedureId`; the id never changes once written
//! - Lifecycle moves write the record into the target folder before removing the source file
//! - Nothing is physically erased; deleted records are kept as tombstones in `Archived/`
//! - Editing a record under a different doctor creates a new record instead of rewriting history
//!
//! ## Example Usage
//!
//! ```no_run
//! use excision_core::{Folder, ProcedureRecord};
//! use excision_store::ProcedureStore;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ProcedureStore::open(Path::new("procedure_data"))?;
//! let record = ProcedureRecord::new("Dr Avery", "Jordan Blake", chrono::Utc::now());
//! store.save_new(&record)?;
//! let unprocessed = store.list(Folder::Unprocessed)?;
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::ProcedureStore;

use excision_core::{CoreError, Folder};
use std::path::PathBuf;

/// Errors that can occur during record storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Root directory exists but is not a directory, or cannot be prepared
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// No record with this id in the folder
    #[error("Procedure {id} not found in {folder}")]
    ProcedureNotFound { folder: Folder, id: i64 },

    /// Archived records and tombstones cannot be edited
    #[error("Procedure {0} is closed and cannot be edited")]
    ClosedRecord(i64),

    /// A record file exists but does not hold a valid record
    #[error("Failed to parse procedure file {}: {source}", path.display())]
    Deserialization {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lifecycle or serialisation error from excision-core
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
