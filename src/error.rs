//! Error taxonomy for table operations.
//!
//! Input mistakes (blank key field, stale row reference, unknown column) leave
//! the table untouched and can be retried. Load failures halt the table for the
//! rest of the session. A failed save keeps the in-memory copy so the user can
//! save again.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::record::RecordId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table}: field '{field}' {reason}")]
    Validation {
        table: String,
        field: String,
        reason: String,
    },

    #[error("{table}: row {position} is out of range (table has {len} row(s))")]
    Position {
        table: String,
        position: i64,
        len: usize,
    },

    #[error("{table}: record #{id} no longer exists")]
    StaleRecord { table: String, id: RecordId },

    #[error("{table}: unknown column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("table '{table}' was not found in workbook {workbook:?}")]
    NotFound { table: String, workbook: PathBuf },

    #[error("workbook {path:?} is not readable")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("saving '{table}' failed; in-memory changes are kept")]
    StorageWrite {
        table: String,
        #[source]
        source: io::Error,
    },

    #[error("table '{0}' failed to load earlier in this session; reopen the session to retry")]
    Halted(String),
}

impl StoreError {
    pub(crate) fn validation(table: &str, field: &str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            table: table.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the session can keep working on the same table after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::Validation { .. }
                | StoreError::Position { .. }
                | StoreError::StaleRecord { .. }
                | StoreError::UnknownColumn { .. }
                | StoreError::StorageWrite { .. }
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
