// Error types for store operations

use thiserror::Error;

/// Errors surfaced by [`TaskStore`](crate::TaskStore) operations
///
/// `NotFound` and `OutOfRange` are caller-input errors; `Storage` means
/// the persistence layer itself failed and the operation had no effect.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task with the given id exists in the store
    #[error("no task with id {id}")]
    NotFound { id: String },

    /// A reorder index fell outside the current `[0, n-1]` range
    #[error("index {index} is out of range for {len} task(s)")]
    OutOfRange { index: i32, len: usize },

    /// The underlying persistence layer failed
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Causes of a persistence-layer failure
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Another process holds the store's writer lock
    #[error("store is locked by another process")]
    Locked,

    /// The database and the store's view of it disagree (e.g. a bulk
    /// delete reported identifiers that don't match the known set)
    #[error("store inconsistency: {0}")]
    Inconsistent(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Storage(StorageError::Sqlite(e))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(StorageError::Io(e))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(StorageError::Json(e))
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NotFound {
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "no task with id abc");
    }

    #[test]
    fn test_out_of_range_display() {
        let err = StoreError::OutOfRange { index: 5, len: 3 };
        assert_eq!(err.to_string(), "index 5 is out of range for 3 task(s)");
    }

    #[test]
    fn test_sqlite_error_converts_to_storage() {
        let err: StoreError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
