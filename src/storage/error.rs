//! Storage layer error types.

use crate::access::tuple::RecordId;
use crate::catalog::TableId;
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage layer.
///
/// Three classes matter to callers: I/O failures (`Io`), consistency failures
/// (everything else except `TransactionAborted`) and lock-conflict aborts.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tuple not found at {record_id}")]
    TupleNotFound { record_id: RecordId },

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("No table registered with id {0}")]
    NoSuchTable(TableId),

    #[error("Table '{0}' already exists")]
    DuplicateTable(String),

    #[error("Table id {table_id} of {path:?} is already used by {existing:?}")]
    TableIdCollision {
        table_id: TableId,
        existing: PathBuf,
        path: PathBuf,
    },

    #[error("Page {page_id} out of range (file has {num_pages} pages)")]
    PageOutOfRange { page_id: PageId, num_pages: u32 },

    #[error("Page {0} has no free slot")]
    PageFull(PageId),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    #[error("Catalog manifest error: {0}")]
    Manifest(#[from] bincode::Error),

    #[error("Transaction {0} aborted")]
    TransactionAborted(TransactionId),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn is_io(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }

    pub fn is_transaction_aborted(&self) -> bool {
        matches!(self, StorageError::TransactionAborted(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
