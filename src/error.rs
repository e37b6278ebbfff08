use std::io;

use crate::encoding::format::Raw;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Caller errors, raised before the store is contacted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Check row {} does not match mutation row {}", Raw::bytes(.check), Raw::bytes(.mutation))]
    RowMismatch { check: Vec<u8>, mutation: Vec<u8> },

    // Reported by the store.
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Table already exists: {0}")]
    TableExists(String),
    #[error("Column family {} does not exist in table {table}", Raw::bytes(.family))]
    NoSuchColumnFamily { table: String, family: Vec<u8> },
    #[error("Batch entry {index} failed: {source}")]
    BatchEntry {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    // Connectivity.
    #[error("Cluster unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to decode {0}")]
    Decode(String),
    #[error("Lock was poisoned")]
    LockPoisoned,
}

/// Coarse classification used by callers deciding whether to abort or
/// carry on with the rest of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Caller,
    Remote,
    Connectivity,
    Config,
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) | Error::RowMismatch { .. } => ErrorKind::Caller,
            Error::TableNotFound(_)
            | Error::TableExists(_)
            | Error::NoSuchColumnFamily { .. }
            | Error::Decode(_)
            | Error::LockPoisoned => ErrorKind::Remote,
            Error::BatchEntry { source, .. } => source.kind(),
            Error::Unavailable(_) => ErrorKind::Connectivity,
            Error::Config(_) | Error::IoError(_) => ErrorKind::Config,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::LockPoisoned
    }
}
