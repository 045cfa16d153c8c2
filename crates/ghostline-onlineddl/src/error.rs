use ghostline_store::StorageError;
use std::fmt;
use thiserror::Error;

/// Which side of the pipeline an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    /// The downstream metadata store (connection, query, write failures)
    Downstream,
    /// Logic or metadata errors raised by this crate
    Internal,
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorScope::Downstream => write!(f, "downstream"),
            ErrorScope::Internal => write!(f, "internal"),
        }
    }
}

/// Errors that can occur in online-DDL tracking
#[derive(Error, Debug)]
pub enum OnlineDdlError {
    #[error("[scope=downstream] {0}")]
    Downstream(#[from] StorageError),

    #[error("[scope=downstream] online ddl metadata connection is closed")]
    ConnectionClosed,

    #[error("invalid online ddl meta: {0}")]
    InvalidMeta(String),

    #[error("online ddl meta conflict: {0}")]
    ReconcileConflict(String),

    #[error("online ddl statement has no tables")]
    EmptyTables,

    #[error("rename statement must name exactly 2 tables, got {0}")]
    InvalidRenameTables(usize),

    #[error("rename table to ghost table `{schema}`.`{table}` is not supported")]
    RenameToGhostTable { schema: String, table: String },

    #[error("rename ghost table `{schema}`.`{table}` to other ghost table `{target}` is not supported")]
    RenameGhostTableToOther {
        schema: String,
        table: String,
        target: String,
    },

    #[error("online ddls on ghost table `{schema}`.`{table}` not found")]
    GhostDdlsNotFound { schema: String, table: String },

    #[error("unknown online ddl scheme '{0}'")]
    UnknownScheme(String),
}

impl OnlineDdlError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            OnlineDdlError::Downstream(_) | OnlineDdlError::ConnectionClosed => {
                ErrorScope::Downstream
            }
            _ => ErrorScope::Internal,
        }
    }

    /// Whether re-running the failed replication step may succeed.
    ///
    /// Only downstream failures qualify; corrupted metadata and invalid
    /// statements fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        self.scope() == ErrorScope::Downstream
    }
}

/// Result type for online-DDL operations
pub type Result<T> = std::result::Result<T, OnlineDdlError>;
