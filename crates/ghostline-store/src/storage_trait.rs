//! Storage backend abstraction for pluggable storage implementations.
//!
//! The online-DDL metadata lives in a "backing table" that is modelled as a
//! [`Partition`] of a generic key-value backend. Backends map partitions to
//! their native concepts:
//! - **RocksDB**: Partition = Column Family
//! - **In-Memory**: Partition = BTreeMap namespace
//!
//! ## Example Usage
//!
//! ```rust
//! use ghostline_store::storage_trait::{Partition, StorageBackend};
//! use ghostline_store::test_utils::InMemoryBackend;
//!
//! let backend = InMemoryBackend::new();
//! let partition = Partition::new("dm_meta.task_onlineddl");
//! backend.create_partition(&partition).unwrap();
//! backend.put(&partition, b"key", b"value").unwrap();
//! assert_eq!(backend.get(&partition, b"key").unwrap(), Some(b"value".to_vec()));
//! ```

use std::any::Any;
use std::fmt;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Iterator over `(key, value)` pairs returned by [`StorageBackend::scan`].
pub type KvIterator<'a> = Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Partition (column family, namespace) not found
    PartitionNotFound(String),

    /// Generic I/O error from underlying storage
    IoError(String),

    /// Serialization/deserialization error
    SerializationError(String),

    /// Operation not supported by this backend
    Unsupported(String),

    /// Lock poisoning error (internal concurrency issue)
    LockPoisoned(String),

    /// Other errors
    Other(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::PartitionNotFound(p) => write!(f, "Partition not found: {}", p),
            StorageError::IoError(msg) => write!(f, "I/O error: {}", msg),
            StorageError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            StorageError::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
            StorageError::LockPoisoned(msg) => write!(f, "Lock poisoned: {}", msg),
            StorageError::Other(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::IoError(err.into_string())
    }
}

/// Represents a logical partition of data within a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    name: String,
}

impl Partition {
    /// Creates a new partition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the partition name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<String> for Partition {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Partition {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Represents a single operation in a batch transaction.
///
/// Used with `StorageBackend::batch()` for atomic multi-operation transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert or update a key-value pair
    Put {
        partition: Partition,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Delete a key
    Delete { partition: Partition, key: Vec<u8> },
}

/// Trait for pluggable storage backend implementations.
///
/// Implementations must be thread-safe (Send + Sync) to allow concurrent access.
///
/// ## Error Handling
///
/// Implementations should:
/// - Return `PartitionNotFound` if partition doesn't exist
/// - Return `IoError` for underlying storage failures
/// - Return `Unsupported` for operations not supported by the backend
pub trait StorageBackend: Send + Sync {
    /// Retrieves a value by key from the specified partition.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stores a key-value pair in the specified partition.
    ///
    /// If the key already exists, its value is replaced.
    fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()>;

    /// Deletes a key from the specified partition.
    ///
    /// Returns `Ok(())` even if the key doesn't exist (idempotent).
    fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()>;

    /// Executes multiple operations atomically in a batch.
    ///
    /// Either all operations succeed or none are applied.
    fn batch(&self, operations: Vec<Operation>) -> Result<()>;

    /// Scans keys in a partition in key order, optionally filtered by prefix and limit.
    fn scan(
        &self,
        partition: &Partition,
        prefix: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<KvIterator<'_>>;

    /// Checks if a partition exists.
    fn partition_exists(&self, partition: &Partition) -> bool;

    /// Creates a new partition.
    ///
    /// Returns `Ok(())` if the partition already exists (idempotent).
    fn create_partition(&self, partition: &Partition) -> Result<()>;

    /// Downcast support for callers that need the concrete backend.
    fn as_any(&self) -> &dyn Any;
}
