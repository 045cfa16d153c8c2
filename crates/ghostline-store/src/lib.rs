//! # ghostline-store
//!
//! Low-level key-value storage for the online-DDL metadata tables. All direct
//! RocksDB interaction is isolated in this crate so the metadata store only
//! sees the [`StorageBackend`] trait.
//!
//! ## Architecture
//!
//! ```text
//! ghostline-onlineddl (metadata store, reconciliation, plugins)
//!     ↓
//! ghostline-store (partitions, K/V operations, connectors)
//!     ↓
//! RocksDB / in-memory
//! ```

pub mod connector;
pub mod key_encoding;
pub mod rocksdb_impl;
pub mod rocksdb_init;
pub mod storage_trait;

// Available to dependent crates for their tests.
pub mod test_utils;

pub use connector::{BackendConnector, RocksDbConnector};
pub use rocksdb_impl::{RocksDBBackend, RocksDb};
pub use rocksdb_init::RocksDbInit;
pub use storage_trait::{KvIterator, Operation, Partition, StorageBackend, StorageError};
