//! Connections to the durable metadata store.
//!
//! A metadata store owns one dedicated backend handle. It obtains that handle
//! through a [`BackendConnector`], which is also used to re-open the handle
//! after a connectivity failure.

use crate::rocksdb_impl::RocksDBBackend;
use crate::rocksdb_init::RocksDbInit;
use crate::storage_trait::{Result, StorageBackend};
use std::sync::Arc;

/// Opens dedicated handles to a storage backend.
pub trait BackendConnector: Send + Sync {
    /// Open a new handle. Called once at initialization and again on reset.
    fn connect(&self) -> Result<Arc<dyn StorageBackend>>;

    /// Human readable target, used in logs.
    fn describe(&self) -> String;
}

/// Connector that opens a RocksDB database on every `connect`.
///
/// RocksDB holds an exclusive file lock, so callers must drop the previous
/// handle before reconnecting.
pub struct RocksDbConnector {
    init: RocksDbInit,
}

impl RocksDbConnector {
    pub fn new(init: RocksDbInit) -> Self {
        Self { init }
    }
}

impl BackendConnector for RocksDbConnector {
    fn connect(&self) -> Result<Arc<dyn StorageBackend>> {
        let db = self.init.open()?;
        let backend = RocksDBBackend::new(db).with_sync_writes(self.init.settings().sync_writes);
        Ok(Arc::new(backend))
    }

    fn describe(&self) -> String {
        format!("rocksdb://{}", self.init.db_path().display())
    }
}
