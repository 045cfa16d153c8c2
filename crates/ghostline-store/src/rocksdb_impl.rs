//! RocksDB implementation of the StorageBackend trait.
//!
//! Maps the generic partition concept to RocksDB column families. The database
//! is opened in multi-threaded column family mode so partitions can be created
//! through a shared handle.

use crate::storage_trait::{KvIterator, Operation, Partition, Result, StorageBackend, StorageError};
use rocksdb::{
    BoundColumnFamily, DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options,
    WriteBatch, WriteOptions,
};
use std::sync::Arc;

/// RocksDB handle type used across ghostline.
pub type RocksDb = DBWithThreadMode<MultiThreaded>;

/// RocksDB implementation of the StorageBackend trait.
///
/// ## Example
///
/// ```rust,ignore
/// use ghostline_store::{RocksDBBackend, RocksDbInit, StorageBackend, Partition};
///
/// let db = RocksDbInit::with_defaults("/tmp/ghostline").open()?;
/// let backend = RocksDBBackend::new(db);
///
/// let partition = Partition::new("dm_meta.task_onlineddl");
/// backend.create_partition(&partition)?;
/// backend.put(&partition, b"key1", b"value1")?;
/// ```
pub struct RocksDBBackend {
    db: Arc<RocksDb>,
    sync_writes: bool,
}

impl RocksDBBackend {
    /// Creates a new RocksDB backend with the given database handle.
    pub fn new(db: Arc<RocksDb>) -> Self {
        Self {
            db,
            sync_writes: false,
        }
    }

    /// Sync the WAL on every write (durability over throughput).
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    fn get_cf(&self, partition: &Partition) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }
}

impl StorageBackend for RocksDBBackend {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.get_cf(partition)?;
        Ok(self.db.get_cf(&cf, key)?)
    }

    fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.get_cf(partition)?;
        Ok(self.db.put_cf_opt(&cf, key, value, &self.write_opts())?)
    }

    fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()> {
        let cf = self.get_cf(partition)?;
        Ok(self.db.delete_cf_opt(&cf, key, &self.write_opts())?)
    }

    fn batch(&self, operations: Vec<Operation>) -> Result<()> {
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                Operation::Put {
                    partition,
                    key,
                    value,
                } => {
                    let cf = self.get_cf(&partition)?;
                    batch.put_cf(&cf, key, value);
                }
                Operation::Delete { partition, key } => {
                    let cf = self.get_cf(&partition)?;
                    batch.delete_cf(&cf, key);
                }
            }
        }

        Ok(self.db.write_opt(batch, &self.write_opts())?)
    }

    fn scan(
        &self,
        partition: &Partition,
        prefix: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<KvIterator<'_>> {
        let cf = self.get_cf(partition)?;

        let mode = match prefix {
            Some(p) => IteratorMode::From(p, Direction::Forward),
            None => IteratorMode::Start,
        };

        // Each RocksDB iterator reads from an implicit snapshot; rows are
        // materialized so iterator errors surface here instead of ending the scan.
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item?;
            if let Some(p) = prefix {
                if !key.starts_with(p) {
                    break;
                }
            }
            if limit.is_some_and(|l| rows.len() >= l) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }

        Ok(Box::new(rows.into_iter()))
    }

    fn partition_exists(&self, partition: &Partition) -> bool {
        self.db.cf_handle(partition.name()).is_some()
    }

    fn create_partition(&self, partition: &Partition) -> Result<()> {
        if self.partition_exists(partition) {
            return Ok(());
        }

        match self.db.create_cf(partition.name(), &Options::default()) {
            Ok(()) => Ok(()),
            Err(e) => {
                let msg = e.into_string();
                // Another thread created the CF between exists-check and create
                if msg.to_lowercase().contains("column family already exists") {
                    return Ok(());
                }
                Err(StorageError::IoError(msg))
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
