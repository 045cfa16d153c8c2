//! Test utilities for ghostline-store.
//!
//! Provides an in-memory backend, a connector that hands out a shared backend
//! (so a "restarted" store sees what the previous one wrote), and a
//! fault-injecting wrapper that records every mutation it lets through.

use crate::connector::BackendConnector;
use crate::storage_trait::{KvIterator, Operation, Partition, Result, StorageBackend, StorageError};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

type PartitionData = BTreeMap<Vec<u8>, Vec<u8>>;

/// StorageBackend keeping every partition in a sorted in-memory map.
#[derive(Default)]
pub struct InMemoryBackend {
    partitions: RwLock<HashMap<String, PartitionData>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored in `partition` (0 when it does not exist).
    pub fn len(&self, partition: &Partition) -> usize {
        self.partitions
            .read()
            .get(partition.name())
            .map_or(0, |data| data.len())
    }

    pub fn is_empty(&self, partition: &Partition) -> bool {
        self.len(partition) == 0
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let partitions = self.partitions.read();
        let data = partitions
            .get(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let mut partitions = self.partitions.write();
        let data = partitions
            .get_mut(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()> {
        let mut partitions = self.partitions.write();
        let data = partitions
            .get_mut(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        data.remove(key);
        Ok(())
    }

    fn batch(&self, operations: Vec<Operation>) -> Result<()> {
        let mut partitions = self.partitions.write();

        // Validate first so a bad operation leaves nothing applied.
        for op in &operations {
            let (Operation::Put { partition, .. } | Operation::Delete { partition, .. }) = op;
            if !partitions.contains_key(partition.name()) {
                return Err(StorageError::PartitionNotFound(partition.name().to_string()));
            }
        }

        for op in operations {
            match op {
                Operation::Put {
                    partition,
                    key,
                    value,
                } => {
                    if let Some(data) = partitions.get_mut(partition.name()) {
                        data.insert(key, value);
                    }
                }
                Operation::Delete { partition, key } => {
                    if let Some(data) = partitions.get_mut(partition.name()) {
                        data.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn scan(
        &self,
        partition: &Partition,
        prefix: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<KvIterator<'_>> {
        let partitions = self.partitions.read();
        let data = partitions
            .get(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;

        let rows: Vec<_> = data
            .iter()
            .filter(|(k, _)| prefix.map_or(true, |p| k.starts_with(p)))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(rows.into_iter()))
    }

    fn partition_exists(&self, partition: &Partition) -> bool {
        self.partitions.read().contains_key(partition.name())
    }

    fn create_partition(&self, partition: &Partition) -> Result<()> {
        self.partitions
            .write()
            .entry(partition.name().to_string())
            .or_default();
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Connector handing out one shared backend.
///
/// Every `connect` returns the same backend, so state survives reconnects and
/// store restarts the way a remote database would.
pub struct InMemoryConnector {
    backend: Arc<dyn StorageBackend>,
    connects: AtomicUsize,
    refuse: AtomicBool,
}

impl InMemoryConnector {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            connects: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
        }
    }

    /// Connector over a fresh [`InMemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.backend)
    }

    /// Number of successful `connect` calls so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make subsequent `connect` calls fail.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl BackendConnector for InMemoryConnector {
    fn connect(&self) -> Result<Arc<dyn StorageBackend>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(StorageError::IoError("connection refused".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.backend))
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

/// StorageBackend wrapper that can fail on demand and journals mutations.
///
/// Only mutations that reached the inner backend are journaled, in order, so
/// tests can assert on write/delete ordering.
pub struct FailingBackend {
    inner: Arc<dyn StorageBackend>,
    writes_left: Mutex<Option<usize>>,
    fail_scans: AtomicBool,
    journal: Mutex<Vec<Operation>>,
}

impl FailingBackend {
    pub fn new(inner: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner,
            writes_left: Mutex::new(None),
            fail_scans: AtomicBool::new(false),
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Allow `n` more mutating calls, then fail every following one.
    pub fn fail_writes_after(&self, n: usize) {
        *self.writes_left.lock() = Some(n);
    }

    /// Stop injecting write failures.
    pub fn heal(&self) {
        *self.writes_left.lock() = None;
        self.fail_scans.store(false, Ordering::SeqCst);
    }

    pub fn set_fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }

    /// Mutations applied so far.
    pub fn journal(&self) -> Vec<Operation> {
        self.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    fn admit_write(&self) -> Result<()> {
        let mut left = self.writes_left.lock();
        match left.as_mut() {
            Some(0) => Err(StorageError::IoError("injected write failure".to_string())),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl StorageBackend for FailingBackend {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(partition, key)
    }

    fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        self.admit_write()?;
        self.inner.put(partition, key, value)?;
        self.journal.lock().push(Operation::Put {
            partition: partition.clone(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()> {
        self.admit_write()?;
        self.inner.delete(partition, key)?;
        self.journal.lock().push(Operation::Delete {
            partition: partition.clone(),
            key: key.to_vec(),
        });
        Ok(())
    }

    fn batch(&self, operations: Vec<Operation>) -> Result<()> {
        self.admit_write()?;
        self.inner.batch(operations.clone())?;
        self.journal.lock().extend(operations);
        Ok(())
    }

    fn scan(
        &self,
        partition: &Partition,
        prefix: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<KvIterator<'_>> {
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(StorageError::IoError("injected scan failure".to_string()));
        }
        self.inner.scan(partition, prefix, limit)
    }

    fn partition_exists(&self, partition: &Partition) -> bool {
        self.inner.partition_exists(partition)
    }

    fn create_partition(&self, partition: &Partition) -> Result<()> {
        self.inner.create_partition(partition)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
