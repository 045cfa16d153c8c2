//! Shared fixtures for online-DDL integration tests.

#![allow(dead_code)]

use ghostline_configs::OnlineDdlConfig;
use ghostline_onlineddl::{GhostTableDetector, OnlineDdlRow, OnlineDdlStorage, TableType};
use ghostline_store::test_utils::{FailingBackend, InMemoryBackend, InMemoryConnector};
use ghostline_store::{Partition, StorageBackend};
use std::sync::Arc;

pub const TASK: &str = "orders-sync";
pub const SOURCE_ID: &str = "mysql-replica-01";

/// Detector using pt-osc and gh-ost naming: `_t_new`/`_t_gho` are ghost
/// tables, `_t_old`/`_t_del`/`_t_ghc` are trash.
pub struct SuffixDetector;

const GHOST_SUFFIXES: [&str; 2] = ["_new", "_gho"];
const TRASH_SUFFIXES: [&str; 3] = ["_old", "_del", "_ghc"];

impl GhostTableDetector for SuffixDetector {
    fn table_type(&self, table: &str) -> TableType {
        if !table.starts_with('_') {
            return TableType::Real;
        }
        if GHOST_SUFFIXES.iter().any(|s| table.ends_with(s)) {
            TableType::Ghost
        } else if TRASH_SUFFIXES.iter().any(|s| table.ends_with(s)) {
            TableType::Trash
        } else {
            TableType::Real
        }
    }

    fn real_name(&self, table: &str) -> String {
        if self.table_type(table) == TableType::Real {
            return table.to_string();
        }
        let name = &table[1..];
        GHOST_SUFFIXES
            .iter()
            .chain(TRASH_SUFFIXES.iter())
            .find_map(|s| name.strip_suffix(s))
            .unwrap_or(name)
            .to_string()
    }
}

pub fn test_config(source_id: &str) -> OnlineDdlConfig {
    OnlineDdlConfig::new(TASK, source_id)
}

pub fn partition() -> Partition {
    Partition::new(test_config(SOURCE_ID).online_ddl_partition())
}

/// Initialized storage over a fresh in-memory backend.
pub fn memory_storage() -> (OnlineDdlStorage, Arc<InMemoryConnector>) {
    let connector = Arc::new(InMemoryConnector::in_memory());
    let storage = open_storage(&connector, SOURCE_ID);
    (storage, connector)
}

/// Initialized storage for `source_id` over a shared connector.
pub fn open_storage(connector: &Arc<InMemoryConnector>, source_id: &str) -> OnlineDdlStorage {
    let storage = OnlineDdlStorage::new(&test_config(source_id), connector.clone());
    storage.init().expect("init storage");
    storage
}

/// Initialized storage whose backend fails on demand and journals mutations.
pub fn failing_storage() -> (OnlineDdlStorage, Arc<FailingBackend>, Arc<InMemoryConnector>) {
    let failing = Arc::new(FailingBackend::new(Arc::new(InMemoryBackend::new())));
    let connector = Arc::new(InMemoryConnector::new(failing.clone()));
    let storage = open_storage(&connector, SOURCE_ID);
    (storage, failing, connector)
}

/// Decoded rows of the online-DDL partition, in key order.
pub fn stored_rows(backend: &dyn StorageBackend) -> Vec<OnlineDdlRow> {
    backend
        .scan(&partition(), None, None)
        .expect("scan partition")
        .map(|(_, value)| serde_json::from_slice(&value).expect("decode row"))
        .collect()
}

/// `(ghost schema, ghost table)` of every stored row, in key order.
pub fn stored_keys(backend: &dyn StorageBackend) -> Vec<(String, String)> {
    stored_rows(backend)
        .into_iter()
        .map(|row| (row.ghost_schema, row.ghost_table))
        .collect()
}
