//! Online-DDL metadata storage.
//!
//! Keeps the DDLs observed on every ghost table of one upstream source, both
//! in memory and in the `{meta_schema}.{task}_onlineddl` partition of the
//! downstream metadata store. Every mutation writes the durable row and the
//! cached record inside the same critical section, so after a successful call
//! both layers agree.
//!
//! ## Locking
//!
//! One reader-writer lock guards the cache and the connection handle. `get`
//! takes the read lock; everything else, `load` included, takes the write
//! lock for its whole duration.

mod reconcile;

use crate::error::{OnlineDdlError, Result};
use crate::models::{GhostDdlInfo, OnlineDdlRow};
use ghostline_configs::OnlineDdlConfig;
use ghostline_store::key_encoding::{parse_row_key, row_key, source_prefix};
use ghostline_store::{BackendConnector, Operation, Partition, StorageBackend, StorageError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// ghost table => ghost ddl info
type GhostTables = HashMap<String, GhostDdlInfo>;

struct StorageState {
    conn: Option<Arc<dyn StorageBackend>>,
    /// ghost schema => [ghost table => ghost ddl info, ...]
    ddls: HashMap<String, GhostTables>,
}

impl StorageState {
    fn connection(&self) -> Result<Arc<dyn StorageBackend>> {
        self.conn.clone().ok_or(OnlineDdlError::ConnectionClosed)
    }
}

/// Online-DDL information of one upstream source.
pub struct OnlineDdlStorage {
    source_id: String,
    partition: Partition,
    connector: Arc<dyn BackendConnector>,
    state: RwLock<StorageState>,
}

impl OnlineDdlStorage {
    /// Create an empty storage. Call [`init`](Self::init) before use.
    pub fn new(config: &OnlineDdlConfig, connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            source_id: config.task.source_id.clone(),
            partition: Partition::new(config.online_ddl_partition()),
            connector,
            state: RwLock::new(StorageState {
                conn: None,
                ddls: HashMap::new(),
            }),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Open a dedicated connection, create the metadata table if needed and
    /// load every record of this source.
    pub fn init(&self) -> Result<()> {
        let mut state = self.state.write();

        let conn = self.connector.connect()?;
        self.prepare(conn.as_ref())?;
        state.conn = Some(conn);

        log::info!(
            "online ddl storage connected: target={}, partition={}, source={}",
            self.connector.describe(),
            self.partition,
            self.source_id
        );

        self.load_locked(&mut state)
    }

    /// Load this source's records from the metadata table.
    ///
    /// Records found in the table replace cached records with the same key.
    pub fn load(&self) -> Result<()> {
        let mut state = self.state.write();
        self.load_locked(&mut state)
    }

    /// Returns a copy of the record of one ghost table.
    pub fn get(&self, ghost_schema: &str, ghost_table: &str) -> Option<GhostDdlInfo> {
        let state = self.state.read();
        state.ddls.get(ghost_schema)?.get(ghost_table).cloned()
    }

    /// Record `ddl` for a ghost table.
    ///
    /// A record is created with the given real schema/table on first use. A
    /// DDL equal to the last recorded one is ignored, since the upstream may
    /// redeliver the same event after a restart.
    pub fn save(
        &self,
        ghost_schema: &str,
        ghost_table: &str,
        real_schema: &str,
        real_table: &str,
        ddl: &str,
    ) -> Result<()> {
        let mut state = self.state.write();

        let mut info = state
            .ddls
            .get(ghost_schema)
            .and_then(|tables| tables.get(ghost_table))
            .cloned()
            .unwrap_or_else(|| GhostDdlInfo::new(real_schema, real_table));

        if info.last_ddl() == Some(ddl) {
            log::warn!(
                "online ddl may be saved before, just ignore it: ghost={}.{}, ddl={}",
                ghost_schema,
                ghost_table,
                ddl
            );
            return Ok(());
        }
        info.ddls.push(ddl.to_string());

        let conn = state.connection()?;
        self.save_to_db(conn.as_ref(), ghost_schema, ghost_table, &info)?;

        state
            .ddls
            .entry(ghost_schema.to_string())
            .or_default()
            .insert(ghost_table.to_string(), info);
        Ok(())
    }

    /// Delete the record of one ghost table from the table and the cache.
    pub fn delete(&self, ghost_schema: &str, ghost_table: &str) -> Result<()> {
        let mut state = self.state.write();

        if !state.ddls.contains_key(ghost_schema) {
            log::debug!(
                "no online ddl meta to delete: ghost={}.{}",
                ghost_schema,
                ghost_table
            );
            return Ok(());
        }

        let conn = state.connection()?;
        conn.delete(
            &self.partition,
            &row_key(&self.source_id, ghost_schema, ghost_table),
        )?;

        if let Some(tables) = state.ddls.get_mut(ghost_schema) {
            tables.remove(ghost_table);
            if tables.is_empty() {
                state.ddls.remove(ghost_schema);
            }
        }
        Ok(())
    }

    /// Delete every record of this source.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.write();

        let conn = state.connection()?;
        let prefix = source_prefix(&self.source_id);
        let deletes: Vec<Operation> = conn
            .scan(&self.partition, Some(&prefix), None)?
            .map(|(key, _)| Operation::Delete {
                partition: self.partition.clone(),
                key,
            })
            .collect();

        let removed = deletes.len();
        if !deletes.is_empty() {
            conn.batch(deletes)?;
        }

        state.ddls.clear();
        log::info!(
            "cleared online ddl meta: source={}, rows={}",
            self.source_id,
            removed
        );
        Ok(())
    }

    /// Re-open the connection. Cached records are kept.
    pub fn reset_conn(&self) -> Result<()> {
        let mut state = self.state.write();

        // Release first: an embedded store only allows one open handle.
        state.conn = None;
        state.conn = Some(self.connector.connect()?);

        log::info!(
            "online ddl storage reconnected: target={}",
            self.connector.describe()
        );
        Ok(())
    }

    /// Release the connection. Safe to call more than once.
    pub fn close(&self) {
        let mut state = self.state.write();
        if state.conn.take().is_some() {
            log::info!("online ddl storage closed: source={}", self.source_id);
        }
    }

    /// Number of cached ghost table records.
    pub fn len(&self) -> usize {
        self.state.read().ddls.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached ghost schemas, sorted.
    pub fn ghost_schemas(&self) -> Vec<String> {
        let mut schemas: Vec<String> = self.state.read().ddls.keys().cloned().collect();
        schemas.sort();
        schemas
    }

    fn prepare(&self, conn: &dyn StorageBackend) -> Result<()> {
        if !conn.partition_exists(&self.partition) {
            log::info!("creating online ddl meta table {}", self.partition);
        }
        conn.create_partition(&self.partition)?;
        Ok(())
    }

    fn load_locked(&self, state: &mut StorageState) -> Result<()> {
        let conn = state.connection()?;
        let prefix = source_prefix(&self.source_id);

        // Decode everything before touching the cache so a bad row leaves it intact.
        let mut loaded = Vec::new();
        for (key, value) in conn.scan(&self.partition, Some(&prefix), None)? {
            let row: OnlineDdlRow = serde_json::from_slice(&value).map_err(|e| {
                StorageError::SerializationError(format!("online ddl row: {}", e))
            })?;

            let expected = (
                row.id.clone(),
                row.ghost_schema.clone(),
                row.ghost_table.clone(),
            );
            if parse_row_key(&key).as_ref() != Some(&expected) {
                return Err(OnlineDdlError::InvalidMeta(format!(
                    "row key does not match row {}.{} of source {}",
                    row.ghost_schema, row.ghost_table, row.id
                )));
            }

            let info = GhostDdlInfo::from_payload(&row.ddls)?;
            loaded.push((row.ghost_schema, row.ghost_table, info));
        }

        for (schema, table, info) in loaded {
            log::info!(
                "loaded online ddl meta from checkpoint: db={}, table={}",
                schema,
                table
            );
            state.ddls.entry(schema).or_default().insert(table, info);
        }
        Ok(())
    }

    fn save_to_db(
        &self,
        conn: &dyn StorageBackend,
        ghost_schema: &str,
        ghost_table: &str,
        info: &GhostDdlInfo,
    ) -> Result<()> {
        let value = self.encode_row(ghost_schema, ghost_table, info)?;
        conn.put(
            &self.partition,
            &row_key(&self.source_id, ghost_schema, ghost_table),
            &value,
        )?;
        Ok(())
    }

    /// Serialize the durable row for one ghost table.
    fn encode_row(
        &self,
        ghost_schema: &str,
        ghost_table: &str,
        info: &GhostDdlInfo,
    ) -> Result<Vec<u8>> {
        let row = OnlineDdlRow {
            id: self.source_id.clone(),
            ghost_schema: ghost_schema.to_string(),
            ghost_table: ghost_table.to_string(),
            ddls: info.to_payload()?,
            update_time: chrono::Utc::now().timestamp_millis(),
        };
        serde_json::to_vec(&row).map_err(|e| OnlineDdlError::InvalidMeta(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostline_store::test_utils::{InMemoryBackend, InMemoryConnector};

    fn create_storage() -> (OnlineDdlStorage, Arc<InMemoryConnector>) {
        let connector = Arc::new(InMemoryConnector::in_memory());
        let config = OnlineDdlConfig::new("task", "source-1");
        let storage = OnlineDdlStorage::new(&config, connector.clone());
        storage.init().unwrap();
        (storage, connector)
    }

    fn row_count(connector: &InMemoryConnector, storage: &OnlineDdlStorage) -> usize {
        let backend = connector.backend();
        let memory = backend
            .as_any()
            .downcast_ref::<InMemoryBackend>()
            .unwrap();
        memory.len(storage.partition())
    }

    #[test]
    fn test_init_creates_partition() {
        let (storage, connector) = create_storage();
        assert!(connector.backend().partition_exists(storage.partition()));
        assert_eq!(storage.partition().name(), "dm_meta.task_onlineddl");
        assert!(storage.is_empty());
    }

    #[test]
    fn test_save_creates_record_with_real_names() {
        let (storage, connector) = create_storage();
        storage
            .save("db", "_t_new", "db", "t", "ALTER TABLE `_t_new` ADD c INT")
            .unwrap();

        let info = storage.get("db", "_t_new").unwrap();
        assert_eq!(info.schema, "db");
        assert_eq!(info.table, "t");
        assert_eq!(info.ddls, vec!["ALTER TABLE `_t_new` ADD c INT"]);
        assert_eq!(row_count(&connector, &storage), 1);
    }

    #[test]
    fn test_get_returns_copy() {
        let (storage, _) = create_storage();
        storage.save("db", "_t_new", "db", "t", "ddl1").unwrap();

        let mut info = storage.get("db", "_t_new").unwrap();
        info.ddls.push("mutated".to_string());

        assert_eq!(storage.get("db", "_t_new").unwrap().ddls, vec!["ddl1"]);
    }

    #[test]
    fn test_delete_prunes_empty_schema() {
        let (storage, connector) = create_storage();
        storage.save("db", "_t_new", "db", "t", "ddl1").unwrap();

        storage.delete("db", "_t_new").unwrap();
        assert!(storage.ghost_schemas().is_empty());
        assert_eq!(row_count(&connector, &storage), 0);

        // absent schema is a no-op
        storage.delete("db", "_t_new").unwrap();
    }

    #[test]
    fn test_closed_storage_rejects_writes() {
        let (storage, _) = create_storage();
        storage.close();
        storage.close();

        let err = storage.save("db", "_t_new", "db", "t", "ddl1").unwrap_err();
        assert!(matches!(err, OnlineDdlError::ConnectionClosed));
        assert!(err.is_retryable());
        assert!(storage.get("db", "_t_new").is_none());
    }
}
