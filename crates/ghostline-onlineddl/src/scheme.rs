//! Registry of supported online-DDL tools.

use crate::error::{OnlineDdlError, Result};
use crate::plugin::{GhostTableDetector, OnlinePlugin, RealOnlinePlugin};
use crate::storage::OnlineDdlStorage;
use ghostline_configs::OnlineDdlConfig;
use ghostline_store::{BackendConnector, RocksDbConnector, RocksDbInit};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Online schema change tool used upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnlineDdlScheme {
    /// Percona pt-online-schema-change
    Pt,
    /// GitHub gh-ost
    GhOst,
}

impl OnlineDdlScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnlineDdlScheme::Pt => "pt",
            OnlineDdlScheme::GhOst => "gh-ost",
        }
    }

    pub fn all() -> [OnlineDdlScheme; 2] {
        [OnlineDdlScheme::Pt, OnlineDdlScheme::GhOst]
    }
}

impl fmt::Display for OnlineDdlScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnlineDdlScheme {
    type Err = OnlineDdlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pt" => Ok(OnlineDdlScheme::Pt),
            "gh-ost" => Ok(OnlineDdlScheme::GhOst),
            _ => Err(OnlineDdlError::UnknownScheme(s.to_string())),
        }
    }
}

/// Build the plugin of `scheme` and load its recorded ghost tables.
pub fn new_online_plugin(
    scheme: OnlineDdlScheme,
    config: &OnlineDdlConfig,
    connector: Arc<dyn BackendConnector>,
    detector: Arc<dyn GhostTableDetector>,
) -> Result<Box<dyn OnlinePlugin>> {
    let storage = OnlineDdlStorage::new(config, connector);
    storage.init()?;

    log::info!(
        "{} online ddl plugin ready: task={}, source={}, recorded ghost tables={}",
        scheme,
        config.task.name,
        config.task.source_id,
        storage.len()
    );
    Ok(Box::new(RealOnlinePlugin::new(scheme, storage, detector)))
}

/// Build the plugin configured for the task, or `None` when online DDL
/// tracking is disabled.
pub fn plugin_from_config(
    config: &OnlineDdlConfig,
    connector: Arc<dyn BackendConnector>,
    detector: Arc<dyn GhostTableDetector>,
) -> Result<Option<Box<dyn OnlinePlugin>>> {
    let Some(name) = config.task.online_ddl_scheme.as_deref() else {
        return Ok(None);
    };
    let scheme: OnlineDdlScheme = name.parse()?;
    new_online_plugin(scheme, config, connector, detector).map(Some)
}

/// Connector over the RocksDB database configured in `[storage]`.
pub fn rocksdb_connector(config: &OnlineDdlConfig) -> Arc<dyn BackendConnector> {
    let init = RocksDbInit::new(config.storage.rocksdb_dir(), config.storage.rocksdb.clone())
        .with_partitions([config.online_ddl_partition()]);
    Arc::new(RocksDbConnector::new(init))
}
