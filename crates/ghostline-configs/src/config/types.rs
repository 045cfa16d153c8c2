use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Suffix of the per-task online-DDL metadata table.
pub const ONLINE_DDL_TABLE_SUFFIX: &str = "_onlineddl";

/// Top-level configuration of one replication task's online-DDL tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineDdlConfig {
    pub task: TaskSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl OnlineDdlConfig {
    /// Configuration with default storage/logging for the given task and source.
    pub fn new(task_name: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            task: TaskSettings {
                name: task_name.into(),
                source_id: source_id.into(),
                meta_schema: default_meta_schema(),
                online_ddl_scheme: None,
            },
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }

    /// Name of the partition holding this task's online-DDL rows:
    /// `{meta_schema}.{task}_onlineddl`.
    pub fn online_ddl_partition(&self) -> String {
        format!(
            "{}.{}{}",
            self.task.meta_schema, self.task.name, ONLINE_DDL_TABLE_SUFFIX
        )
    }
}

/// Task identity and online-DDL tool selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSettings {
    /// Task name, part of the metadata table name
    pub name: String,
    /// Source ID of the upstream MySQL/MariaDB replica; scopes every row
    pub source_id: String,
    /// Schema holding replication metadata (default: "dm_meta")
    #[serde(default = "default_meta_schema")]
    pub meta_schema: String,
    /// Online-DDL tool in use upstream: "pt" or "gh-ost" (None disables tracking)
    #[serde(default)]
    pub online_ddl_scheme: Option<String>,
}

/// Durable storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Base data directory (default: "./data")
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default)]
    pub rocksdb: RocksDbSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            rocksdb: RocksDbSettings::default(),
        }
    }
}

impl StorageSettings {
    /// Get RocksDB directory path (data_path/rocksdb)
    pub fn rocksdb_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_path).join("rocksdb")
    }
}

/// RocksDB-specific settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RocksDbSettings {
    /// Write buffer size per column family in bytes
    #[serde(default = "default_rocksdb_write_buffer_size")]
    pub write_buffer_size: usize,

    /// Maximum number of write buffers
    #[serde(default = "default_rocksdb_max_write_buffers")]
    pub max_write_buffers: i32,

    /// Block cache size in bytes, shared by all column families
    #[serde(default = "default_rocksdb_block_cache_size")]
    pub block_cache_size: usize,

    #[serde(default = "default_rocksdb_max_background_jobs")]
    pub max_background_jobs: i32,

    /// Set to -1 for unlimited.
    #[serde(default = "default_rocksdb_max_open_files")]
    pub max_open_files: i32,

    /// Sync the WAL on each write (default: true)
    #[serde(default = "default_rocksdb_sync_writes")]
    pub sync_writes: bool,
}

impl Default for RocksDbSettings {
    fn default() -> Self {
        Self {
            write_buffer_size: default_rocksdb_write_buffer_size(),
            max_write_buffers: default_rocksdb_max_write_buffers(),
            block_cache_size: default_rocksdb_block_cache_size(),
            max_background_jobs: default_rocksdb_max_background_jobs(),
            max_open_files: default_rocksdb_max_open_files(),
            sync_writes: default_rocksdb_sync_writes(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for log files (default: "./logs")
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Optional per-target log level overrides:
    /// [logging.targets]
    /// ghostline_onlineddl = "debug"
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            logs_path: default_logs_path(),
            log_to_console: true,
            format: default_log_format(),
            targets: HashMap::new(),
        }
    }
}

impl LoggingSettings {
    /// Path of the main log file (logs_path/ghostline.log)
    pub fn log_file(&self) -> PathBuf {
        PathBuf::from(&self.logs_path).join("ghostline.log")
    }
}
