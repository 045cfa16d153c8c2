//! RocksDB initialization utilities.
//!
//! Provides a thin helper to open a RocksDB instance with the configured
//! tuning and the required partitions (column families) present.

use crate::rocksdb_impl::RocksDb;
use crate::storage_trait::{Result, StorageError};
use ghostline_configs::RocksDbSettings;
use rocksdb::{BlockBasedOptions, Cache, ColumnFamilyDescriptor, Options};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// RocksDB initializer for creating/opening a database with required CFs.
#[derive(Debug, Clone)]
pub struct RocksDbInit {
    db_path: PathBuf,
    settings: RocksDbSettings,
    partitions: Vec<String>,
}

impl RocksDbInit {
    /// Create a new initializer for the given path with custom settings.
    pub fn new(db_path: impl Into<PathBuf>, settings: RocksDbSettings) -> Self {
        Self {
            db_path: db_path.into(),
            settings,
            partitions: Vec::new(),
        }
    }

    /// Create a new initializer with default settings.
    pub fn with_defaults(db_path: impl Into<PathBuf>) -> Self {
        Self::new(db_path, RocksDbSettings::default())
    }

    /// Column families that must exist once the database is open.
    pub fn with_partitions<I, S>(mut self, partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions.extend(partitions.into_iter().map(Into::into));
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn settings(&self) -> &RocksDbSettings {
        &self.settings
    }

    /// Open or create the RocksDB database and ensure required CFs exist.
    pub fn open(&self) -> Result<Arc<RocksDb>> {
        let path = self.db_path.as_path();
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::IoError(format!("create {}: {}", path.display(), e))
        })?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(self.settings.write_buffer_size);
        db_opts.set_max_write_buffer_number(self.settings.max_write_buffers);
        db_opts.set_max_background_jobs(self.settings.max_background_jobs);
        db_opts.set_max_open_files(self.settings.max_open_files);

        // Block cache is shared across all column families.
        let cache = Cache::new_lru_cache(self.settings.block_cache_size);
        db_opts.set_block_based_table_factory(&create_block_options_with_cache(&cache));

        // Previously created CFs must be listed or the open fails.
        let mut existing = match RocksDb::list_cf(&db_opts, path) {
            Ok(cfs) if !cfs.is_empty() => cfs,
            _ => vec!["default".to_string()],
        };
        for name in &self.partitions {
            if !existing.iter().any(|n| n == name) {
                existing.push(name.clone());
            }
        }

        let cf_descriptors: Vec<_> = existing
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_write_buffer_size(self.settings.write_buffer_size);
                cf_opts.set_max_write_buffer_number(self.settings.max_write_buffers);
                cf_opts.set_block_based_table_factory(&create_block_options_with_cache(&cache));
                ColumnFamilyDescriptor::new(name, cf_opts)
            })
            .collect();

        let db = RocksDb::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        log::debug!(
            "Opened RocksDB at {} with {} column families",
            path.display(),
            existing.len()
        );

        Ok(Arc::new(db))
    }
}

fn create_block_options_with_cache(cache: &Cache) -> BlockBasedOptions {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);
    block_opts
}
