use super::types::OnlineDdlConfig;
use std::fs;
use std::path::Path;

/// Online-DDL tools understood by the metadata store.
pub const VALID_ONLINE_DDL_SCHEMES: [&str; 2] = ["pt", "gh-ost"];

/// Upper bound of a source ID, the width of the `id` column.
pub const MAX_SOURCE_ID_LEN: usize = 32;

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const VALID_LOG_FORMATS: [&str; 2] = ["compact", "json"];

impl OnlineDdlConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    /// Parse and finalize configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: OnlineDdlConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.finalize()?;

        Ok(config)
    }

    /// Normalize values and validate configuration.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        self.task.name = self.task.name.trim().to_string();
        self.task.source_id = self.task.source_id.trim().to_string();
        self.task.meta_schema = self.task.meta_schema.trim().to_string();
        if let Some(scheme) = self.task.online_ddl_scheme.as_mut() {
            *scheme = scheme.trim().to_lowercase();
        }
        self.logging.level = self.logging.level.to_lowercase();
        self.logging.format = self.logging.format.to_lowercase();

        self.validate()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.task.name.is_empty() {
            return Err(anyhow::anyhow!("task.name cannot be empty"));
        }

        if self.task.meta_schema.is_empty() {
            return Err(anyhow::anyhow!("task.meta_schema cannot be empty"));
        }

        if self.task.source_id.is_empty() {
            return Err(anyhow::anyhow!("task.source_id cannot be empty"));
        }
        if self.task.source_id.len() > MAX_SOURCE_ID_LEN {
            return Err(anyhow::anyhow!(
                "task.source_id '{}' exceeds {} characters",
                self.task.source_id,
                MAX_SOURCE_ID_LEN
            ));
        }

        if let Some(scheme) = &self.task.online_ddl_scheme {
            if !VALID_ONLINE_DDL_SCHEMES.contains(&scheme.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid online_ddl_scheme '{}'. Must be one of: {}",
                    scheme,
                    VALID_ONLINE_DDL_SCHEMES.join(", ")
                ));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                VALID_LOG_FORMATS.join(", ")
            ));
        }

        for (target, level) in &self.logging.targets {
            if !VALID_LOG_LEVELS.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}' for target '{}'. Must be one of: {}",
                    level,
                    target,
                    VALID_LOG_LEVELS.join(", ")
                ));
            }
        }

        let rocksdb = &self.storage.rocksdb;
        if rocksdb.write_buffer_size == 0 {
            return Err(anyhow::anyhow!("storage.rocksdb.write_buffer_size cannot be 0"));
        }
        if rocksdb.max_write_buffers < 1 {
            return Err(anyhow::anyhow!("storage.rocksdb.max_write_buffers must be >= 1"));
        }
        if rocksdb.max_background_jobs < 1 {
            return Err(anyhow::anyhow!("storage.rocksdb.max_background_jobs must be >= 1"));
        }

        Ok(())
    }
}
