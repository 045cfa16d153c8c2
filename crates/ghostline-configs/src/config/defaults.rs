// Default value functions

pub fn default_true() -> bool {
    true
}

pub fn default_meta_schema() -> String {
    "dm_meta".to_string()
}

pub fn default_data_path() -> String {
    "./data".to_string() // Relative to the working directory
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}

pub fn default_logs_path() -> String {
    "./logs".to_string()
}

pub fn default_rocksdb_write_buffer_size() -> usize {
    2 * 1024 * 1024 // 2MB, the metadata partition is small
}

pub fn default_rocksdb_max_write_buffers() -> i32 {
    2
}

pub fn default_rocksdb_block_cache_size() -> usize {
    4 * 1024 * 1024 // 4MB, shared across all column families
}

pub fn default_rocksdb_max_background_jobs() -> i32 {
    2
}

pub fn default_rocksdb_max_open_files() -> i32 {
    256
}

pub fn default_rocksdb_sync_writes() -> bool {
    true // checkpoints must survive a crash
}
