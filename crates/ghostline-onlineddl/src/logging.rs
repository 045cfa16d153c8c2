// Logging setup for processes embedding the online-DDL store.
//
// Library code logs through the `log` facade. `init_logging` installs a
// tracing-subscriber registry and bridges `log` records into it with
// `tracing_log::LogTracer`.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::sync::Arc;

use ghostline_configs::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text format: timestamp LEVEL target - message
    Compact,
    /// JSON Lines format for structured logging
    Json,
}

impl LogFormat {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Build the `EnvFilter` from the base level, noisy-crate overrides and the
/// per-target overrides from config.
pub fn build_env_filter(
    level: &str,
    target_levels: &HashMap<String, String>,
) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    // RocksDB logs compaction chatter at info
    let noisy: &[(&str, &str)] = &[("rocksdb", "warn"), ("tracing", "warn")];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let mut targets: Vec<_> = target_levels.iter().collect();
    targets.sort();
    for (target, lvl) in targets {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Initialize logging from the `[logging]` section.
///
/// Installs an optional console layer and a file layer (compact text or
/// JSON lines) at `logs_path/ghostline.log`. Fails if a global subscriber
/// is already set.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let log_format = LogFormat::from_name(&settings.format);
    let file_path = settings.log_file();

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = Arc::new(OpenOptions::new().create(true).append(true).open(&file_path)?);

    // Bridge `log` crate → tracing; ok() in case already initialized
    tracing_log::LogTracer::init().ok();

    let console_layer = if settings.log_to_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(true)
                .with_thread_names(true)
                .with_filter(build_env_filter(&settings.level, &settings.targets)?),
        )
    } else {
        None
    };

    let file_layer = if log_format == LogFormat::Json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(log_file)
            .with_target(true)
            .with_thread_names(true)
            .with_filter(build_env_filter(&settings.level, &settings.targets)?)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(log_file)
            .with_target(true)
            .with_thread_names(true)
            .with_filter(build_env_filter(&settings.level, &settings.targets)?)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    tracing::trace!(
        "Logging initialized: level={}, console={}, file={}",
        settings.level,
        settings.log_to_console,
        file_path.display()
    );

    Ok(())
}

/// Initialize simple console logging, for tools and tests.
pub fn init_simple_logging() -> anyhow::Result<()> {
    tracing_log::LogTracer::init().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_names() {
        assert_eq!(LogFormat::from_name("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("jsonl"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_name("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_env_filter_with_targets() {
        let targets = HashMap::from([("ghostline_store".to_string(), "debug".to_string())]);
        let filter = build_env_filter("info", &targets).unwrap();

        let rendered = filter.to_string().to_lowercase();
        assert!(rendered.contains("rocksdb=warn"));
        assert!(rendered.contains("ghostline_store=debug"));
    }

    #[test]
    fn test_env_filter_rejects_bad_level() {
        let targets = HashMap::from([("ghostline_store".to_string(), "loud".to_string())]);
        assert!(build_env_filter("info", &targets).is_err());
    }

    #[test]
    fn test_init_logging_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggingSettings {
            logs_path: dir.path().join("logs").to_string_lossy().into_owned(),
            log_to_console: false,
            ..LoggingSettings::default()
        };

        init_logging(&settings).unwrap();
        log::info!("online ddl logging test");
        assert!(settings.log_file().exists());
    }
}
