//! # ghostline-onlineddl
//!
//! Tracks online schema changes (pt-online-schema-change, gh-ost) seen by a
//! replication task. DDLs executed upstream against a ghost table are
//! recorded per source, persisted in the downstream metadata store, and
//! replayed against the real table when the tool swaps the ghost table in.
//!
//! ## Architecture
//!
//! ```text
//! replication pipeline
//!     ↓  apply(tables, statement, kind)
//! OnlinePlugin (RealOnlinePlugin + GhostTableDetector)
//!     ↓  get / save / delete / check_and_update
//! OnlineDdlStorage (cache + `{meta_schema}.{task}_onlineddl` partition)
//!     ↓
//! ghostline-store (RocksDB / in-memory)
//! ```
//!
//! ## Row format
//!
//! Rows are keyed by `(source id, ghost schema, ghost table)` and hold a JSON
//! [`OnlineDdlRow`] whose `ddls` column is the serialized [`GhostDdlInfo`].

pub mod error;
pub mod logging;
pub mod models;
pub mod plugin;
pub mod scheme;
pub mod storage;

pub use error::{ErrorScope, OnlineDdlError, Result};
pub use models::{GhostDdlInfo, OnlineDdlRow, SourceTable, TableType};
pub use plugin::{ApplyOutcome, GhostTableDetector, OnlinePlugin, RealOnlinePlugin, StatementKind};
pub use scheme::{new_online_plugin, plugin_from_config, rocksdb_connector, OnlineDdlScheme};
pub use storage::OnlineDdlStorage;
