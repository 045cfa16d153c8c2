//! Online-DDL records and their durable row format.

use crate::error::{OnlineDdlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ghost table information and the DDLs recorded against it.
///
/// Serialized as the `ddls` column payload:
/// `{"schema": "...", "table": "...", "ddls": ["...", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostDdlInfo {
    /// Real schema targeted by the ghost table
    pub schema: String,
    /// Real table targeted by the ghost table
    pub table: String,
    #[serde(default)]
    pub ddls: Vec<String>,
}

impl GhostDdlInfo {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            ddls: Vec::new(),
        }
    }

    /// Most recently recorded DDL.
    pub fn last_ddl(&self) -> Option<&str> {
        self.ddls.last().map(String::as_str)
    }

    pub fn to_payload(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| OnlineDdlError::InvalidMeta(e.to_string()))
    }

    pub fn from_payload(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| OnlineDdlError::InvalidMeta(e.to_string()))
    }
}

/// One row of the online-DDL metadata table.
///
/// Unique on `(id, ghost_schema, ghost_table)`; the row key encodes the triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineDdlRow {
    /// Source ID of the upstream replica
    pub id: String,
    pub ghost_schema: String,
    pub ghost_table: String,
    /// Serialized [`GhostDdlInfo`]
    pub ddls: String,
    /// Milliseconds since epoch of the last write
    pub update_time: i64,
}

/// Classification of a table name by an online-DDL detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableType {
    Real,
    Ghost,
    /// Leftover of an online-DDL run; statements on it are ignored
    Trash,
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableType::Real => write!(f, "real table"),
            TableType::Ghost => write!(f, "ghost table"),
            TableType::Trash => write!(f, "trash table"),
        }
    }
}

/// A schema-qualified table referenced by a replicated statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceTable {
    pub schema: String,
    pub name: String,
}

impl SourceTable {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`.`{}`", self.schema, self.name)
    }
}
