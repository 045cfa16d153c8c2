//! Online-DDL plugins: the replication-side view of the metadata store.
//!
//! A plugin sees every DDL the pipeline replicates. Statements on real tables
//! pass through; statements on ghost tables are recorded, and replayed
//! against the real table once the tool swaps the ghost table in.

use crate::error::{OnlineDdlError, Result};
use crate::models::{SourceTable, TableType};
use crate::scheme::OnlineDdlScheme;
use crate::storage::OnlineDdlStorage;
use std::collections::HashMap;
use std::sync::Arc;

/// Classifies table names produced by an online-DDL tool.
///
/// Implemented outside this crate, usually with the tool's naming rules
/// (`_t_new`/`_t_old` for pt-osc, `_t_gho`/`_t_ghc`/`_t_del` for gh-ost) and the
/// task's table router.
pub trait GhostTableDetector: Send + Sync {
    fn table_type(&self, table: &str) -> TableType;

    /// Real table name behind a ghost table, after routing.
    fn real_name(&self, table: &str) -> String;
}

/// Class of a replicated statement, as parsed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateTable,
    DropTable,
    RenameTable,
    Other,
}

/// What the pipeline should execute downstream for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Statements to execute; empty when the statement is absorbed
    pub statements: Vec<String>,
    /// Schema the statements apply to
    pub schema: String,
    /// Table the statements apply to
    pub table: String,
}

impl ApplyOutcome {
    fn pass(statement: &str, table: &SourceTable) -> Self {
        Self {
            statements: vec![statement.to_string()],
            schema: table.schema.clone(),
            table: table.name.clone(),
        }
    }

    fn absorbed(table: &SourceTable) -> Self {
        Self {
            statements: Vec::new(),
            schema: table.schema.clone(),
            table: table.name.clone(),
        }
    }

    fn ignored() -> Self {
        Self::default()
    }
}

/// Handles the online-DDL solution of one replication task.
pub trait OnlinePlugin: Send + Sync {
    /// Detect online DDL, record ghost-table changes, and return the
    /// statements to run for `statement`.
    ///
    /// `tables` are the tables referenced by the statement; a rename carries
    /// the source table followed by the target table.
    fn apply(
        &self,
        tables: &[SourceTable],
        statement: &str,
        kind: StatementKind,
    ) -> Result<ApplyOutcome>;

    /// Forget a ghost table once its DDLs were replayed.
    fn finish(&self, schema: &str, table: &str) -> Result<()>;

    fn table_type(&self, table: &str) -> TableType;

    fn real_name(&self, table: &str) -> String;

    fn reset_conn(&self) -> Result<()>;

    /// Delete every record of the source.
    fn clear(&self) -> Result<()>;

    fn close(&self);

    /// Re-key recorded ghost tables after schema/table routing changed.
    fn check_and_update(
        &self,
        schema_map: &HashMap<String, String>,
        table_map: &HashMap<String, HashMap<String, String>>,
    ) -> Result<()>;
}

/// Plugin backed by an [`OnlineDdlStorage`]. pt-osc and gh-ost only differ in
/// their detector.
pub struct RealOnlinePlugin {
    scheme: OnlineDdlScheme,
    storage: OnlineDdlStorage,
    detector: Arc<dyn GhostTableDetector>,
}

impl RealOnlinePlugin {
    /// Wrap an initialized storage.
    pub fn new(
        scheme: OnlineDdlScheme,
        storage: OnlineDdlStorage,
        detector: Arc<dyn GhostTableDetector>,
    ) -> Self {
        Self {
            scheme,
            storage,
            detector,
        }
    }

    pub fn scheme(&self) -> OnlineDdlScheme {
        self.scheme
    }

    pub fn storage(&self) -> &OnlineDdlStorage {
        &self.storage
    }

    fn rename_target(tables: &[SourceTable]) -> Result<&SourceTable> {
        match tables {
            [_, target] => Ok(target),
            _ => Err(OnlineDdlError::InvalidRenameTables(tables.len())),
        }
    }

    fn apply_real(
        &self,
        tables: &[SourceTable],
        statement: &str,
        kind: StatementKind,
    ) -> Result<ApplyOutcome> {
        let source = &tables[0];
        if kind != StatementKind::RenameTable {
            return Ok(ApplyOutcome::pass(statement, source));
        }

        let target = Self::rename_target(tables)?;
        match self.detector.table_type(&target.name) {
            // real table moved away to be dropped later by the tool
            TableType::Trash => Ok(ApplyOutcome::ignored()),
            TableType::Ghost => Err(OnlineDdlError::RenameToGhostTable {
                schema: target.schema.clone(),
                table: target.name.clone(),
            }),
            TableType::Real => Ok(ApplyOutcome::pass(statement, source)),
        }
    }

    fn apply_trash(&self, tables: &[SourceTable], kind: StatementKind) -> Result<ApplyOutcome> {
        let source = &tables[0];
        if kind == StatementKind::RenameTable {
            let target = Self::rename_target(tables)?;
            if self.detector.table_type(&target.name) == TableType::Ghost {
                return Err(OnlineDdlError::RenameToGhostTable {
                    schema: target.schema.clone(),
                    table: target.name.clone(),
                });
            }
        }
        Ok(ApplyOutcome::absorbed(source))
    }

    fn apply_ghost(
        &self,
        tables: &[SourceTable],
        statement: &str,
        kind: StatementKind,
    ) -> Result<ApplyOutcome> {
        let source = &tables[0];
        match kind {
            StatementKind::CreateTable | StatementKind::DropTable => {
                self.storage.delete(&source.schema, &source.name)?;
                Ok(ApplyOutcome::absorbed(source))
            }
            StatementKind::RenameTable => {
                let target = Self::rename_target(tables)?;
                match self.detector.table_type(&target.name) {
                    TableType::Real => {
                        let info = self.storage.get(&source.schema, &source.name).ok_or_else(
                            || OnlineDdlError::GhostDdlsNotFound {
                                schema: source.schema.clone(),
                                table: source.name.clone(),
                            },
                        )?;
                        log::info!(
                            "replay online ddls of {} on {}: count={}",
                            source,
                            target,
                            info.ddls.len()
                        );
                        Ok(ApplyOutcome {
                            statements: info.ddls,
                            schema: target.schema.clone(),
                            table: target.name.clone(),
                        })
                    }
                    TableType::Ghost => Err(OnlineDdlError::RenameGhostTableToOther {
                        schema: source.schema.clone(),
                        table: source.name.clone(),
                        target: target.name.clone(),
                    }),
                    TableType::Trash => {
                        self.storage.delete(&source.schema, &source.name)?;
                        Ok(ApplyOutcome::absorbed(source))
                    }
                }
            }
            StatementKind::Other => {
                let real_table = self.detector.real_name(&source.name);
                self.storage.save(
                    &source.schema,
                    &source.name,
                    &source.schema,
                    &real_table,
                    statement,
                )?;
                Ok(ApplyOutcome::absorbed(source))
            }
        }
    }
}

impl OnlinePlugin for RealOnlinePlugin {
    fn apply(
        &self,
        tables: &[SourceTable],
        statement: &str,
        kind: StatementKind,
    ) -> Result<ApplyOutcome> {
        let Some(source) = tables.first() else {
            return Err(OnlineDdlError::EmptyTables);
        };

        let table_type = self.detector.table_type(&source.name);
        log::debug!(
            "{} apply: table={}, type={}, kind={:?}",
            self.scheme,
            source,
            table_type,
            kind
        );

        match table_type {
            TableType::Real => self.apply_real(tables, statement, kind),
            TableType::Trash => self.apply_trash(tables, kind),
            TableType::Ghost => self.apply_ghost(tables, statement, kind),
        }
    }

    fn finish(&self, schema: &str, table: &str) -> Result<()> {
        self.storage.delete(schema, table)
    }

    fn table_type(&self, table: &str) -> TableType {
        self.detector.table_type(table)
    }

    fn real_name(&self, table: &str) -> String {
        self.detector.real_name(table)
    }

    fn reset_conn(&self) -> Result<()> {
        self.storage.reset_conn()
    }

    fn clear(&self) -> Result<()> {
        self.storage.clear()
    }

    fn close(&self) {
        self.storage.close()
    }

    fn check_and_update(
        &self,
        schema_map: &HashMap<String, String>,
        table_map: &HashMap<String, HashMap<String, String>>,
    ) -> Result<()> {
        let detector = Arc::clone(&self.detector);
        self.storage
            .check_and_update(schema_map, table_map, |table| detector.real_name(table))
    }
}
