//! Re-keying of recorded ghost tables after routing changes.
//!
//! When schema or table names are normalized after records were written
//! (for example a case-sensitivity fix), every affected record moves to its
//! new key. All new rows are written in one batch before old rows are
//! deleted, and the cache only changes once the durable store holds every
//! new row. A rerun after a crash between the two steps finds the earlier
//! copies already at their targets and overwrites them.

use super::{GhostTables, OnlineDdlStorage};
use crate::error::{OnlineDdlError, Result};
use crate::models::GhostDdlInfo;
use ghostline_store::key_encoding::row_key;
use ghostline_store::Operation;
use std::collections::{HashMap, HashSet};

/// One record moving from its old key to a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Migration {
    old_schema: String,
    old_table: String,
    new_schema: String,
    new_table: String,
    info: GhostDdlInfo,
}

impl Migration {
    fn old_key(&self) -> (&str, &str) {
        (&self.old_schema, &self.old_table)
    }

    fn new_key(&self) -> (&str, &str) {
        (&self.new_schema, &self.new_table)
    }
}

impl OnlineDdlStorage {
    /// Move records whose ghost schema or table was renamed.
    ///
    /// `schema_map` maps an old ghost schema to its new name; every table
    /// under a mapped schema moves. `table_map` maps old ghost schema to
    /// (old ghost table => new table). Moved records get
    /// `table = real_name(new table)`.
    pub fn check_and_update<F>(
        &self,
        schema_map: &HashMap<String, String>,
        table_map: &HashMap<String, HashMap<String, String>>,
        real_name: F,
    ) -> Result<()>
    where
        F: Fn(&str) -> String,
    {
        let mut state = self.state.write();

        let migrations = plan_migrations(&state.ddls, schema_map, table_map, &real_name);
        if migrations.is_empty() {
            return Ok(());
        }
        check_conflicts(&state.ddls, &migrations)?;

        let conn = state.connection()?;
        let mut puts = Vec::with_capacity(migrations.len());
        for m in &migrations {
            puts.push(Operation::Put {
                partition: self.partition.clone(),
                key: row_key(&self.source_id, &m.new_schema, &m.new_table),
                value: self.encode_row(&m.new_schema, &m.new_table, &m.info)?,
            });
        }
        // a target may be another record's old row, so no put lands alone
        conn.batch(puts)?;

        let new_keys: HashSet<(&str, &str)> = migrations.iter().map(Migration::new_key).collect();
        for m in &migrations {
            if new_keys.contains(&m.old_key()) {
                continue;
            }
            conn.delete(
                &self.partition,
                &row_key(&self.source_id, &m.old_schema, &m.old_table),
            )?;
        }

        for m in &migrations {
            log::info!(
                "online ddl meta moved: {}.{} -> {}.{}, real table={}",
                m.old_schema,
                m.old_table,
                m.new_schema,
                m.new_table,
                m.info.table
            );
        }
        apply_to_cache(&mut state.ddls, migrations);
        Ok(())
    }
}

fn plan_migrations<F>(
    ddls: &HashMap<String, GhostTables>,
    schema_map: &HashMap<String, String>,
    table_map: &HashMap<String, HashMap<String, String>>,
    real_name: &F,
) -> Vec<Migration>
where
    F: Fn(&str) -> String,
{
    let mut migrations = Vec::new();

    for (schema, tables) in ddls {
        let schema_target = schema_map.get(schema);
        let table_targets = table_map.get(schema);

        for (table, info) in tables {
            let table_target = table_targets.and_then(|targets| targets.get(table));
            if schema_target.is_none() && table_target.is_none() {
                continue;
            }

            let new_schema = schema_target.unwrap_or(schema).clone();
            let new_table = table_target.unwrap_or(table).clone();

            let mut info = info.clone();
            info.table = real_name(&new_table);

            migrations.push(Migration {
                old_schema: schema.clone(),
                old_table: table.clone(),
                new_schema,
                new_table,
                info,
            });
        }
    }

    migrations.sort_by(|a, b| a.old_key().cmp(&b.old_key()));
    migrations
}

fn check_conflicts(ddls: &HashMap<String, GhostTables>, migrations: &[Migration]) -> Result<()> {
    let moving: HashSet<(&str, &str)> = migrations.iter().map(Migration::old_key).collect();
    let mut targets: HashMap<(&str, &str), (&str, &str)> = HashMap::new();

    for m in migrations {
        if let Some(other) = targets.insert(m.new_key(), m.old_key()) {
            return Err(OnlineDdlError::ReconcileConflict(format!(
                "{}.{} and {}.{} both map to {}.{}",
                other.0, other.1, m.old_schema, m.old_table, m.new_schema, m.new_table
            )));
        }

        // same history at the target is a copy left by an interrupted run
        let occupied_by_other = ddls
            .get(&m.new_schema)
            .and_then(|tables| tables.get(&m.new_table))
            .is_some_and(|existing| existing.ddls != m.info.ddls);
        if occupied_by_other && !moving.contains(&m.new_key()) {
            return Err(OnlineDdlError::ReconcileConflict(format!(
                "{}.{} maps to {}.{} which is already recorded",
                m.old_schema, m.old_table, m.new_schema, m.new_table
            )));
        }
    }
    Ok(())
}

fn apply_to_cache(ddls: &mut HashMap<String, GhostTables>, migrations: Vec<Migration>) {
    for m in &migrations {
        if let Some(tables) = ddls.get_mut(&m.old_schema) {
            tables.remove(&m.old_table);
        }
    }
    for m in migrations {
        ddls.entry(m.new_schema).or_default().insert(m.new_table, m.info);
    }
    ddls.retain(|_, tables| !tables.is_empty());
}
