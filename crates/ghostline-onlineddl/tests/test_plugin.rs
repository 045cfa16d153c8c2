//! Integration tests for the online-DDL plugin state machine.

mod common;

use common::*;
use ghostline_onlineddl::{
    new_online_plugin, plugin_from_config, ApplyOutcome, OnlineDdlError, OnlineDdlScheme,
    OnlinePlugin, SourceTable, StatementKind, TableType,
};
use ghostline_store::test_utils::InMemoryConnector;
use std::collections::HashMap;
use std::sync::Arc;

fn gh_ost_plugin() -> (Box<dyn OnlinePlugin>, Arc<InMemoryConnector>) {
    let connector = Arc::new(InMemoryConnector::in_memory());
    let plugin = new_online_plugin(
        OnlineDdlScheme::GhOst,
        &test_config(SOURCE_ID),
        connector.clone(),
        Arc::new(SuffixDetector),
    )
    .unwrap();
    (plugin, connector)
}

fn table(name: &str) -> SourceTable {
    SourceTable::new("db", name)
}

fn rename(from: &str, to: &str) -> Vec<SourceTable> {
    vec![table(from), table(to)]
}

#[test]
fn test_empty_tables_rejected() {
    let (plugin, _) = gh_ost_plugin();
    let err = plugin.apply(&[], "ALTER TABLE t", StatementKind::Other).unwrap_err();
    assert!(matches!(err, OnlineDdlError::EmptyTables));
}

#[test]
fn test_real_table_statements_pass_through() {
    let (plugin, _) = gh_ost_plugin();
    let stmt = "ALTER TABLE `db`.`orders` ADD COLUMN c INT";

    let outcome = plugin
        .apply(&[table("orders")], stmt, StatementKind::Other)
        .unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome {
            statements: vec![stmt.to_string()],
            schema: "db".to_string(),
            table: "orders".to_string(),
        }
    );

    let stmt = "RENAME TABLE `db`.`orders` TO `db`.`orders_v2`";
    let outcome = plugin
        .apply(&rename("orders", "orders_v2"), stmt, StatementKind::RenameTable)
        .unwrap();
    assert_eq!(outcome.statements, vec![stmt]);
}

#[test]
fn test_real_table_renamed_to_trash_is_ignored() {
    let (plugin, _) = gh_ost_plugin();
    let outcome = plugin
        .apply(
            &rename("orders", "_orders_del"),
            "RENAME TABLE orders TO _orders_del",
            StatementKind::RenameTable,
        )
        .unwrap();
    assert_eq!(outcome, ApplyOutcome::default());
}

#[test]
fn test_rename_to_ghost_table_rejected() {
    let (plugin, _) = gh_ost_plugin();

    let err = plugin
        .apply(
            &rename("orders", "_orders_gho"),
            "RENAME TABLE orders TO _orders_gho",
            StatementKind::RenameTable,
        )
        .unwrap_err();
    assert!(matches!(err, OnlineDdlError::RenameToGhostTable { ref table, .. } if table == "_orders_gho"));

    let err = plugin
        .apply(
            &rename("_orders_del", "_orders_gho"),
            "RENAME TABLE _orders_del TO _orders_gho",
            StatementKind::RenameTable,
        )
        .unwrap_err();
    assert!(matches!(err, OnlineDdlError::RenameToGhostTable { .. }));
}

#[test]
fn test_trash_table_statements_ignored() {
    let (plugin, connector) = gh_ost_plugin();
    let outcome = plugin
        .apply(
            &[table("_orders_ghc")],
            "CREATE TABLE _orders_ghc (id INT)",
            StatementKind::CreateTable,
        )
        .unwrap();

    assert!(outcome.statements.is_empty());
    assert_eq!((outcome.schema.as_str(), outcome.table.as_str()), ("db", "_orders_ghc"));
    assert!(stored_rows(connector.backend().as_ref()).is_empty());
}

#[test]
fn test_rename_requires_two_tables() {
    let (plugin, _) = gh_ost_plugin();
    let tables = vec![table("orders"), table("a"), table("b")];
    let err = plugin
        .apply(&tables, "RENAME TABLE ...", StatementKind::RenameTable)
        .unwrap_err();
    assert!(matches!(err, OnlineDdlError::InvalidRenameTables(3)));

    let err = plugin
        .apply(&[table("_orders_gho")], "RENAME TABLE ...", StatementKind::RenameTable)
        .unwrap_err();
    assert!(matches!(err, OnlineDdlError::InvalidRenameTables(1)));
}

#[test]
fn test_gh_ost_full_cycle() {
    let (plugin, connector) = gh_ost_plugin();
    let ghost = [table("_orders_gho")];
    let add_c = "ALTER TABLE `db`.`_orders_gho` ADD COLUMN c INT";
    let add_idx = "ALTER TABLE `db`.`_orders_gho` ADD INDEX idx_c (c)";

    let outcome = plugin
        .apply(&ghost, "CREATE TABLE `_orders_gho` LIKE `orders`", StatementKind::CreateTable)
        .unwrap();
    assert!(outcome.statements.is_empty());

    for ddl in [add_c, add_idx, add_idx] {
        let outcome = plugin.apply(&ghost, ddl, StatementKind::Other).unwrap();
        assert!(outcome.statements.is_empty());
        assert_eq!(outcome.table, "_orders_gho");
    }
    assert_eq!(stored_rows(connector.backend().as_ref()).len(), 1);

    // orders -> _orders_del is ignored, _orders_gho -> orders replays the ddls
    plugin
        .apply(
            &rename("orders", "_orders_del"),
            "RENAME TABLE orders TO _orders_del",
            StatementKind::RenameTable,
        )
        .unwrap();
    let outcome = plugin
        .apply(
            &rename("_orders_gho", "orders"),
            "RENAME TABLE _orders_gho TO orders",
            StatementKind::RenameTable,
        )
        .unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome {
            statements: vec![add_c.to_string(), add_idx.to_string()],
            schema: "db".to_string(),
            table: "orders".to_string(),
        }
    );

    plugin.finish("db", "_orders_gho").unwrap();
    assert!(stored_rows(connector.backend().as_ref()).is_empty());

    // the swap is not replayable once finished
    let err = plugin
        .apply(
            &rename("_orders_gho", "orders"),
            "RENAME TABLE _orders_gho TO orders",
            StatementKind::RenameTable,
        )
        .unwrap_err();
    assert!(matches!(err, OnlineDdlError::GhostDdlsNotFound { .. }));
}

#[test]
fn test_ghost_record_uses_real_name() {
    let (plugin, connector) = gh_ost_plugin();
    plugin
        .apply(&[table("_orders_new")], "ALTER TABLE _orders_new ADD c INT", StatementKind::Other)
        .unwrap();

    let rows = stored_rows(connector.backend().as_ref());
    assert_eq!(rows[0].ghost_table, "_orders_new");
    assert!(rows[0].ddls.contains(r#""table":"orders""#));
}

#[test]
fn test_ghost_drop_and_trash_rename_delete_record() {
    let (plugin, connector) = gh_ost_plugin();
    let ghost = [table("_orders_gho")];

    plugin.apply(&ghost, "ALTER 1", StatementKind::Other).unwrap();
    plugin
        .apply(&ghost, "DROP TABLE _orders_gho", StatementKind::DropTable)
        .unwrap();
    assert!(stored_rows(connector.backend().as_ref()).is_empty());

    plugin.apply(&ghost, "ALTER 2", StatementKind::Other).unwrap();
    let outcome = plugin
        .apply(
            &rename("_orders_gho", "_orders_del"),
            "RENAME TABLE _orders_gho TO _orders_del",
            StatementKind::RenameTable,
        )
        .unwrap();
    assert!(outcome.statements.is_empty());
    assert!(stored_rows(connector.backend().as_ref()).is_empty());
}

#[test]
fn test_ghost_renamed_to_other_ghost_rejected() {
    let (plugin, _) = gh_ost_plugin();
    let err = plugin
        .apply(
            &rename("_orders_gho", "_orders_new"),
            "RENAME TABLE _orders_gho TO _orders_new",
            StatementKind::RenameTable,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        OnlineDdlError::RenameGhostTableToOther { ref target, .. } if target == "_orders_new"
    ));
}

#[test]
fn test_detector_passthrough() {
    let (plugin, _) = gh_ost_plugin();
    assert_eq!(plugin.table_type("_orders_gho"), TableType::Ghost);
    assert_eq!(plugin.table_type("_orders_del"), TableType::Trash);
    assert_eq!(plugin.table_type("orders"), TableType::Real);
    assert_eq!(plugin.real_name("_orders_gho"), "orders");
}

#[test]
fn test_plugin_reconcile_clear_and_reconnect() {
    let (plugin, connector) = gh_ost_plugin();
    plugin
        .apply(&[SourceTable::new("DB", "_Orders_gho")], "ALTER 1", StatementKind::Other)
        .unwrap();

    let schema_map = HashMap::from([("DB".to_string(), "db".to_string())]);
    let table_map = HashMap::from([(
        "DB".to_string(),
        HashMap::from([("_Orders_gho".to_string(), "_orders_gho".to_string())]),
    )]);
    plugin.check_and_update(&schema_map, &table_map).unwrap();

    let rows = stored_rows(connector.backend().as_ref());
    assert_eq!((rows[0].ghost_schema.as_str(), rows[0].ghost_table.as_str()), ("db", "_orders_gho"));
    assert!(rows[0].ddls.contains(r#""table":"orders""#));

    plugin.close();
    assert!(plugin.apply(&[table("_x_gho")], "ALTER 2", StatementKind::Other).is_err());
    plugin.reset_conn().unwrap();

    plugin.clear().unwrap();
    assert!(stored_rows(connector.backend().as_ref()).is_empty());
}

#[test]
fn test_plugin_from_config() {
    let connector = Arc::new(InMemoryConnector::in_memory());

    let config = test_config(SOURCE_ID);
    let plugin = plugin_from_config(&config, connector.clone(), Arc::new(SuffixDetector)).unwrap();
    assert!(plugin.is_none());
    assert_eq!(connector.connects(), 0);

    let mut config = test_config(SOURCE_ID);
    config.task.online_ddl_scheme = Some("pt".to_string());
    let plugin = plugin_from_config(&config, connector.clone(), Arc::new(SuffixDetector)).unwrap();
    assert!(plugin.is_some());

    config.task.online_ddl_scheme = Some("osc".to_string());
    let err = plugin_from_config(&config, connector, Arc::new(SuffixDetector))
        .err()
        .unwrap();
    assert!(matches!(err, OnlineDdlError::UnknownScheme(_)));
}

#[test]
fn test_plugin_loads_recorded_tables() {
    let (plugin, connector) = gh_ost_plugin();
    plugin
        .apply(&[table("_orders_gho")], "ALTER 1", StatementKind::Other)
        .unwrap();
    plugin.close();

    let plugin = new_online_plugin(
        OnlineDdlScheme::Pt,
        &test_config(SOURCE_ID),
        connector,
        Arc::new(SuffixDetector),
    )
    .unwrap();
    let outcome = plugin
        .apply(&rename("_orders_gho", "orders"), "RENAME", StatementKind::RenameTable)
        .unwrap();
    assert_eq!(outcome.statements, vec!["ALTER 1"]);
}
