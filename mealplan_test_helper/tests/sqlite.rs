//! Integration tests for the store setup helpers

use mealplan_core::migrations::{detect_schema_version, MEALS_TABLE};
use mealplan_core::{ConnectionMethods, SchemaVersion};
use mealplan_test_helper::{
    create_legacy_store, file_setup, file_teardown, legacy_row, memory_connection,
    memory_connspec, setup_store, Connection, FileTestInstance, MemoryTestInstance, SetupData,
    StoreTestInstance,
};
use pretty_assertions::assert_eq;

/// Test that a memory connection starts without any tables
#[test]
fn memory_connection_is_empty() {
    let conn = memory_connection();
    assert!(!conn.has_table(MEALS_TABLE).unwrap());
}

#[test]
fn connspec_is_memory() {
    let connspec = memory_connspec();
    assert_eq!(connspec.connection_string(), ":memory:");
    assert!(connspec.is_memory());
}

/// Each memory connection has its own store
#[test]
fn memory_connections_are_independent() {
    let conn1 = memory_connection();
    let conn2 = memory_connection();
    setup_store(&conn1);
    assert!(conn1.has_table(MEALS_TABLE).unwrap());
    assert!(!conn2.has_table(MEALS_TABLE).unwrap());
}

#[test]
fn file_setup_teardown() {
    let setup_data = file_setup();
    let dir = setup_data.dir();
    assert!(setup_data.connection_string().ends_with("meals.db"));
    {
        let conn = Connection::open(setup_data.connection_string()).unwrap();
        setup_store(&conn);
    }
    assert!(dir.join("meals.db").exists());
    file_teardown(setup_data);
    assert!(!dir.exists());
}

#[test]
fn legacy_store_builder() {
    let conn = memory_connection();
    create_legacy_store(&conn, &[legacy_row("2024-01-01", "egg", "", "", "", "")]);
    assert!(matches!(
        detect_schema_version(&conn).unwrap(),
        SchemaVersion::Legacy { .. }
    ));
}

#[test]
fn instances_honor_migrate_flag() {
    MemoryTestInstance::run_test(
        |conn| assert!(conn.has_table(MEALS_TABLE).unwrap()),
        true,
    );
    MemoryTestInstance::run_test(
        |conn| assert!(!conn.has_table(MEALS_TABLE).unwrap()),
        false,
    );
    FileTestInstance::run_test(
        |conn| assert!(conn.has_table(MEALS_TABLE).unwrap()),
        true,
    );
    FileTestInstance::run_test(
        |conn| assert!(!conn.has_table(MEALS_TABLE).unwrap()),
        false,
    );
}
