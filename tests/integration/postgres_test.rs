//! PostgreSQL-backed connection tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

use dbconn::connection::{Connection, QueryState};
use dbconn::db::{PostgresExecutor, Value};

/// Helper to create a connection pointed at the test database.
fn get_test_connection() -> Option<Connection<PostgresExecutor>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let mut connection = Connection::new(PostgresExecutor::new().ok()?);
    connection.set_connection_descriptor(url);
    Some(connection)
}

#[test]
fn test_execute_simple_select() {
    let Some(mut connection) = get_test_connection() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = connection
        .execute("SELECT 1 AS num, 'hello' AS greeting", &[])
        .unwrap();

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.columns[1].name, "greeting");
    assert_eq!(result.rows.len(), 1);
    assert!(connection.executor().is_connected());

    connection.close();
    assert!(!connection.executor().is_connected());
}

#[test]
fn test_multi_statement_keeps_earlier_sets() {
    let Some(mut connection) = get_test_connection() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let last = connection
        .execute("SELECT 1 AS first; SELECT 2 AS second", &[])
        .unwrap();

    assert_eq!(last.columns[0].name, "second");
    assert_eq!(connection.result_sets().len(), 1);
    assert_eq!(connection.result_sets()[0].columns[0].name, "first");

    connection.close();
}

#[test]
fn test_bound_parameters() {
    let Some(mut connection) = get_test_connection() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = connection
        .execute("SELECT $1::int8 * 2 AS doubled", &[Value::Int(21)])
        .unwrap();

    assert_eq!(result.rows[0][0], Value::Int(42));
    connection.close();
}

#[test]
fn test_failed_query_returns_none() {
    let Some(mut connection) = get_test_connection() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    assert!(connection
        .execute("SELECT * FROM nonexistent_table_xyz", &[])
        .is_none());
    assert_eq!(connection.query_state(), QueryState::Inactive);
    assert!(connection.elapsed().ends_with(" sec"));

    connection.close();
}

#[test]
fn test_unreachable_server_returns_none() {
    let mut connection = Connection::new(PostgresExecutor::new().unwrap());
    connection.set_connection_descriptor("postgres://user@nonexistent.invalid.host:5432/db");

    assert!(connection.execute("SELECT 1", &[]).is_none());
    assert_eq!(connection.query_state(), QueryState::Inactive);
}

#[test]
fn test_missing_descriptor_returns_none() {
    let mut connection = Connection::new(PostgresExecutor::new().unwrap());

    assert!(connection.execute("SELECT 1", &[]).is_none());
    assert!(!connection.executor().is_connected());
}
