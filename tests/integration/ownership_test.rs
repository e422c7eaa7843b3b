//! Result set ownership tests.
//!
//! Checks which sets leave the connection and which stay behind across
//! executions and closes.

use dbconn::connection::Connection;
use dbconn::db::{ColumnInfo, MockExecutor, MockResponse, ResultSet, Value};
use pretty_assertions::assert_eq;

fn named(name: &str) -> ResultSet {
    ResultSet::with_data(
        vec![ColumnInfo::new("name", "TEXT")],
        vec![vec![Value::from(name)]],
    )
}

fn scripted(responses: impl IntoIterator<Item = MockResponse>) -> Connection<MockExecutor> {
    Connection::new(MockExecutor::with_responses(responses))
}

#[test]
fn test_only_last_set_leaves_the_connection() {
    let mut connection = scripted([MockResponse::Success(vec![named("a"), named("b")])]);

    let returned = connection.execute("SELECT 'a'; SELECT 'b'", &[]);

    assert_eq!(returned, Some(named("b")));
    assert_eq!(connection.result_sets(), &[named("a")]);
}

#[test]
fn test_next_execution_clears_retained_sets() {
    let mut connection = scripted([
        MockResponse::Success(vec![named("a"), named("b")]),
        MockResponse::Success(vec![named("c")]),
    ]);

    let first = connection.execute("SELECT 'a'; SELECT 'b'", &[]);
    let second = connection.execute("SELECT 'c'", &[]);

    // The first result is still the caller's to keep
    assert_eq!(first, Some(named("b")));
    assert_eq!(second, Some(named("c")));
    assert!(connection.result_sets().is_empty());
}

#[test]
fn test_retained_sets_cleared_before_executor_runs() {
    let mut connection = scripted([
        MockResponse::Success(vec![named("a"), named("b")]),
        MockResponse::failure("connection reset by peer"),
    ]);

    connection.execute("SELECT 'a'; SELECT 'b'", &[]);
    assert_eq!(connection.result_sets().len(), 1);

    assert_eq!(connection.execute("SELECT 1", &[]), None);
    assert!(connection.result_sets().is_empty());
}

#[test]
fn test_failure_leaves_partial_sets_owned() {
    let mut connection = scripted([MockResponse::Failure {
        partial: vec![named("a"), named("b")],
        message: "division by zero".to_string(),
    }]);

    assert_eq!(connection.execute("SELECT 'a'; SELECT 'b'; SELECT 1/0", &[]), None);
    assert_eq!(connection.result_sets(), &[named("a"), named("b")]);
}

#[test]
fn test_success_without_sets_returns_none() {
    let mut connection = scripted([MockResponse::Success(vec![])]);
    assert_eq!(connection.execute("LISTEN jobs", &[]), None);
    assert!(connection.result_sets().is_empty());
}

#[test]
fn test_close_releases_everything() {
    let mut connection = scripted([MockResponse::Success(vec![
        named("a"),
        named("b"),
        named("c"),
    ])]);
    connection.execute("SELECT 'a'; SELECT 'b'; SELECT 'c'", &[]);
    assert_eq!(connection.result_sets().len(), 2);

    connection.close();
    connection.close();

    assert!(connection.result_sets().is_empty());
}

#[test]
fn test_default_mock_answer_for_select() {
    let mut connection = Connection::new(MockExecutor::new());

    let result = connection.execute("SELECT 1", &[]).unwrap();

    assert_eq!(result.row_count, 1);
    assert_eq!(
        result.rows[0][0],
        Value::from("Mock result for: SELECT 1")
    );
}
