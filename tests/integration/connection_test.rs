//! Connection state machine and timing tests.
//!
//! Drives a connection through the mock executor and observes it from
//! inside the executor call.

use dbconn::connection::{Connection, ManualStopwatch, QueryState};
use dbconn::db::{MockExecutor, MockResponse, ResultSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn connection_with_clock() -> (Connection<MockExecutor, ManualStopwatch>, ManualStopwatch) {
    let clock = ManualStopwatch::new();
    let connection = Connection::with_stopwatch(MockExecutor::new(), clock.clone());
    (connection, clock)
}

fn notification_counter(
    connection: &mut Connection<MockExecutor, ManualStopwatch>,
) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    connection.subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    count
}

#[test]
fn test_new_connection_is_inactive() {
    let (connection, _) = connection_with_clock();
    assert_eq!(connection.query_state(), QueryState::Inactive);
    assert!(connection.result_sets().is_empty());
    assert_eq!(connection.target_database(), None);
    assert_eq!(connection.connection_descriptor(), None);
    assert_eq!(connection.elapsed(), "0.000 sec");
}

#[test]
fn test_executing_only_inside_execute() {
    let (mut connection, _) = connection_with_clock();
    let monitor = connection.monitor();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let during = Arc::clone(&seen);
    connection
        .executor_mut()
        .set_on_run(move |_| during.lock().unwrap().push(monitor.query_state()));

    assert_eq!(connection.query_state(), QueryState::Inactive);
    connection.execute("SELECT 1", &[]);
    assert_eq!(connection.query_state(), QueryState::Inactive);
    connection.execute("SELECT 2", &[]);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![QueryState::Executing, QueryState::Executing]
    );
}

#[test]
fn test_state_returns_to_inactive_after_failure() {
    let (mut connection, _) = connection_with_clock();
    connection
        .executor_mut()
        .push_response(MockResponse::failure("permission denied for table audit"));
    let notifications = notification_counter(&mut connection);

    assert!(connection.execute("SELECT * FROM audit", &[]).is_none());

    assert_eq!(connection.query_state(), QueryState::Inactive);
    assert_eq!(notifications.load(Ordering::SeqCst), 2);
}

#[test]
fn test_one_notification_per_transition() {
    let (mut connection, _) = connection_with_clock();
    let notifications = notification_counter(&mut connection);

    for _ in 0..3 {
        connection.execute("SELECT 1", &[]);
    }

    assert_eq!(notifications.load(Ordering::SeqCst), 6);
}

#[test]
fn test_live_elapsed_is_truncated_while_executing() {
    let (mut connection, clock) = connection_with_clock();
    let monitor = connection.monitor();
    let live = Arc::new(Mutex::new(String::new()));

    let driver_clock = clock.clone();
    let reading = Arc::clone(&live);
    connection.executor_mut().set_on_run(move |_| {
        driver_clock.set(Duration::from_millis(45_123));
        *reading.lock().unwrap() = monitor.elapsed();
    });

    connection.execute("SELECT pg_sleep(45)", &[]);

    assert_eq!(*live.lock().unwrap(), "45.1 sec");
    assert_eq!(connection.elapsed(), "45.123 sec");
}

#[test]
fn test_elapsed_stays_frozen_after_completion() {
    let (mut connection, clock) = connection_with_clock();
    let driver_clock = clock.clone();
    connection
        .executor_mut()
        .set_on_run(move |_| driver_clock.set(Duration::from_millis(125_000)));

    connection.execute("SELECT 1", &[]);
    clock.advance(Duration::from_secs(3_600));

    assert_eq!(connection.elapsed(), "02:05.000");
}

#[test]
fn test_long_execution_uses_hour_format() {
    let (mut connection, clock) = connection_with_clock();
    let driver_clock = clock.clone();
    connection
        .executor_mut()
        .set_on_run(move |_| driver_clock.set(Duration::from_millis(3_725_000)));

    connection.execute("VACUUM FULL", &[]);

    assert_eq!(connection.elapsed(), "01:02:05");
}

#[test]
fn test_same_target_database_is_silent() {
    let (mut connection, _) = connection_with_clock();
    connection.set_target_database("app");
    let closes = connection.executor().close_count();
    let notifications = notification_counter(&mut connection);

    connection.set_target_database("app");

    assert_eq!(connection.executor().close_count(), closes);
    assert_eq!(notifications.load(Ordering::SeqCst), 0);
}

#[test]
fn test_descriptor_reassignment_always_closes() {
    let (mut connection, _) = connection_with_clock();
    connection
        .executor_mut()
        .push_response(MockResponse::Success(vec![ResultSet::new(), ResultSet::new()]));
    connection.set_connection_descriptor("postgres://localhost/app");
    connection.execute("SELECT 1; SELECT 2", &[]);
    assert_eq!(connection.result_sets().len(), 1);

    connection.set_connection_descriptor("postgres://localhost/app");

    assert_eq!(connection.executor().close_count(), 2);
    assert!(connection.result_sets().is_empty());
}

#[test]
fn test_unsubscribed_observer_is_not_called() {
    let (mut connection, _) = connection_with_clock();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let id = connection.subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(connection.unsubscribe(id));
    connection.execute("SELECT 1", &[]);

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_monitor_readable_from_another_thread() {
    let (connection, _) = connection_with_clock();
    let monitor = connection.monitor();

    let state = std::thread::spawn(move || monitor.query_state())
        .join()
        .unwrap();

    assert_eq!(state, QueryState::Inactive);
}
