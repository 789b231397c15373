//! Retry behavior of the connection opener.

mod common;

use common::{ScriptedDialer, recording_sleep};
use sparkwire::{
    Connection, ConnectionMethod, ConnectionOpener, ConnectionState, Credentials, Error,
    RetryPolicy,
};
use sparkwire_core::error::ConnectionErrorKind;
use std::net::TcpListener;
use std::time::Duration;

fn thrift_creds(retries: u64) -> Credentials {
    Credentials::new(ConnectionMethod::Thrift, "spark.local", "analytics")
        .connect_retries(retries)
        .connect_timeout(7)
}

fn transient(message: &str) -> Error {
    Error::connection(ConnectionErrorKind::Connect, message)
}

#[test]
fn retries_transient_errors_then_gives_up() {
    let dialer = ScriptedDialer::failing_with(
        (0..4)
            .map(|_| transient("Cluster is in state PENDING"))
            .collect(),
    );
    let (slept, sleep) = recording_sleep();
    let opener = ConnectionOpener::with_dialer(dialer).sleep_fn(sleep);

    let mut conn = Connection::new(thrift_creds(3));
    let err = opener.open(&mut conn).unwrap_err();

    assert!(err.to_string().contains("PENDING"));
    assert_eq!(opener.dialer().dials(), 4);
    assert_eq!(*slept.lock().unwrap(), vec![Duration::from_secs(7); 4]);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[test]
fn transient_error_then_success_opens() {
    let dialer = ScriptedDialer::failing_with(vec![
        transient("TEMPORARILY_UNAVAILABLE: cluster starting"),
        transient("pending"),
    ]);
    let (slept, sleep) = recording_sleep();
    let opener = ConnectionOpener::with_dialer(dialer).sleep_fn(sleep);

    let mut conn = Connection::new(thrift_creds(5));
    opener.open(&mut conn).unwrap();

    assert!(conn.is_open());
    assert_eq!(conn.method(), Some(ConnectionMethod::Thrift));
    assert_eq!(opener.dialer().dials(), 3);
    assert_eq!(slept.lock().unwrap().len(), 2);
}

#[test]
fn fatal_error_fails_without_sleeping() {
    let dialer = ScriptedDialer::failing_with(vec![Error::connection(
        ConnectionErrorKind::Authentication,
        "Invalid credentials",
    )]);
    let (slept, sleep) = recording_sleep();
    let opener = ConnectionOpener::with_dialer(dialer).sleep_fn(sleep);

    let mut conn = Connection::new(thrift_creds(3));
    let err = opener.open(&mut conn).unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
    assert_eq!(opener.dialer().dials(), 1);
    assert!(slept.lock().unwrap().is_empty());
}

#[test]
fn error_without_message_is_fatal() {
    let dialer = ScriptedDialer::failing_with(vec![transient("")]);
    let (slept, sleep) = recording_sleep();
    let opener = ConnectionOpener::with_dialer(dialer).sleep_fn(sleep);

    let mut conn = Connection::new(thrift_creds(3));
    assert!(opener.open(&mut conn).is_err());
    assert_eq!(opener.dialer().dials(), 1);
    assert!(slept.lock().unwrap().is_empty());
}

#[test]
fn zero_retries_still_makes_one_attempt() {
    let dialer = ScriptedDialer::failing_with(vec![transient("pending")]);
    let (slept, sleep) = recording_sleep();
    let opener = ConnectionOpener::with_dialer(dialer).sleep_fn(sleep);

    let mut conn = Connection::new(thrift_creds(0));
    assert!(opener.open(&mut conn).is_err());
    assert_eq!(opener.dialer().dials(), 1);
    assert_eq!(slept.lock().unwrap().len(), 1);
}

#[test]
fn open_connection_is_not_redialed() {
    let opener = ConnectionOpener::with_dialer(ScriptedDialer::default()).sleep_fn(|_| {});
    let mut conn = Connection::new(thrift_creds(0));
    opener.open(&mut conn).unwrap();
    opener.open(&mut conn).unwrap();
    assert_eq!(opener.dialer().dials(), 1);
}

#[test]
fn custom_markers_replace_defaults() {
    let policy = RetryPolicy::new(["Starting"]);
    assert!(policy.is_transient(&transient("cluster STARTING up")));
    assert!(!policy.is_transient(&transient("pending")));

    let dialer = ScriptedDialer::failing_with(vec![transient("cluster starting")]);
    let opener = ConnectionOpener::with_dialer(dialer)
        .retry_policy(policy)
        .sleep_fn(|_| {});
    let mut conn = Connection::new(thrift_creds(1));
    opener.open(&mut conn).unwrap();
    assert_eq!(opener.dialer().dials(), 2);
}

#[test]
fn default_policy_markers() {
    let policy = RetryPolicy::default();
    assert!(policy.is_transient(&transient("state: Pending")));
    assert!(policy.is_transient(&transient("503 TEMPORARILY_UNAVAILABLE")));
    assert!(!policy.is_transient(&transient("connection refused")));
}

#[test]
fn http_without_token_is_a_config_error() {
    let creds = Credentials::new(ConnectionMethod::Http, "example.cloud.databricks.com", "s")
        .port(443)
        .cluster("0123-456789-abc")
        .connect_retries(3);
    let (slept, sleep) = recording_sleep();
    let opener = ConnectionOpener::new().sleep_fn(sleep);

    let mut conn = Connection::new(creds);
    let err = opener.open(&mut conn).unwrap_err();

    match err {
        Error::Config(c) => assert_eq!(c.key.as_deref(), Some("token")),
        other => panic!("expected config error, got {other:?}"),
    }
    assert!(slept.lock().unwrap().is_empty());
}

#[test]
fn refused_thrift_socket_is_fatal() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let creds = Credentials::new(ConnectionMethod::Thrift, "127.0.0.1", "s")
        .port(port)
        .connect_retries(2);
    let (slept, sleep) = recording_sleep();
    let opener = ConnectionOpener::new().sleep_fn(sleep);

    let mut conn = Connection::new(creds);
    assert!(opener.open(&mut conn).is_err());
    assert!(slept.lock().unwrap().is_empty());
    assert!(!conn.is_open());
}
