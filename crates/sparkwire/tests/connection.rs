//! Connection facade over the RPC and shell handles.

mod common;

use common::ScriptedDialer;
use sparkwire::{
    Connection, ConnectionHandle, ConnectionMethod, ConnectionOpener, ConnectionState,
    Credentials, Error, Value,
};
use sparkwire_core::error::ConnectionErrorKind;

fn open_rpc() -> (Connection, ConnectionOpener<ScriptedDialer>) {
    let opener = ConnectionOpener::with_dialer(ScriptedDialer::default()).sleep_fn(|_| {});
    let mut conn = Connection::new(Credentials::new(
        ConnectionMethod::Thrift,
        "spark.local",
        "analytics",
    ));
    opener.open(&mut conn).unwrap();
    (conn, opener)
}

#[test]
fn new_connection_is_closed() {
    let mut conn = Connection::new(Credentials::new(ConnectionMethod::Thrift, "h", "s"));
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.method().is_none());
    assert!(conn.handle().is_none());

    match conn.execute("select 1", &[], false).unwrap_err() {
        Error::Connection(c) => assert_eq!(c.kind, ConnectionErrorKind::Closed),
        other => panic!("expected connection error, got {other:?}"),
    }
    conn.close().unwrap();
    conn.cancel().unwrap();
}

#[test]
fn execute_with_fetch_builds_a_table() {
    let (mut conn, opener) = open_rpc();
    assert!(matches!(conn.handle(), Some(ConnectionHandle::Rpc(_))));

    let result = conn.execute("select id, name from t;", &[], true).unwrap();
    assert_eq!(result.status, "OK");
    assert_eq!(result.table.column_names(), ["id", "name"]);
    assert_eq!(result.table.len(), 2);
    assert_eq!(
        result.table.rows()[1].get_by_name("name"),
        Some(&Value::Text("b".into()))
    );
    assert_eq!(
        opener.dialer().calls.lock().unwrap().executed,
        vec!["select id, name from t".to_string()]
    );
}

#[test]
fn execute_without_fetch_returns_empty_table() {
    let (mut conn, _opener) = open_rpc();
    let result = conn.execute("create table t (id int)", &[], false).unwrap();
    assert_eq!(result.status, conn.get_status());
    assert!(result.table.is_empty());
    assert!(result.table.column_names().is_empty());
}

#[test]
fn close_releases_session() {
    let (mut conn, opener) = open_rpc();
    conn.execute("select 1", &[], false).unwrap();
    conn.begin();
    conn.commit();
    conn.rollback();
    conn.close().unwrap();

    assert_eq!(conn.state(), ConnectionState::Closed);
    let calls = opener.dialer().calls.lock().unwrap();
    assert!(calls.session_closed);
    assert_eq!(calls.cursor_closes, 1);
}

#[test]
fn stale_cursor_does_not_block_next_statement() {
    let (mut conn, opener) = open_rpc();
    opener.dialer().calls.lock().unwrap().stale_operations = true;

    conn.execute("select 1", &[], false).unwrap();
    conn.execute("select 2", &[], true).unwrap();
    assert_eq!(
        opener.dialer().calls.lock().unwrap().executed,
        ["select 1", "select 2"]
    );

    let err = conn.close().unwrap_err();
    assert!(err.is_query_error());
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(opener.dialer().calls.lock().unwrap().session_closed);
}

#[test]
fn cancel_handle_is_inert_without_rpc_handle() {
    let conn = Connection::new(Credentials::new(ConnectionMethod::Thrift, "h", "s"));
    conn.cancel_handle().cancel().unwrap();

    let (mut conn, _opener) = open_rpc();
    let handle = conn.cancel_handle();
    conn.execute("select 1", &[], false).unwrap();
    handle.cancel().unwrap();
    conn.close().unwrap();
    handle.cancel().unwrap();
}

#[cfg(unix)]
mod shell {
    use super::*;
    use sparkwire::{ShellConfig, ShellType};
    use sparkwire_core::error::QueryErrorKind;

    const FAKE_SQL: &str = r#"
printf 'spark-sql> '
while IFS= read -r line; do
  case "$line" in
    exit\;) exit 0 ;;
  esac
  printf 'Time taken: 0.1 seconds\nspark-sql> '
done
"#;

    fn open_shell() -> Connection {
        let creds = Credentials::new(ConnectionMethod::SparkShell, "localhost", "default")
            .spark_shell(ShellConfig::new(ShellType::Sql, FAKE_SQL));
        let mut conn = Connection::new(creds);
        ConnectionOpener::new().open(&mut conn).unwrap();
        conn
    }

    #[test]
    fn shell_connection_runs_statements() {
        let mut conn = open_shell();
        assert_eq!(conn.method(), Some(ConnectionMethod::SparkShell));
        let result = conn.execute("show tables", &[], true).unwrap();
        assert_eq!(result.status, "OK");
        assert!(result.table.is_empty());
        conn.close().unwrap();
        assert!(!conn.is_open());
    }

    #[test]
    fn shell_connection_rejects_bindings() {
        let mut conn = open_shell();
        match conn.execute("select %s", &[Value::Int(1)], false).unwrap_err() {
            Error::Query(q) => assert_eq!(q.kind, QueryErrorKind::Database),
            other => panic!("expected query error, got {other:?}"),
        }
        conn.close().unwrap();
    }
}
