//! Shell executor against a scripted `sh` REPL that mimics spark-shell.
#![cfg(unix)]

use sparkwire_core::credentials::{Credentials, ShellConfig};
use sparkwire_core::error::{Error, QueryErrorKind};
use sparkwire_core::method::{ConnectionMethod, ShellType};
use sparkwire_shell::ShellQueryExecutor;
use tracing::Span;

/// Echoes each line like a terminal, then answers with canned output.
const FAKE_SCALA: &str = r#"
printf 'Spark context available as sc.\nscala> '
while IFS= read -r line; do
  printf '%s\n' "$line"
  case "$line" in
    :quit) exit 0 ;;
    *missing_table*) printf 'org.apache.spark.sql.AnalysisException: Table or view not found: missing_table; line 1 pos 14;\n' ;;
    *bad_syntax*) printf '<console>:24: error: not found: value bad_syntax\n' ;;
    *) printf 'res0: org.apache.spark.sql.DataFrame = [x: int]\n' ;;
  esac
  printf 'scala> '
done
"#;

fn creds(cmd: &str) -> Credentials {
    Credentials::new(ConnectionMethod::SparkShell, "localhost", "default")
        .spark_shell(ShellConfig::new(ShellType::Scala, cmd))
}

fn open() -> ShellQueryExecutor {
    ShellQueryExecutor::open(&creds(FAKE_SCALA), Span::none()).unwrap()
}

fn shell_error(err: Error) -> String {
    match err {
        Error::Query(q) => {
            assert_eq!(q.kind, QueryErrorKind::ShellOutput);
            q.message
        }
        other => panic!("expected query error, got {other:?}"),
    }
}

#[test]
fn startup_waits_for_prompt() {
    let mut executor = open();
    assert_eq!(executor.last_output(), "Spark context available as sc.\n");
    executor.close().unwrap();
    assert!(executor.is_closed());
}

#[test]
fn successful_statement_returns_ok_and_empty_table() {
    let mut executor = open();
    let result = executor.execute("select 1 as x;", false).unwrap();
    assert_eq!(result.status, "OK");
    assert!(result.table.is_empty());
    assert!(executor.last_output().contains("res0"));

    let fetched = executor.execute("select 1 as x", true).unwrap();
    assert!(fetched.table.is_empty());
    executor.close().unwrap();
}

#[test]
fn echo_of_marker_word_is_not_an_error() {
    let mut executor = open();
    executor
        .execute("select 'Exception' as word", false)
        .unwrap();
    executor.close().unwrap();
}

#[test]
fn exception_output_fails_statement() {
    let mut executor = open();
    let err = executor
        .execute("select * from missing_table", false)
        .unwrap_err();
    assert_eq!(err.sql(), Some("select * from missing_table"));
    assert_eq!(
        shell_error(err),
        "org.apache.spark.sql.AnalysisException: Table or view not found: missing_table"
    );

    // the session stays usable after a failed statement
    executor.execute("select 2", false).unwrap();
    executor.close().unwrap();
}

#[test]
fn compiler_error_fails_with_full_text() {
    let mut executor = open();
    let err = executor.execute("select bad_syntax", false).unwrap_err();
    assert!(shell_error(err).contains(": error: not found: value bad_syntax"));
    executor.close().unwrap();
}

#[test]
fn cancel_and_transaction_verbs_are_noops() {
    let mut executor = open();
    executor.cancel().unwrap();
    executor.begin();
    executor.commit();
    executor.rollback();
    executor.execute("select 3", false).unwrap();
    executor.close().unwrap();
}

#[test]
fn custom_prompt_override() {
    let cmd = r#"printf 'ready# '; while IFS= read -r line; do [ "$line" = ':quit' ] && exit 0; printf 'ok\nready# '; done"#;
    let creds = Credentials::new(ConnectionMethod::SparkShell, "localhost", "default")
        .spark_shell(ShellConfig::new(ShellType::Scala, cmd).prompt("ready# "));
    let mut executor = ShellQueryExecutor::open(&creds, Span::none()).unwrap();
    executor.execute("select 1", false).unwrap();
    assert_eq!(executor.last_output(), "ok\n");
    executor.close().unwrap();
}

#[test]
fn missing_shell_config_is_configuration_error() {
    let creds = Credentials::new(ConnectionMethod::SparkShell, "localhost", "default");
    match ShellQueryExecutor::open(&creds, Span::none()).unwrap_err() {
        Error::Config(c) => assert_eq!(c.key.as_deref(), Some("spark_shell")),
        other => panic!("expected config error, got {other:?}"),
    }

    let creds = creds.spark_shell(ShellConfig {
        shell_type: Some(ShellType::Scala),
        cmd: None,
        prompt: None,
    });
    match ShellQueryExecutor::open(&creds, Span::none()).unwrap_err() {
        Error::Config(c) => assert_eq!(c.key.as_deref(), Some("cmd")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn process_that_never_prompts_is_disconnected() {
    let err = ShellQueryExecutor::open(&creds("echo no repl here"), Span::none()).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}
