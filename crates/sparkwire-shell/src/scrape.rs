//! Failure detection in free-text REPL output.
//!
//! The grammar is small: statement echoes are removed first, then the rest
//! is searched for an exception marker and, failing that, an error marker.

use crate::dialect::Dialect;
use sparkwire_core::error::{Error, QueryErrorKind, Result};

const EXCEPTION_MARKER: &str = "Exception";

/// Remove every echo of the sent statement from `output`.
pub fn strip_echoes(output: &str, sent: &str, dialect: &Dialect) -> String {
    let mut remaining = if sent.is_empty() {
        output.to_string()
    } else {
        output.replace(sent, "")
    };
    if let Some(echo) = dialect.echo_pattern() {
        remaining = echo.replace_all(&remaining, "").into_owned();
    }
    remaining
}

/// Fail with a query error when `output` reports one.
pub fn check_output(output: &str, sent: &str, dialect: &Dialect) -> Result<()> {
    let remaining = strip_echoes(output, sent, dialect);

    if remaining.contains(EXCEPTION_MARKER) {
        let head = remaining.split(';').next().unwrap_or_default();
        let message = head
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return Err(Error::query(QueryErrorKind::ShellOutput, message));
    }
    if dialect.error_marker().is_match(&remaining) {
        return Err(Error::query(
            QueryErrorKind::ShellOutput,
            remaining.trim().to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparkwire_core::method::ShellType;

    fn scala() -> Dialect {
        Dialect::new(ShellType::Scala).unwrap()
    }

    fn message(err: Error) -> String {
        match err {
            Error::Query(q) => {
                assert_eq!(q.kind, QueryErrorKind::ShellOutput);
                q.message
            }
            other => panic!("expected query error, got {other:?}"),
        }
    }

    #[test]
    fn clean_output_passes() {
        let d = scala();
        let sent = d.wrap("select 1", false);
        assert!(check_output("res0: org.apache.spark.sql.DataFrame = [1: int]\n", &sent, &d).is_ok());
    }

    #[test]
    fn echoed_statement_containing_marker_passes() {
        let d = scala();
        let sent = d.wrap("select 'Exception' as word", false);
        let output = format!("{}\nres1: org.apache.spark.sql.DataFrame = [word: string]\n", sent);
        assert!(check_output(&output, &sent, &d).is_ok());
    }

    #[test]
    fn echo_pattern_strips_reformatted_echo() {
        let d = scala();
        let sent = d.wrap("select 'Exception'", false);
        // a REPL that re-indents the echo no longer matches the sent text exactly
        let echo = "spark.sql(\"\"\"select\n     | 'Exception'\"\"\")";
        assert!(check_output(echo, &sent, &d).is_ok());
    }

    #[test]
    fn exception_message_stops_at_semicolon() {
        let d = scala();
        let output = "org.apache.spark.sql.AnalysisException: Table or view not found:\nmissing; line 1 pos 14;\n'Project [*]";
        let err = check_output(output, "spark.sql(\"\"\"select * from missing\"\"\")", &d).unwrap_err();
        assert_eq!(
            message(err),
            "org.apache.spark.sql.AnalysisException: Table or view not found: missing"
        );
    }

    #[test]
    fn compiler_error_uses_full_text() {
        let d = scala();
        let output = "<console>:24: error: not found: value spark\n       spark.range(1)\n";
        let err = check_output(output, "", &d).unwrap_err();
        assert_eq!(
            message(err),
            "<console>:24: error: not found: value spark\n       spark.range(1)"
        );
    }

    #[test]
    fn spark_sql_error_line() {
        let d = Dialect::new(ShellType::Sql).unwrap();
        let output = "Error in query: cannot resolve 'x' given input columns\n";
        assert!(check_output(output, "select x;", &d).is_err());
    }
}
