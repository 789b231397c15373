//! Client-side parameter rendering for `%s` placeholders.

use sparkwire_core::error::{Error, QueryErrorKind, Result};
use sparkwire_core::value::Value;

/// Substitute `bindings` into the `%s` placeholders of `sql`.
///
/// With no bindings the statement is returned untouched. Otherwise `%%`
/// renders as a literal `%` and every `%s` consumes one binding.
pub fn render_statement(sql: &str, bindings: &[Value]) -> Result<String> {
    if bindings.is_empty() {
        return Ok(sql.to_string());
    }

    let mut out = String::with_capacity(sql.len() + bindings.len() * 8);
    let mut params = bindings.iter();
    let mut chars = sql.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => {
                let value = params.next().ok_or_else(|| {
                    Error::query(
                        QueryErrorKind::Database,
                        format!("Not enough bindings for statement ({} given)", bindings.len()),
                    )
                })?;
                out.push_str(&literal(value));
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    if params.next().is_some() {
        return Err(Error::query(
            QueryErrorKind::Database,
            format!(
                "Not all bindings were used in statement ({} given)",
                bindings.len()
            ),
        ));
    }
    Ok(out)
}

/// Render one value as a SQL literal.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::TinyInt(v) => v.to_string(),
        Value::SmallInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::Float(v) => format!("{:?}", v),
        Value::Double(v) => format!("{:?}", v),
        Value::Decimal(v) => v.clone(),
        Value::Text(v) => quote(v),
        Value::Bytes(v) => quote(&String::from_utf8_lossy(v)),
        Value::Date(_) => quote(&value.date_text().unwrap_or_default()),
        Value::Timestamp(_) => quote(&value.timestamp_millis_text().unwrap_or_default()),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_bindings_statement_is_untouched() {
        let sql = "select '%s', 100 % 7";
        assert_eq!(render_statement(sql, &[]).unwrap(), sql);
    }

    #[test]
    fn substitutes_in_order() {
        let sql = render_statement(
            "insert into t values (%s, %s, %s, %s)",
            &[
                Value::Double(1.0),
                Value::Text("it's".into()),
                Value::Null,
                Value::Bool(false),
            ],
        )
        .unwrap();
        assert_eq!(sql, r"insert into t values (1.0, 'it\'s', NULL, false)");
    }

    #[test]
    fn escapes_backslashes() {
        assert_eq!(literal(&Value::Text(r"a\b".into())), r"'a\\b'");
    }

    #[test]
    fn percent_escape() {
        let sql = render_statement("select %s like 'a%%'", &[Value::Int(1)]).unwrap();
        assert_eq!(sql, "select 1 like 'a%'");
    }

    #[test]
    fn binding_count_mismatch() {
        assert!(render_statement("select %s, %s", &[Value::Int(1)]).is_err());
        assert!(render_statement("select %s", &[Value::Int(1), Value::Int(2)]).is_err());
    }
}
