//! Per-shell statement wrapping, prompts and quit commands.

use regex::Regex;
use sparkwire_core::error::{Error, Result};
use sparkwire_core::method::ShellType;

/// Where fetched results are written.
pub const SCRATCH_PATH: &str = "/tmp/sparkwire/result";

/// How statements are framed for one kind of REPL.
#[derive(Debug, Clone)]
pub struct Dialect {
    shell_type: ShellType,
    blank_lines: Regex,
    echo: Option<Regex>,
    error_marker: Regex,
}

impl Dialect {
    pub fn new(shell_type: ShellType) -> Result<Self> {
        let blank_lines = compile(r"\n[ \t]*(?:\n[ \t]*)+")?;
        let echo = match shell_type {
            ShellType::Scala | ShellType::Python => Some(compile(
                r#"(?s)spark\.sql\("""(.*?)"""\)(?:\.coalesce\(1\)\.write\.mode\("overwrite"\)\.csv\("[^"]*"\))?"#,
            )?),
            ShellType::Sql => None,
        };
        Ok(Self {
            shell_type,
            blank_lines,
            echo,
            error_marker: compile(r"(?m)(?:: error:|^\s*Error in query:)")?,
        })
    }

    pub fn shell_type(&self) -> ShellType {
        self.shell_type
    }

    /// The ready sentinel printed by the REPL.
    pub fn prompt(&self) -> &'static str {
        match self.shell_type {
            ShellType::Scala => "scala> ",
            ShellType::Python => ">>> ",
            ShellType::Sql => "spark-sql> ",
        }
    }

    /// Command that makes the REPL exit.
    pub fn quit_command(&self) -> &'static str {
        match self.shell_type {
            ShellType::Scala => ":quit",
            ShellType::Python => "exit()",
            ShellType::Sql => "exit;",
        }
    }

    /// Pattern matching the wrapped execution call, used to strip echoes.
    pub fn echo_pattern(&self) -> Option<&Regex> {
        self.echo.as_ref()
    }

    /// Compiler-style error lines (`<console>:1: error:`, `Error in query:`).
    pub fn error_marker(&self) -> &Regex {
        &self.error_marker
    }

    /// Turn `sql` into the statement sent to the REPL.
    pub fn wrap(&self, sql: &str, fetch: bool) -> String {
        let collapsed = self.blank_lines.replace_all(sql, "\n");
        let trimmed = collapsed.trim();
        let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();

        match self.shell_type {
            ShellType::Scala | ShellType::Python => {
                let mut wrapped = format!("spark.sql(\"\"\"{}\"\"\")", body);
                if fetch {
                    wrapped.push_str(&format!(
                        ".coalesce(1).write.mode(\"overwrite\").csv(\"{}\")",
                        SCRATCH_PATH
                    ));
                }
                wrapped
            }
            ShellType::Sql => {
                if fetch {
                    format!(
                        "INSERT OVERWRITE DIRECTORY '{}' USING csv {};",
                        SCRATCH_PATH, body
                    )
                } else {
                    format!("{};", body)
                }
            }
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::invalid_config(format!("Invalid pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect(shell_type: ShellType) -> Dialect {
        Dialect::new(shell_type).unwrap()
    }

    #[test]
    fn wraps_without_terminator() {
        let d = dialect(ShellType::Scala);
        assert_eq!(d.wrap("SELECT 1;", false), r#"spark.sql("""SELECT 1""")"#);
    }

    #[test]
    fn collapses_blank_lines() {
        let d = dialect(ShellType::Python);
        let wrapped = d.wrap("SELECT a,\n\n   \nb\nFROM t;\n", false);
        assert_eq!(wrapped, "spark.sql(\"\"\"SELECT a,\nb\nFROM t\"\"\")");
        assert!(!wrapped.contains("\n\n"));
    }

    #[test]
    fn fetch_appends_materialization() {
        let d = dialect(ShellType::Scala);
        let wrapped = d.wrap("SELECT 1", true);
        assert!(wrapped.starts_with(r#"spark.sql("""SELECT 1""")"#));
        assert!(wrapped.ends_with(r#".coalesce(1).write.mode("overwrite").csv("/tmp/sparkwire/result")"#));
        assert!(d.echo_pattern().unwrap().is_match(&wrapped));
    }

    #[test]
    fn sql_dialect_terminates_statement() {
        let d = dialect(ShellType::Sql);
        assert_eq!(d.wrap("select 1;", false), "select 1;");
        assert!(d.wrap("select 1", true).starts_with("INSERT OVERWRITE DIRECTORY"));
        assert!(d.echo_pattern().is_none());
    }

    #[test]
    fn prompts_and_quit() {
        assert_eq!(dialect(ShellType::Scala).prompt(), "scala> ");
        assert_eq!(dialect(ShellType::Python).prompt(), ">>> ");
        assert_eq!(dialect(ShellType::Sql).quit_command(), "exit;");
    }
}
