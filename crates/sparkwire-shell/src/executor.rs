//! Executes SQL through an interactive Spark REPL.

use crate::dialect::Dialect;
use crate::scrape::check_output;
use crate::session::ShellSession;
use sparkwire_core::credentials::{Credentials, ShellConfig};
use sparkwire_core::error::{Error, Result};
use sparkwire_core::row::{ExecuteResult, Table};
use sparkwire_core::validate::{SHELL_CONFIG_REQUIRED, SHELL_REQUIRED, validate_creds};
use tracing::{Span, debug, info};

/// Query executor backed by one REPL process.
///
/// There is no structured result channel: statements either fail through
/// output scraping or return [`Table::empty`]. Fetched results are written to
/// [`SCRATCH_PATH`](crate::dialect::SCRATCH_PATH) by the REPL itself.
#[derive(Debug)]
pub struct ShellQueryExecutor {
    session: ShellSession,
    dialect: Dialect,
    prompt: String,
    last_output: String,
    span: Span,
}

impl ShellQueryExecutor {
    /// Validate the shell configuration, start the REPL and wait for its prompt.
    pub fn open(creds: &Credentials, span: Span) -> Result<Self> {
        let label = creds.method.as_str();
        validate_creds(creds, SHELL_REQUIRED, label)?;
        let shell = creds
            .spark_shell
            .as_ref()
            .ok_or_else(|| Error::missing_config("spark_shell", label))?;
        validate_creds(shell, SHELL_CONFIG_REQUIRED, label)?;
        Self::from_config(shell, label, span)
    }

    /// Start the REPL described by `shell`.
    pub fn from_config(shell: &ShellConfig, label: &str, span: Span) -> Result<Self> {
        let shell_type = shell
            .shell_type
            .ok_or_else(|| Error::missing_config("shell_type", label))?;
        let cmd = shell
            .cmd
            .as_deref()
            .ok_or_else(|| Error::missing_config("cmd", label))?;
        let dialect = Dialect::new(shell_type)?;
        let prompt = shell
            .prompt
            .clone()
            .unwrap_or_else(|| dialect.prompt().to_string());

        let session = ShellSession::spawn(cmd, span.clone())?;
        Self::start(session, dialect, prompt, span)
    }

    /// Wrap an already spawned session and wait for its first prompt.
    pub fn start(
        mut session: ShellSession,
        dialect: Dialect,
        prompt: String,
        span: Span,
    ) -> Result<Self> {
        let banner = session.expect(&prompt)?;
        span.in_scope(|| {
            info!(shell_type = %dialect.shell_type(), "Shell session ready");
            debug!(output = %banner, "Shell startup output");
        });
        Ok(Self {
            session,
            dialect,
            prompt,
            last_output: banner,
            span,
        })
    }

    /// Run one statement and wait for the prompt to return.
    ///
    /// With `fetch`, the REPL writes the result to the scratch location and
    /// the returned table is empty.
    pub fn execute(&mut self, sql: &str, fetch: bool) -> Result<ExecuteResult> {
        let span = self.span.clone();
        let _enter = span.enter();

        let statement = self.dialect.wrap(sql, fetch);
        self.session.send_line(&statement)?;
        self.last_output = self.session.expect(&self.prompt)?;
        debug!(output = %self.last_output, "Shell output");

        check_output(&self.last_output, &statement, &self.dialect).map_err(|e| e.with_sql(sql))?;
        Ok(ExecuteResult::ok(Table::empty()))
    }

    /// Output captured by the last statement.
    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// The REPL has no out-of-band cancel channel.
    pub fn cancel(&mut self) -> Result<()> {
        self.span.in_scope(|| debug!("Cancel is not supported by shell sessions"));
        Ok(())
    }

    pub fn begin(&mut self) {
        self.span.in_scope(|| debug!("NotImplemented: begin"));
    }

    pub fn commit(&mut self) {
        self.span.in_scope(|| debug!("NotImplemented: commit"));
    }

    pub fn rollback(&mut self) {
        self.span.in_scope(|| debug!("NotImplemented: rollback"));
    }

    /// Quit the REPL and reap the process.
    pub fn close(&mut self) -> Result<()> {
        let quit = self.dialect.quit_command();
        self.session.close(Some(quit))
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}
