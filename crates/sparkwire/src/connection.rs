//! The connection facade.

use sparkwire_core::credentials::Credentials;
use sparkwire_core::error::{ConnectionErrorKind, Error, QueryErrorKind, Result};
use sparkwire_core::method::ConnectionMethod;
use sparkwire_core::row::{ExecuteResult, STATUS_OK, Table};
use sparkwire_core::value::Value;
use sparkwire_shell::ShellQueryExecutor;
use sparkwire_thrift::{CancelHandle, RpcQueryExecutor};
use tracing::{Span, debug, info, info_span};

/// Whether a connection has a live transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

/// The transport-specific executor behind an open connection.
#[derive(Debug)]
pub enum ConnectionHandle {
    Rpc(RpcQueryExecutor),
    Shell(ShellQueryExecutor),
}

/// A connection to Spark over one of the supported transports.
///
/// Created closed; [`ConnectionOpener::open`](crate::ConnectionOpener::open)
/// dials the backend and attaches a [`ConnectionHandle`].
#[derive(Debug)]
pub struct Connection {
    credentials: Credentials,
    state: ConnectionState,
    method: Option<ConnectionMethod>,
    handle: Option<ConnectionHandle>,
    span: Span,
}

impl Connection {
    pub fn new(credentials: Credentials) -> Self {
        let span = info_span!(
            "spark_connection",
            method = %credentials.method,
            host = %credentials.host
        );
        Self {
            credentials,
            state: ConnectionState::Closed,
            method: None,
            handle: None,
            span,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// The method used by the current handle; `None` until opened.
    pub fn method(&self) -> Option<ConnectionMethod> {
        self.method
    }

    pub fn handle(&self) -> Option<&ConnectionHandle> {
        self.handle.as_ref()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn attach(&mut self, handle: ConnectionHandle) {
        self.method = Some(self.credentials.method);
        self.handle = Some(handle);
        self.state = ConnectionState::Open;
    }

    fn handle_mut(&mut self) -> Result<&mut ConnectionHandle> {
        self.handle.as_mut().ok_or_else(|| {
            Error::connection(ConnectionErrorKind::Closed, "Connection is not open")
        })
    }

    /// Run `sql` and, with `fetch`, materialize its rows.
    pub fn execute(&mut self, sql: &str, bindings: &[Value], fetch: bool) -> Result<ExecuteResult> {
        let span = self.span.clone();
        let _enter = span.enter();
        debug!(fetch, "Executing statement");

        match self.handle_mut()? {
            ConnectionHandle::Rpc(executor) => {
                executor.cursor()?.execute(sql, bindings)?;
                if !fetch {
                    return Ok(ExecuteResult::ok(Table::empty()));
                }
                let names = executor
                    .description()?
                    .into_iter()
                    .map(|column| column.name)
                    .collect();
                let rows = executor.fetchall()?;
                Ok(ExecuteResult::ok(Table::from_values(names, rows)))
            }
            ConnectionHandle::Shell(executor) => {
                if !bindings.is_empty() {
                    return Err(Error::query(
                        QueryErrorKind::Database,
                        "Parameter bindings are not supported by the spark-shell method",
                    )
                    .with_sql(sql));
                }
                executor.execute(sql, fetch)
            }
        }
    }

    /// A handle that can cancel a statement while `execute` is still running.
    ///
    /// Only RPC connections support this; for a shell or closed connection
    /// the handle does nothing. Take it after the connection is opened.
    pub fn cancel_handle(&self) -> CancelHandle {
        match &self.handle {
            Some(ConnectionHandle::Rpc(executor)) => executor.cancel_handle(),
            _ => CancelHandle::default(),
        }
    }

    /// Ask the backend to abort the last statement.
    pub fn cancel(&mut self) -> Result<()> {
        match self.handle.as_mut() {
            Some(ConnectionHandle::Rpc(executor)) => executor.cancel(),
            Some(ConnectionHandle::Shell(executor)) => executor.cancel(),
            None => Ok(()),
        }
    }

    /// Release the transport. The connection ends up closed even on error.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take();
        self.state = ConnectionState::Closed;
        let result = match handle {
            Some(ConnectionHandle::Rpc(mut executor)) => executor.close_session(),
            Some(ConnectionHandle::Shell(mut executor)) => executor.close(),
            None => return Ok(()),
        };
        self.span.in_scope(|| info!("Connection closed"));
        result
    }

    pub fn begin(&mut self) {
        match self.handle.as_mut() {
            Some(ConnectionHandle::Rpc(executor)) => executor.begin(),
            Some(ConnectionHandle::Shell(executor)) => executor.begin(),
            None => {}
        }
    }

    pub fn commit(&mut self) {
        match self.handle.as_mut() {
            Some(ConnectionHandle::Rpc(executor)) => executor.commit(),
            Some(ConnectionHandle::Shell(executor)) => executor.commit(),
            None => {}
        }
    }

    pub fn rollback(&mut self) {
        match self.handle.as_mut() {
            Some(ConnectionHandle::Rpc(executor)) => executor.rollback(),
            Some(ConnectionHandle::Shell(executor)) => executor.rollback(),
            None => {}
        }
    }

    /// Status string reported for every statement.
    pub fn get_status(&self) -> &'static str {
        STATUS_OK
    }
}
