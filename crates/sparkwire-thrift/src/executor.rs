//! Submit/poll/fetch driver on top of an [`RpcSession`].

use crate::rpc::{OperationCanceller, OperationState, RpcCursor, RpcSession};
use sparkwire_core::binding::normalize_bindings;
use sparkwire_core::error::{ConnectionErrorKind, Error, QueryErrorKind, Result};
use sparkwire_core::row::ColumnDesc;
use sparkwire_core::value::Value;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{Span, debug, warn};

/// Delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A cloneable handle that cancels the executor's running statement.
///
/// Unlike [`RpcQueryExecutor::cancel`] it does not borrow the executor, so
/// another thread can use it while `execute` is still polling. Cancelling is
/// cooperative: the poll loop sees the canceled state on its next poll.
#[derive(Clone, Default)]
pub struct CancelHandle {
    target: Arc<Mutex<Option<Arc<dyn OperationCanceller>>>>,
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let armed = self.target.lock().map(|t| t.is_some()).unwrap_or(false);
        f.debug_struct("CancelHandle").field("armed", &armed).finish()
    }
}

impl CancelHandle {
    fn set(&self, canceller: Option<Arc<dyn OperationCanceller>>) {
        match self.target.lock() {
            Ok(mut target) => *target = canceller,
            Err(poisoned) => *poisoned.into_inner() = canceller,
        }
    }

    /// Request cancellation of the running statement, if there is one.
    ///
    /// Environment-level errors are discarded as in [`RpcQueryExecutor::cancel`].
    pub fn cancel(&self) -> Result<()> {
        let canceller = match self.target.lock() {
            Ok(target) => target.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        match canceller {
            Some(canceller) => suppress_environment(canceller.cancel(), "cancelling query"),
            None => Ok(()),
        }
    }
}

/// Runs statements through an RPC session and waits for them to finish.
///
/// The executor owns the session and at most one active cursor. Statements
/// are submitted asynchronously and polled until they leave the pending
/// states; the terminal state decides success.
pub struct RpcQueryExecutor {
    session: Box<dyn RpcSession>,
    cursor: Option<Box<dyn RpcCursor>>,
    poll_interval: Duration,
    max_poll_duration: Option<Duration>,
    cancel_handle: CancelHandle,
    span: Span,
}

impl std::fmt::Debug for RpcQueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcQueryExecutor")
            .field("has_cursor", &self.cursor.is_some())
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_duration", &self.max_poll_duration)
            .finish_non_exhaustive()
    }
}

impl RpcQueryExecutor {
    pub fn new(session: Box<dyn RpcSession>, span: Span) -> Self {
        Self {
            session,
            cursor: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_duration: None,
            cancel_handle: CancelHandle::default(),
            span,
        }
    }

    /// Set the delay between status polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up on statements still pending after `limit`.
    pub fn max_poll_duration(mut self, limit: Duration) -> Self {
        self.max_poll_duration = Some(limit);
        self
    }

    /// Open a fresh cursor and make it the active one.
    ///
    /// A previously active cursor is closed first; failing to close it never
    /// fails the new cursor.
    pub fn cursor(&mut self) -> Result<&mut Self> {
        if let Some(mut previous) = self.cursor.take() {
            self.cancel_handle.set(None);
            if let Err(e) = previous.close() {
                self.span
                    .in_scope(|| debug!(error = %e, "Failed to close previous cursor"));
            }
        }
        let cursor = self.session.cursor()?;
        self.install(cursor);
        Ok(self)
    }

    fn install(&mut self, cursor: Box<dyn RpcCursor>) {
        self.cancel_handle.set(cursor.canceller());
        self.cursor = Some(cursor);
    }

    /// A handle for cancelling from another thread while `execute` polls.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel_handle.clone()
    }

    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    fn active_cursor(&mut self) -> Result<&mut Box<dyn RpcCursor>> {
        if self.cursor.is_none() {
            let cursor = self.session.cursor()?;
            self.install(cursor);
        }
        self.cursor.as_mut().ok_or_else(|| {
            Error::connection(ConnectionErrorKind::Closed, "No cursor is available")
        })
    }

    /// Execute `sql` and block until the server reports a terminal state.
    pub fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        let trimmed = sql.trim();
        let statement = trimmed.strip_suffix(';').unwrap_or(trimmed);
        let bindings = normalize_bindings(bindings.to_vec());
        let poll_interval = self.poll_interval;
        let max_poll_duration = self.max_poll_duration;

        let cursor = self.active_cursor()?;
        cursor
            .execute(statement, &bindings)
            .map_err(|e| e.with_sql(statement))?;

        let started = Instant::now();
        let status = loop {
            let status = cursor.poll()?;
            let state = OperationState::from_code(status.state);
            debug!(state = %state, "Poll status");
            if !state.is_pending() {
                break status;
            }
            if let Some(limit) = max_poll_duration {
                if started.elapsed() >= limit {
                    if let Err(e) = cursor.cancel() {
                        warn!(error = %e, "Failed to cancel timed out query");
                    }
                    return Err(Error::query(
                        QueryErrorKind::Timeout,
                        format!("Query still {} after {:?}", state, limit),
                    )
                    .with_sql(statement));
                }
            }
            thread::sleep(poll_interval);
        };

        if let Some(message) = status.error_message.filter(|m| !m.is_empty()) {
            return Err(Error::query(QueryErrorKind::Database, message).with_sql(statement));
        }
        let state = OperationState::from_code(status.state);
        if !state.is_success() {
            return Err(Error::query(
                QueryErrorKind::UnexpectedState,
                format!("Query failed with status: {}", state),
            )
            .with_sql(statement));
        }
        Ok(())
    }

    /// All rows of the last finished statement.
    pub fn fetchall(&mut self) -> Result<Vec<Vec<Value>>> {
        self.active_cursor()?.fetchall()
    }

    /// Column descriptions of the last statement's result set.
    pub fn description(&mut self) -> Result<Vec<ColumnDesc>> {
        self.active_cursor()?.description()
    }

    pub fn cancel(&mut self) -> Result<()> {
        let _enter = self.span.enter();
        match self.cursor.as_mut() {
            Some(cursor) => suppress_environment(cursor.cancel(), "cancelling query"),
            None => Ok(()),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        let _enter = self.span.enter();
        match self.cursor.as_mut() {
            Some(cursor) => suppress_environment(cursor.close(), "closing cursor"),
            None => Ok(()),
        }
    }

    /// Close the active cursor and then the session itself.
    ///
    /// The session is closed even when closing the cursor fails; the first
    /// error is returned.
    pub fn close_session(&mut self) -> Result<()> {
        let cursor_closed = self.close();
        self.cursor = None;
        self.cancel_handle.set(None);
        let _enter = self.span.enter();
        let session_closed = suppress_environment(self.session.close(), "closing session");
        cursor_closed.and(session_closed)
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
}

/// Drop environment-level errors, logging them at debug.
fn suppress_environment(result: Result<()>, action: &str) -> Result<()> {
    match result {
        Err(e) if e.is_environment() => {
            debug!(error = %e, "Exception while {}", action);
            Ok(())
        }
        other => other,
    }
}
