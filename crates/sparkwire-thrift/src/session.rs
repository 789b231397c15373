//! HiveServer2 session and cursor.

use crate::client::TcliClient;
use crate::render::render_statement;
use crate::rpc::{OperationCanceller, PollStatus, RpcCursor, RpcSession};
use crate::tcli::{
    CLIENT_PROTOCOL_V6, CancelOperationReq, CloseOperationReq, CloseSessionReq,
    ExecuteStatementReq, FETCH_NEXT, FetchResultsReq, GetOperationStatusReq,
    GetResultSetMetadataReq, OpenSessionReq, OperationHandle, SessionHandle,
};
use crate::transport::ThriftTransport;
use sparkwire_core::error::{ConnectionErrorKind, Error, Result};
use sparkwire_core::row::ColumnDesc;
use sparkwire_core::value::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{Span, debug};

/// Rows requested per `FetchResults` call.
pub const FETCH_BATCH_SIZE: i64 = 1000;

type SharedClient = Arc<Mutex<TcliClient>>;
/// The cursor's current operation, shared with its canceller.
type OperationSlot = Arc<Mutex<Option<OperationHandle>>>;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| {
        Error::connection(
            ConnectionErrorKind::Disconnected,
            "Thrift client lock poisoned",
        )
    })
}

/// Send `CancelOperation` for the operation in `slot`, if any.
fn cancel_operation(client: &SharedClient, slot: &OperationSlot) -> Result<()> {
    let Some(operation_handle) = lock(slot)?.clone() else {
        return Ok(());
    };
    lock(client)?.call(&CancelOperationReq { operation_handle })?;
    Ok(())
}

/// Options sent with `OpenSession`.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    pub configuration: Vec<(String, String)>,
}

/// An open HiveServer2 session.
#[derive(Debug)]
pub struct HiveSession {
    client: SharedClient,
    handle: SessionHandle,
    server_protocol_version: i32,
    closed: bool,
    span: Span,
}

impl HiveSession {
    /// Open a session over an established transport.
    pub fn open(
        transport: Box<dyn ThriftTransport>,
        options: SessionOptions,
        span: Span,
    ) -> Result<Self> {
        let mut client = TcliClient::new(transport);
        let resp = client.call(&OpenSessionReq {
            client_protocol: CLIENT_PROTOCOL_V6,
            username: options.username,
            password: options.password,
            configuration: options.configuration,
        })?;
        let handle = resp
            .session_handle
            .ok_or_else(|| Error::protocol("OpenSession returned no session handle"))?;
        span.in_scope(|| {
            debug!(
                server_protocol_version = resp.server_protocol_version,
                "Hive session opened"
            );
        });
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            handle,
            server_protocol_version: resp.server_protocol_version,
            closed: false,
            span,
        })
    }

    pub fn server_protocol_version(&self) -> i32 {
        self.server_protocol_version
    }

    pub fn hive_cursor(&self) -> HiveCursor {
        HiveCursor {
            client: Arc::clone(&self.client),
            session: self.handle.clone(),
            operation: OperationSlot::default(),
            description: None,
            span: self.span.clone(),
        }
    }
}

impl RpcSession for HiveSession {
    fn cursor(&mut self) -> Result<Box<dyn RpcCursor>> {
        if self.closed {
            return Err(Error::connection(
                ConnectionErrorKind::Closed,
                "Session is closed",
            ));
        }
        Ok(Box::new(self.hive_cursor()))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let _enter = self.span.enter();
        let mut client = lock(&self.client)?;
        let result = client.call(&CloseSessionReq {
            session_handle: self.handle.clone(),
        });
        client.close()?;
        result?;
        debug!("Hive session closed");
        Ok(())
    }
}

/// A cursor running one operation at a time.
#[derive(Debug)]
pub struct HiveCursor {
    client: SharedClient,
    session: SessionHandle,
    operation: OperationSlot,
    description: Option<Vec<ColumnDesc>>,
    span: Span,
}

impl HiveCursor {
    fn operation(&self) -> Result<OperationHandle> {
        lock(&self.operation)?
            .clone()
            .ok_or_else(|| Error::protocol("No operation has been submitted on this cursor"))
    }

    fn close_operation(&mut self) -> Result<()> {
        self.description = None;
        let Some(operation_handle) = lock(&self.operation)?.take() else {
            return Ok(());
        };
        lock(&self.client)?.call(&CloseOperationReq { operation_handle })?;
        Ok(())
    }
}

impl RpcCursor for HiveCursor {
    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        if let Err(e) = self.close_operation() {
            debug!(error = %e, "Failed to close previous operation");
        }

        let statement = render_statement(sql, bindings)?;
        let resp = lock(&self.client)?.call(&ExecuteStatementReq {
            session_handle: self.session.clone(),
            statement,
            run_async: true,
        })?;
        let operation_handle = resp
            .operation_handle
            .ok_or_else(|| Error::protocol("ExecuteStatement returned no operation handle"))?;
        *lock(&self.operation)? = Some(operation_handle);
        Ok(())
    }

    fn poll(&mut self) -> Result<PollStatus> {
        let operation_handle = self.operation()?;
        let resp = lock(&self.client)?.call(&GetOperationStatusReq { operation_handle })?;
        Ok(PollStatus {
            state: resp.operation_state,
            error_message: resp.error_message,
        })
    }

    fn fetchall(&mut self) -> Result<Vec<Vec<Value>>> {
        let operation_handle = self.operation()?;
        if !operation_handle.has_result_set {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        let mut client = lock(&self.client)?;
        loop {
            let resp = client.call(&FetchResultsReq {
                operation_handle: operation_handle.clone(),
                orientation: FETCH_NEXT,
                max_rows: FETCH_BATCH_SIZE,
            })?;
            let batch = resp.results.map(|set| set.into_rows()).unwrap_or_default();
            let short = (batch.len() as i64) < FETCH_BATCH_SIZE;
            if batch.is_empty() {
                break;
            }
            rows.extend(batch);
            // servers differ on hasMoreRows; a short batch without it ends the fetch
            if short && resp.has_more_rows != Some(true) {
                break;
            }
        }
        Ok(rows)
    }

    fn description(&mut self) -> Result<Vec<ColumnDesc>> {
        if let Some(description) = &self.description {
            return Ok(description.clone());
        }
        let operation_handle = self.operation()?;
        if !operation_handle.has_result_set {
            return Ok(Vec::new());
        }
        let resp = lock(&self.client)?.call(&GetResultSetMetadataReq { operation_handle })?;
        self.description = Some(resp.columns.clone());
        Ok(resp.columns)
    }

    fn cancel(&mut self) -> Result<()> {
        cancel_operation(&self.client, &self.operation)
    }

    fn close(&mut self) -> Result<()> {
        self.close_operation()
    }

    fn canceller(&self) -> Option<Arc<dyn OperationCanceller>> {
        Some(Arc::new(HiveCanceller {
            client: Arc::clone(&self.client),
            operation: Arc::clone(&self.operation),
        }))
    }
}

/// Cancels a [`HiveCursor`]'s running operation without borrowing the cursor.
///
/// The client lock is only held per RPC, so a cancel lands between two polls.
#[derive(Debug)]
struct HiveCanceller {
    client: SharedClient,
    operation: OperationSlot,
}

impl OperationCanceller for HiveCanceller {
    fn cancel(&self) -> Result<()> {
        cancel_operation(&self.client, &self.operation)
    }
}
