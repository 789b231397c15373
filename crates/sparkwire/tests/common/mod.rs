//! Scripted dialer and RPC fakes shared by the integration tests.
#![allow(dead_code)]

use sparkwire::{Credentials, Dialed, Dialer, Error, Result, Value};
use sparkwire_core::error::QueryErrorKind;
use sparkwire_core::row::ColumnDesc;
use sparkwire_thrift::{PollStatus, RpcCursor, RpcSession};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Span;

#[derive(Debug, Default)]
pub struct Calls {
    pub dials: usize,
    pub executed: Vec<String>,
    pub cursor_closes: usize,
    pub session_closed: bool,
    /// Make cursor close fail as if the server already dropped the operation
    pub stale_operations: bool,
}

pub struct FakeCursor {
    calls: Arc<Mutex<Calls>>,
}

impl RpcCursor for FakeCursor {
    fn execute(&mut self, sql: &str, _bindings: &[Value]) -> Result<()> {
        self.calls.lock().unwrap().executed.push(sql.to_string());
        Ok(())
    }

    fn poll(&mut self) -> Result<PollStatus> {
        Ok(PollStatus::state(2))
    }

    fn fetchall(&mut self) -> Result<Vec<Vec<Value>>> {
        Ok(vec![
            vec![Value::Int(1), Value::Text("a".into())],
            vec![Value::Int(2), Value::Text("b".into())],
        ])
    }

    fn description(&mut self) -> Result<Vec<ColumnDesc>> {
        Ok(vec![
            ColumnDesc {
                name: "id".into(),
                type_name: "INT_TYPE".into(),
                position: 1,
                comment: None,
            },
            ColumnDesc {
                name: "name".into(),
                type_name: "STRING_TYPE".into(),
                position: 2,
                comment: None,
            },
        ])
    }

    fn cancel(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        calls.cursor_closes += 1;
        if calls.stale_operations {
            return Err(Error::query(
                QueryErrorKind::Database,
                "Invalid OperationHandle",
            ));
        }
        Ok(())
    }
}

pub struct FakeSession {
    calls: Arc<Mutex<Calls>>,
}

impl RpcSession for FakeSession {
    fn cursor(&mut self) -> Result<Box<dyn RpcCursor>> {
        Ok(Box::new(FakeCursor {
            calls: Arc::clone(&self.calls),
        }))
    }

    fn close(&mut self) -> Result<()> {
        self.calls.lock().unwrap().session_closed = true;
        Ok(())
    }
}

/// Fails with the scripted errors in order, then succeeds.
#[derive(Default)]
pub struct ScriptedDialer {
    failures: Mutex<VecDeque<Error>>,
    pub calls: Arc<Mutex<Calls>>,
}

impl ScriptedDialer {
    pub fn failing_with(failures: Vec<Error>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            calls: Arc::default(),
        }
    }

    pub fn dials(&self) -> usize {
        self.calls.lock().unwrap().dials
    }
}

impl Dialer for ScriptedDialer {
    fn dial(&self, _credentials: &Credentials, _span: &Span) -> Result<Dialed> {
        self.calls.lock().unwrap().dials += 1;
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(Dialed::Rpc(Box::new(FakeSession {
            calls: Arc::clone(&self.calls),
        })))
    }
}

/// A sleep function that records each requested delay.
pub fn recording_sleep() -> (Arc<Mutex<Vec<Duration>>>, impl Fn(Duration) + Send + Sync + 'static) {
    let slept = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&slept);
    (slept, move |delay| recorder.lock().unwrap().push(delay))
}
