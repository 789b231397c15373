//! Transport-neutral RPC session and cursor contracts.
//!
//! The query executor drives any backend that implements these traits: the
//! Hive Thrift client in production, scripted fakes in tests.

use sparkwire_core::error::Result;
use sparkwire_core::row::ColumnDesc;
use sparkwire_core::value::Value;
use std::fmt;
use std::sync::Arc;

/// One poll response for a submitted operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStatus {
    /// Raw `TOperationState` code, absent when the server omitted it
    pub state: Option<i32>,
    /// Explicit error text reported by the server
    pub error_message: Option<String>,
}

impl PollStatus {
    pub fn state(code: i32) -> Self {
        Self {
            state: Some(code),
            error_message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            state: Some(code),
            error_message: Some(message.into()),
        }
    }
}

/// An open RPC session able to hand out cursors.
pub trait RpcSession: Send {
    /// Create a fresh cursor bound to this session.
    fn cursor(&mut self) -> Result<Box<dyn RpcCursor>>;

    /// Close the session on the server.
    fn close(&mut self) -> Result<()>;
}

/// A statement handle within a session.
pub trait RpcCursor: Send {
    /// Submit `sql` without waiting for it to finish.
    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<()>;

    /// Ask the server for the state of the submitted operation.
    fn poll(&mut self) -> Result<PollStatus>;

    /// Fetch every remaining row of the finished operation.
    fn fetchall(&mut self) -> Result<Vec<Vec<Value>>>;

    /// Column descriptions of the current result set.
    fn description(&mut self) -> Result<Vec<ColumnDesc>>;

    /// Request cancellation of the running operation.
    fn cancel(&mut self) -> Result<()>;

    /// Release the operation on the server.
    fn close(&mut self) -> Result<()>;

    /// A handle that can cancel this cursor's operation from another thread.
    ///
    /// Cursors without an out-of-band cancel path return `None`.
    fn canceller(&self) -> Option<Arc<dyn OperationCanceller>> {
        None
    }
}

/// Cancels whatever operation its cursor is currently running.
pub trait OperationCanceller: Send + Sync {
    fn cancel(&self) -> Result<()>;
}

/// `TOperationState` as seen by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Initialized,
    Running,
    Finished,
    Canceled,
    Closed,
    Error,
    Unknown,
    Pending,
    TimedOut,
    /// A code outside the known range, or no state at all
    Unrecognized(Option<i32>),
}

impl OperationState {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => OperationState::Initialized,
            Some(1) => OperationState::Running,
            Some(2) => OperationState::Finished,
            Some(3) => OperationState::Canceled,
            Some(4) => OperationState::Closed,
            Some(5) => OperationState::Error,
            Some(6) => OperationState::Unknown,
            Some(7) => OperationState::Pending,
            Some(8) => OperationState::TimedOut,
            other => OperationState::Unrecognized(other),
        }
    }

    /// Still waiting for the operation to leave this state.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            OperationState::Initialized | OperationState::Running | OperationState::Pending
        )
    }

    pub fn is_success(self) -> bool {
        self == OperationState::Finished
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationState::Initialized => "INITIALIZED_STATE",
            OperationState::Running => "RUNNING_STATE",
            OperationState::Finished => "FINISHED_STATE",
            OperationState::Canceled => "CANCELED_STATE",
            OperationState::Closed => "CLOSED_STATE",
            OperationState::Error => "ERROR_STATE",
            OperationState::Unknown => "UKNOWN_STATE",
            OperationState::Pending => "PENDING_STATE",
            OperationState::TimedOut => "TIMEDOUT_STATE",
            OperationState::Unrecognized(Some(code)) => return write!(f, "Unknown<{}>", code),
            OperationState::Unrecognized(None) => "Unknown<None>",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_and_success_sets() {
        let pending: Vec<_> = (0..=8)
            .map(|c| OperationState::from_code(Some(c)))
            .filter(|s| s.is_pending())
            .collect();
        assert_eq!(
            pending,
            [
                OperationState::Initialized,
                OperationState::Running,
                OperationState::Pending
            ]
        );
        assert!(OperationState::from_code(Some(2)).is_success());
        assert!(!OperationState::from_code(None).is_pending());
        assert!(!OperationState::from_code(Some(42)).is_success());
    }

    #[test]
    fn labels() {
        assert_eq!(OperationState::from_code(Some(3)).to_string(), "CANCELED_STATE");
        assert_eq!(OperationState::from_code(Some(42)).to_string(), "Unknown<42>");
        assert_eq!(OperationState::from_code(None).to_string(), "Unknown<None>");
    }
}
