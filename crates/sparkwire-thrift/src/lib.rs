//! HiveServer2 (TCLIService) support for sparkwire.
//!
//! `sparkwire-thrift` implements the two RPC connection methods:
//!
//! - `thrift`: binary Thrift over a TCP socket with SASL PLAIN framing
//! - `http`: the same protocol POSTed over HTTPS with token auth
//!
//! [`RpcQueryExecutor`] drives any [`RpcSession`] through the
//! submit/poll/fetch cycle, so tests can swap in fakes for the Hive client.

pub mod client;
pub mod dial;
pub mod executor;
pub mod protocol;
pub mod render;
pub mod rpc;
pub mod session;
pub mod tcli;
pub mod transport;

pub use client::TcliClient;
pub use dial::{basic_auth_header, connection_url, open_http, open_thrift};
pub use executor::{CancelHandle, DEFAULT_POLL_INTERVAL, RpcQueryExecutor};
pub use rpc::{OperationCanceller, OperationState, PollStatus, RpcCursor, RpcSession};
pub use session::{HiveCursor, HiveSession, SessionOptions};
pub use transport::{HttpTransport, SaslTransport, ThriftTransport};
