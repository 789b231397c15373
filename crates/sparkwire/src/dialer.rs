//! Method dispatch for dialing a backend.

use sparkwire_core::credentials::Credentials;
use sparkwire_core::error::Result;
use sparkwire_core::method::ConnectionMethod;
use sparkwire_shell::ShellQueryExecutor;
use sparkwire_thrift::{RpcSession, open_http, open_thrift};
use tracing::Span;

/// What a single successful dial produced.
pub enum Dialed {
    /// An RPC session, still to be wrapped in an executor
    Rpc(Box<dyn RpcSession>),
    /// A ready shell executor
    Shell(ShellQueryExecutor),
}

impl std::fmt::Debug for Dialed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialed::Rpc(_) => f.write_str("Dialed::Rpc"),
            Dialed::Shell(executor) => f.debug_tuple("Dialed::Shell").field(executor).finish(),
        }
    }
}

/// Makes one connection attempt.
pub trait Dialer {
    fn dial(&self, credentials: &Credentials, span: &Span) -> Result<Dialed>;
}

/// Dials the real transports: Thrift socket, HTTPS or a shell process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportDialer;

impl Dialer for TransportDialer {
    fn dial(&self, credentials: &Credentials, span: &Span) -> Result<Dialed> {
        match credentials.method {
            ConnectionMethod::Thrift => Ok(Dialed::Rpc(Box::new(open_thrift(
                credentials,
                span.clone(),
            )?))),
            ConnectionMethod::Http => Ok(Dialed::Rpc(Box::new(open_http(
                credentials,
                span.clone(),
            )?))),
            ConnectionMethod::SparkShell => Ok(Dialed::Shell(ShellQueryExecutor::open(
                credentials,
                span.clone(),
            )?)),
        }
    }
}
