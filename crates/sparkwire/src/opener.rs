//! Dialing with retry on transient startup failures.

use crate::connection::{Connection, ConnectionHandle};
use crate::dialer::{Dialed, Dialer, TransportDialer};
use sparkwire_core::error::{ConnectionErrorKind, Error, Result};
use sparkwire_thrift::{DEFAULT_POLL_INTERVAL, RpcQueryExecutor};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error text fragments that mark a dial failure as worth retrying.
pub const DEFAULT_TRANSIENT_MARKERS: [&str; 2] = ["pending", "temporarily_unavailable"];

/// Decides which dial failures are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Lower-case fragments searched for in the error message
    pub transient_markers: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            transient_markers: DEFAULT_TRANSIENT_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

impl RetryPolicy {
    pub fn new(markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            transient_markers: markers
                .into_iter()
                .map(|m| m.into().to_lowercase())
                .collect(),
        }
    }

    /// An error is transient when its message contains a marker.
    ///
    /// Errors without a message are never transient.
    pub fn is_transient(&self, err: &Error) -> bool {
        let Some(message) = err.message() else {
            return false;
        };
        let message = message.to_lowercase();
        self.transient_markers
            .iter()
            .any(|marker| message.contains(marker.as_str()))
    }
}

type SleepFn = Box<dyn Fn(Duration) + Send + Sync>;

/// Opens connections, retrying transient dial failures.
pub struct ConnectionOpener<D = TransportDialer> {
    dialer: D,
    policy: RetryPolicy,
    sleep: SleepFn,
    poll_interval: Duration,
    max_poll_duration: Option<Duration>,
}

impl<D: std::fmt::Debug> std::fmt::Debug for ConnectionOpener<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOpener")
            .field("dialer", &self.dialer)
            .field("policy", &self.policy)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_duration", &self.max_poll_duration)
            .finish_non_exhaustive()
    }
}

impl Default for ConnectionOpener<TransportDialer> {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionOpener<TransportDialer> {
    /// An opener that dials the real transports.
    pub fn new() -> Self {
        Self::with_dialer(TransportDialer)
    }
}

impl<D: Dialer> ConnectionOpener<D> {
    pub fn with_dialer(dialer: D) -> Self {
        Self {
            dialer,
            policy: RetryPolicy::default(),
            sleep: Box::new(thread::sleep),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_duration: None,
        }
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the function used to wait between attempts.
    pub fn sleep_fn(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Poll interval for RPC executors created by this opener.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Poll ceiling for RPC executors created by this opener.
    pub fn max_poll_duration(mut self, limit: Duration) -> Self {
        self.max_poll_duration = Some(limit);
        self
    }

    pub fn dialer(&self) -> &D {
        &self.dialer
    }

    /// Dial the backend for `connection` and mark it open.
    ///
    /// An already open connection is returned untouched. Transient failures
    /// are retried `connect_retries` times, sleeping `connect_timeout`
    /// seconds after each one; any other failure is returned at once.
    pub fn open<'c>(&self, connection: &'c mut Connection) -> Result<&'c mut Connection> {
        let span = connection.span().clone();
        let _enter = span.enter();

        if connection.is_open() {
            debug!("Connection is already open, skipping open.");
            return Ok(connection);
        }

        let creds = connection.credentials();
        let retries = creds.connect_retry_count();
        let delay = creds.connect_timeout_duration();

        let mut last_err = None;
        let mut dialed = None;
        for attempt in 0..=retries {
            match self.dialer.dial(creds, &span) {
                Ok(handle) => {
                    dialed = Some(handle);
                    break;
                }
                Err(e) => {
                    if !self.policy.is_transient(&e) {
                        return Err(e);
                    }
                    let message = e.message().unwrap_or_default();
                    warn!(
                        error = %message,
                        delay_secs = delay.as_secs(),
                        attempt = attempt + 1,
                        retries,
                        "Warning: {}\n\tRetrying in {} seconds ({} of {})",
                        message,
                        delay.as_secs(),
                        attempt + 1,
                        retries
                    );
                    (self.sleep)(delay);
                    last_err = Some(e);
                }
            }
        }

        let handle = match dialed {
            Some(Dialed::Rpc(session)) => {
                let mut executor =
                    RpcQueryExecutor::new(session, span.clone()).poll_interval(self.poll_interval);
                if let Some(limit) = self.max_poll_duration {
                    executor = executor.max_poll_duration(limit);
                }
                ConnectionHandle::Rpc(executor)
            }
            Some(Dialed::Shell(executor)) => ConnectionHandle::Shell(executor),
            None => {
                return Err(last_err.unwrap_or_else(|| {
                    Error::connection(ConnectionErrorKind::Connect, "No connection attempt was made")
                }));
            }
        };

        connection.attach(handle);
        info!("Connection opened");
        Ok(connection)
    }
}
