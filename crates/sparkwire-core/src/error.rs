//! Error types for sparkwire operations.
//!
//! Every transport reports failures through [`Error`], so callers cannot tell
//! whether a query error came from a Thrift status, a poll response or text
//! scraped out of a REPL.

use std::fmt;

/// The primary error type for all sparkwire operations.
#[derive(Debug)]
pub enum Error {
    /// A required credential field is missing or out of range
    Config(ConfigError),
    /// Dialing the backend failed
    Connection(ConnectionError),
    /// A submitted statement did not finish successfully
    Query(QueryError),
    /// Malformed wire data or a remote application exception
    Protocol(ProtocolError),
    /// Environment-level I/O errors (sockets, pipes, processes)
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct ConfigError {
    /// The offending credential key, when a single key is at fault
    pub key: Option<String>,
    /// The connection method label used in the message
    pub method: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish the transport
    Connect,
    /// Authentication or session handshake rejected
    Authentication,
    /// The backend answered with an HTTP error status
    Http,
    /// The connection was used while closed
    Closed,
    /// The shell process exited or its pipes closed
    Disconnected,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The backend reported an explicit error message
    Database,
    /// The operation reached a terminal state other than finished
    UnexpectedState,
    /// Free-text shell output contained an exception or error marker
    ShellOutput,
    /// The poll loop exceeded its configured ceiling
    Timeout,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub raw_data: Option<Vec<u8>>,
}

impl Error {
    /// Build the error raised when a required credential key is missing.
    pub fn missing_config(key: &str, method: &str) -> Self {
        Error::Config(ConfigError {
            key: Some(key.to_string()),
            method: Some(method.to_string()),
            message: format!(
                "The config '{}' is required when using the {} method to connect to Spark",
                key, method
            ),
        })
    }

    /// Build a configuration error that is not tied to a single missing key.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            key: None,
            method: None,
            message: message.into(),
        })
    }

    pub fn connection(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: None,
            sqlstate: None,
            message: message.into(),
        })
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(ProtocolError {
            message: message.into(),
            raw_data: None,
        })
    }

    /// The message carried by this error, if it has one.
    ///
    /// Retry classification only looks at this text; an error without a
    /// message is never considered transient.
    pub fn message(&self) -> Option<String> {
        let message = match self {
            Error::Config(e) => e.message.clone(),
            Error::Connection(e) => e.message.clone(),
            Error::Query(e) => e.message.clone(),
            Error::Protocol(e) => e.message.clone(),
            Error::Io(e) => e.to_string(),
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }

    /// Is this an environment-level (I/O) error?
    pub fn is_environment(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    pub fn is_query_error(&self) -> bool {
        matches!(self, Error::Query(_))
    }

    /// Attach the SQL text that produced a query error.
    pub fn with_sql(self, sql: &str) -> Self {
        match self {
            Error::Query(mut q) => {
                q.sql = Some(sql.to_string());
                Error::Query(q)
            }
            other => other,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_config(format!("Invalid credentials: {}", err))
    }
}

/// Result type alias for sparkwire operations.
pub type Result<T> = std::result::Result<T, Error>;
