//! Connections and query execution against Spark.
//!
//! `sparkwire` reaches Spark through three interchangeable transports:
//!
//! - `thrift`: HiveServer2 over a TCP socket
//! - `http`: HiveServer2 over HTTPS with a personal access token
//! - `spark-shell`: an interactive `spark-shell`, `pyspark` or `spark-sql`
//!
//! # Example
//!
//! ```rust,ignore
//! use sparkwire::{Connection, ConnectionOpener, Credentials};
//!
//! let creds = Credentials::from_json(r#"{
//!     "method": "thrift", "host": "spark.local", "schema": "analytics",
//!     "connect_retries": 3
//! }"#)?;
//! let mut conn = Connection::new(creds);
//! ConnectionOpener::new().open(&mut conn)?;
//! let result = conn.execute("select 1 as one", &[], true)?;
//! assert_eq!(result.status, "OK");
//! conn.close()?;
//! ```

pub mod connection;
pub mod dialer;
pub mod opener;

pub use connection::{Connection, ConnectionHandle, ConnectionState};
pub use dialer::{Dialed, Dialer, TransportDialer};
pub use opener::{ConnectionOpener, DEFAULT_TRANSIENT_MARKERS, RetryPolicy};
pub use sparkwire_thrift::CancelHandle;

pub use sparkwire_core::{
    ConnectionMethod, Credentials, Error, ExecuteResult, Result, ShellConfig, ShellType, Table,
    Value,
};
