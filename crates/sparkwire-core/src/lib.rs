//! Core types for sparkwire.
//!
//! `sparkwire-core` holds what every transport shares:
//!
//! - [`ConnectionMethod`] and [`ShellType`] registries
//! - [`Credentials`] with their contract checks and per-method validation
//! - the [`Error`] taxonomy
//! - [`Value`], [`Row`] and [`Table`] for bindings and results

pub mod binding;
pub mod credentials;
pub mod error;
pub mod method;
pub mod row;
pub mod validate;
pub mod value;

pub use binding::{normalize_binding, normalize_bindings};
pub use credentials::{Credentials, ShellConfig};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, ProtocolError, QueryError,
    QueryErrorKind, Result,
};
pub use method::{ConnectionMethod, ShellType};
pub use row::{ColumnDesc, ColumnInfo, ExecuteResult, Row, STATUS_OK, Table};
pub use validate::{CredentialFields, validate_creds, validate_for_method};
pub use value::Value;
