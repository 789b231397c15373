//! Transport method and shell type registries.
//!
//! Both sets are closed and fixed at compile time. Configuration parsing
//! validates against them and dispatch matches on the enums directly.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The transport used to reach the Spark backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionMethod {
    /// Binary Thrift RPC over a direct socket
    #[serde(rename = "thrift")]
    Thrift,
    /// Thrift RPC tunneled over HTTPS with token auth
    #[serde(rename = "http")]
    Http,
    /// Interactive REPL session driven over stdin/stdout
    #[serde(rename = "spark-shell")]
    SparkShell,
}

impl ConnectionMethod {
    /// Every supported method.
    pub const ALL: [ConnectionMethod; 3] = [
        ConnectionMethod::Thrift,
        ConnectionMethod::Http,
        ConnectionMethod::SparkShell,
    ];

    pub fn all_methods() -> &'static [ConnectionMethod] {
        &Self::ALL
    }

    /// The configuration identifier for this method.
    pub const fn as_str(self) -> &'static str {
        match self {
            ConnectionMethod::Thrift => "thrift",
            ConnectionMethod::Http => "http",
            ConnectionMethod::SparkShell => "spark-shell",
        }
    }

    /// Whether this method speaks the Thrift RPC protocol.
    pub const fn is_rpc(self) -> bool {
        matches!(self, ConnectionMethod::Thrift | ConnectionMethod::Http)
    }
}

impl fmt::Display for ConnectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "Unknown connection method '{}', expected one of: {}",
                    s,
                    join(Self::ALL.iter().map(|m| m.as_str()))
                ))
            })
    }
}

/// The flavour of REPL behind a `spark-shell` connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    Sql,
    Python,
    Scala,
}

impl ShellType {
    /// Every supported shell type.
    pub const ALL: [ShellType; 3] = [ShellType::Sql, ShellType::Python, ShellType::Scala];

    pub fn all_types() -> &'static [ShellType] {
        &Self::ALL
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ShellType::Sql => "sql",
            ShellType::Python => "python",
            ShellType::Scala => "scala",
        }
    }
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "Unknown shell type '{}', expected one of: {}",
                    s,
                    join(Self::ALL.iter().map(|t| t.as_str()))
                ))
            })
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_round_trips_through_str() {
        for method in ConnectionMethod::all_methods() {
            assert_eq!(method.as_str().parse::<ConnectionMethod>().unwrap(), *method);
        }
    }

    #[test]
    fn unknown_method_lists_known_set() {
        let err = "odbc".parse::<ConnectionMethod>().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("odbc"));
        assert!(text.contains("thrift, http, spark-shell"));
    }

    #[test]
    fn rpc_methods() {
        assert!(ConnectionMethod::Thrift.is_rpc());
        assert!(ConnectionMethod::Http.is_rpc());
        assert!(!ConnectionMethod::SparkShell.is_rpc());
    }

    #[test]
    fn shell_types() {
        assert_eq!(ShellType::all_types().len(), 3);
        assert_eq!("scala".parse::<ShellType>().unwrap(), ShellType::Scala);
        assert!("ruby".parse::<ShellType>().is_err());
    }

    #[test]
    fn serde_identifiers() {
        let m: ConnectionMethod = serde_json::from_str("\"spark-shell\"").unwrap();
        assert_eq!(m, ConnectionMethod::SparkShell);
        let t: ShellType = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(t, ShellType::Python);
    }
}
