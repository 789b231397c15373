//! Spark connection credentials.
//!
//! Credentials are usually deserialized from a profile. Deserialization
//! enforces the declarative contract (known fields only, bounded timeouts)
//! and applies the `organization` and `database` defaults.

use crate::error::{Error, Result};
use crate::method::{ConnectionMethod, ShellType};
use crate::validate::CredentialFields;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Upper bound for `connect_timeout` (seconds) and `connect_retries`.
pub const MAX_CONNECT_SETTING: u64 = 60;

/// Delay between dial attempts when `connect_timeout` is unset.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Organization used when the profile does not name one.
pub const DEFAULT_ORGANIZATION: &str = "0";

/// Nested `spark_shell` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    pub shell_type: Option<ShellType>,
    /// Command line launched through `sh -c`
    pub cmd: Option<String>,
    /// Ready sentinel override; defaults to the shell type's prompt
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ShellConfig {
    pub fn new(shell_type: ShellType, cmd: impl Into<String>) -> Self {
        Self {
            shell_type: Some(shell_type),
            cmd: Some(cmd.into()),
            prompt: None,
        }
    }

    /// Set the ready sentinel the session waits for.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

impl CredentialFields for ShellConfig {
    fn contains_key(&self, key: &str) -> bool {
        match key {
            "shell_type" => self.shell_type.is_some(),
            "cmd" => self.cmd.as_deref().is_some_and(|c| !c.trim().is_empty()),
            "prompt" => self.prompt.is_some(),
            _ => false,
        }
    }
}

/// Credentials for one Spark connection.
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawCredentials")]
pub struct Credentials {
    pub method: ConnectionMethod,
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub organization: String,
    pub cluster: Option<String>,
    pub database: String,
    pub schema: String,
    token: Option<String>,
    pub connect_timeout: Option<u64>,
    pub connect_retries: Option<u64>,
    pub spark_shell: Option<ShellConfig>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCredentials {
    method: ConnectionMethod,
    host: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default, deserialize_with = "deserialize_organization")]
    organization: Option<String>,
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default)]
    database: Option<String>,
    schema: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    connect_timeout: Option<u64>,
    #[serde(default)]
    connect_retries: Option<u64>,
    #[serde(default)]
    spark_shell: Option<ShellConfig>,
}

impl TryFrom<RawCredentials> for Credentials {
    type Error = Error;

    fn try_from(raw: RawCredentials) -> Result<Self> {
        let creds = Credentials {
            method: raw.method,
            host: raw.host,
            port: raw.port,
            user: raw.user,
            organization: raw
                .organization
                .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
            cluster: raw.cluster,
            database: raw.database.unwrap_or_else(|| raw.schema.clone()),
            schema: raw.schema,
            token: raw.token,
            connect_timeout: raw.connect_timeout,
            connect_retries: raw.connect_retries,
            spark_shell: raw.spark_shell,
        };
        creds.validate_contract()?;
        Ok(creds)
    }
}

/// Accept the organization as either a string or a number.
fn deserialize_organization<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }),
    )
}

impl Credentials {
    /// Create credentials with the required fields; `database` follows `schema`.
    pub fn new(
        method: ConnectionMethod,
        host: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        let schema = schema.into();
        Self {
            method,
            host: host.into(),
            port: None,
            user: None,
            organization: DEFAULT_ORGANIZATION.to_string(),
            cluster: None,
            database: schema.clone(),
            schema,
            token: None,
            connect_timeout: None,
            connect_retries: None,
            spark_shell: None,
        }
    }

    /// Parse and validate credentials from a JSON profile.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the user name.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the workspace organization id.
    pub fn organization(mut self, organization: impl ToString) -> Self {
        self.organization = organization.to_string();
        self
    }

    /// Set the cluster id.
    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Set the database, overriding the schema default.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the personal access token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the delay between dial attempts, in seconds.
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = Some(secs);
        self
    }

    /// Set how many times a transient dial failure is retried.
    pub fn connect_retries(mut self, retries: u64) -> Self {
        self.connect_retries = Some(retries);
        self
    }

    /// Set the nested shell configuration.
    pub fn spark_shell(mut self, shell: ShellConfig) -> Self {
        self.spark_shell = Some(shell);
        self
    }

    /// The access token, if configured. Never logged.
    pub fn token_value(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Delay between dial attempts.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    /// Number of retries after the first dial attempt.
    pub fn connect_retry_count(&self) -> u64 {
        self.connect_retries.unwrap_or(0)
    }

    /// Adapter type name.
    pub fn adapter_type(&self) -> &'static str {
        "spark"
    }

    /// Keys shown when describing the connection target.
    pub fn connection_keys(&self) -> Vec<(&'static str, String)> {
        vec![
            ("host", self.host.clone()),
            ("port", self.port.map(|p| p.to_string()).unwrap_or_default()),
            ("cluster", self.cluster.clone().unwrap_or_default()),
            ("schema", self.schema.clone()),
            ("organization", self.organization.clone()),
        ]
    }

    /// Check the bounds the profile contract declares.
    pub fn validate_contract(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::invalid_config("The config 'host' must not be empty"));
        }
        if self.schema.trim().is_empty() {
            return Err(Error::invalid_config("The config 'schema' must not be empty"));
        }
        for (key, value) in [
            ("connect_timeout", self.connect_timeout),
            ("connect_retries", self.connect_retries),
        ] {
            if let Some(value) = value {
                if value > MAX_CONNECT_SETTING {
                    return Err(Error::invalid_config(format!(
                        "The config '{}' must be between 0 and {}, got {}",
                        key, MAX_CONNECT_SETTING, value
                    )));
                }
            }
        }
        Ok(())
    }
}

impl CredentialFields for Credentials {
    fn contains_key(&self, key: &str) -> bool {
        fn present(value: Option<&String>) -> bool {
            value.is_some_and(|v| !v.is_empty())
        }

        match key {
            "method" => true,
            "host" => !self.host.is_empty(),
            "port" => self.port.is_some(),
            "user" => present(self.user.as_ref()),
            "organization" => !self.organization.is_empty(),
            "cluster" => present(self.cluster.as_ref()),
            "database" => !self.database.is_empty(),
            "schema" => !self.schema.is_empty(),
            "token" => present(self.token.as_ref()),
            "connect_timeout" => self.connect_timeout.is_some(),
            "connect_retries" => self.connect_retries.is_some(),
            "spark_shell" => self.spark_shell.is_some(),
            _ => false,
        }
    }
}

// Keep the token out of debug output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("method", &self.method)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("organization", &self.organization)
            .field("cluster", &self.cluster)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("connect_retries", &self.connect_retries)
            .field("spark_shell", &self.spark_shell)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_applies_defaults() {
        let creds = Credentials::from_json(
            r#"{"method": "thrift", "host": "spark.local", "schema": "analytics"}"#,
        )
        .unwrap();
        assert_eq!(creds.method, ConnectionMethod::Thrift);
        assert_eq!(creds.organization, "0");
        assert_eq!(creds.database, "analytics");
        assert_eq!(creds.connect_timeout_duration(), Duration::from_secs(10));
        assert_eq!(creds.connect_retry_count(), 0);
    }

    #[test]
    fn numeric_organization_is_coerced() {
        let creds = Credentials::from_json(
            r#"{"method": "http", "host": "h", "schema": "s", "organization": 1234567}"#,
        )
        .unwrap();
        assert_eq!(creds.organization, "1234567");
    }

    #[test]
    fn explicit_database_wins() {
        let creds = Credentials::from_json(
            r#"{"method": "http", "host": "h", "schema": "s", "database": "d"}"#,
        )
        .unwrap();
        assert_eq!(creds.database, "d");
        assert_eq!(creds.schema, "s");
    }

    #[test]
    fn out_of_range_timeout_rejected() {
        let err = Credentials::from_json(
            r#"{"method": "thrift", "host": "h", "schema": "s", "connect_timeout": 61}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("connect_timeout"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = Credentials::from_json(
            r#"{"method": "thrift", "host": "h", "schema": "s", "password": "x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_method_rejected() {
        assert!(
            Credentials::from_json(r#"{"method": "odbc", "host": "h", "schema": "s"}"#).is_err()
        );
    }

    #[test]
    fn nested_shell_config() {
        let creds = Credentials::from_json(
            r#"{"method": "spark-shell", "host": "localhost", "schema": "s",
                "spark_shell": {"shell_type": "scala", "cmd": "spark-shell"}}"#,
        )
        .unwrap();
        let shell = creds.spark_shell.unwrap();
        assert_eq!(shell.shell_type, Some(ShellType::Scala));
        assert_eq!(shell.cmd.as_deref(), Some("spark-shell"));
        assert!(shell.prompt.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let creds = Credentials::new(ConnectionMethod::Http, "h", "s").token("dapi-secret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("dapi-secret"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(creds.token_value(), Some("dapi-secret"));
    }

    #[test]
    fn contains_key_tracks_presence() {
        let creds = Credentials::new(ConnectionMethod::Http, "h", "s").port(443);
        assert!(creds.contains_key("host"));
        assert!(creds.contains_key("port"));
        assert!(creds.contains_key("organization"));
        assert!(!creds.contains_key("token"));
        assert!(!creds.contains_key("cluster"));
        assert!(!creds.contains_key("not_a_key"));
    }

    #[test]
    fn connection_keys_order() {
        let creds = Credentials::new(ConnectionMethod::Http, "h", "s")
            .port(443)
            .cluster("c-1");
        let keys: Vec<_> = creds.connection_keys().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["host", "port", "cluster", "schema", "organization"]);
    }
}
