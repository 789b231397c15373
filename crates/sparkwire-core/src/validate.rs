//! Required-field checks per connection method.

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::method::ConnectionMethod;

/// Keys required by the `thrift` method.
pub const THRIFT_REQUIRED: &[&str] = &["host"];

/// Keys required by the `http` method.
pub const HTTP_REQUIRED: &[&str] = &["token", "host", "port", "cluster", "organization"];

/// Keys required on the credentials by the `spark-shell` method.
pub const SHELL_REQUIRED: &[&str] = &["spark_shell"];

/// Keys required on the nested `spark_shell` config.
pub const SHELL_CONFIG_REQUIRED: &[&str] = &["shell_type", "cmd"];

/// A record whose fields can be checked for presence by key.
pub trait CredentialFields {
    /// Whether `key` is set to a usable value.
    fn contains_key(&self, key: &str) -> bool;
}

/// Fail on the first key in `required` that `fields` does not contain.
pub fn validate_creds<F>(fields: &F, required: &[&str], method: &str) -> Result<()>
where
    F: CredentialFields + ?Sized,
{
    match required.iter().find(|key| !fields.contains_key(key)) {
        Some(key) => Err(Error::missing_config(key, method)),
        None => Ok(()),
    }
}

/// Run the required-field checks for the credentials' own method.
pub fn validate_for_method(creds: &Credentials) -> Result<()> {
    let label = creds.method.as_str();
    match creds.method {
        ConnectionMethod::Thrift => validate_creds(creds, THRIFT_REQUIRED, label),
        ConnectionMethod::Http => validate_creds(creds, HTTP_REQUIRED, label),
        ConnectionMethod::SparkShell => {
            validate_creds(creds, SHELL_REQUIRED, label)?;
            match &creds.spark_shell {
                Some(shell) => validate_creds(shell, SHELL_CONFIG_REQUIRED, label),
                None => Err(Error::missing_config("spark_shell", label)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ShellConfig;
    use crate::method::ShellType;

    fn missing_key(err: Error) -> String {
        match err {
            Error::Config(c) => c.key.unwrap_or_default(),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn thrift_needs_only_host() {
        let creds = Credentials::new(ConnectionMethod::Thrift, "spark.local", "s");
        assert!(validate_for_method(&creds).is_ok());
    }

    #[test]
    fn http_reports_first_missing_key_in_order() {
        let creds = Credentials::new(ConnectionMethod::Http, "h", "s");
        assert_eq!(missing_key(validate_for_method(&creds).unwrap_err()), "token");

        let creds = creds.token("t");
        assert_eq!(missing_key(validate_for_method(&creds).unwrap_err()), "port");

        let creds = creds.port(443);
        let err = validate_for_method(&creds).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: The config 'cluster' is required when using the http method to connect to Spark"
        );

        let creds = creds.cluster("0123-abc");
        assert!(validate_for_method(&creds).is_ok());
    }

    #[test]
    fn shell_checks_nested_config_with_outer_label() {
        let creds = Credentials::new(ConnectionMethod::SparkShell, "localhost", "s");
        assert_eq!(
            missing_key(validate_for_method(&creds).unwrap_err()),
            "spark_shell"
        );

        let creds = creds.spark_shell(ShellConfig {
            shell_type: Some(ShellType::Python),
            cmd: None,
            prompt: None,
        });
        let err = validate_for_method(&creds).unwrap_err();
        assert!(err.to_string().contains("spark-shell method"));
        assert_eq!(missing_key(err), "cmd");

        let creds = creds.spark_shell(ShellConfig::new(ShellType::Python, "pyspark"));
        assert!(validate_for_method(&creds).is_ok());
    }

    #[test]
    fn validate_creds_accepts_empty_requirement() {
        let shell = ShellConfig::default();
        assert!(validate_creds(&shell, &[], "spark-shell").is_ok());
        assert!(validate_creds(&shell, &["shell_type"], "spark-shell").is_err());
    }
}
