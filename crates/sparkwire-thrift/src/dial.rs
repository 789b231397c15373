//! Dialers for the `thrift` and `http` connection methods.

use crate::session::{HiveSession, SessionOptions};
use crate::transport::{HttpTransport, SaslTransport};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sparkwire_core::credentials::Credentials;
use sparkwire_core::error::Result;
use sparkwire_core::validate::{HTTP_REQUIRED, THRIFT_REQUIRED, validate_creds};
use std::time::Duration;
use tracing::{Span, info};

/// Port used by the `thrift` method when none is configured.
pub const DEFAULT_THRIFT_PORT: u16 = 10000;

/// Password sent with SASL PLAIN; the server ignores it.
pub const SASL_PLAIN_PASSWORD: &str = "x";

/// Socket and HTTP request timeout.
pub const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(60);

/// The endpoint used by the `http` method.
pub fn connection_url(creds: &Credentials) -> String {
    format!(
        "https://{}:{}/sql/protocolv1/o/{}/{}",
        creds.host,
        creds.port.map(|p| p.to_string()).unwrap_or_default(),
        creds.organization,
        creds.cluster.as_deref().unwrap_or_default()
    )
}

/// `Authorization` header value for token auth.
pub fn basic_auth_header(token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("token:{}", token)))
}

/// The user name presented over SASL when none is configured.
pub fn default_user() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Connect over a SASL socket and open a session.
pub fn open_thrift(creds: &Credentials, span: Span) -> Result<HiveSession> {
    validate_creds(creds, THRIFT_REQUIRED, creds.method.as_str())?;

    let port = creds.port.unwrap_or(DEFAULT_THRIFT_PORT);
    let user = creds.user.clone().unwrap_or_else(default_user);
    span.in_scope(|| info!(host = %creds.host, port, user = %user, "Connecting over thrift"));

    let transport =
        SaslTransport::connect(&creds.host, port, &user, SASL_PLAIN_PASSWORD, TRANSPORT_TIMEOUT)?;
    HiveSession::open(
        Box::new(transport),
        SessionOptions {
            username: Some(user),
            ..SessionOptions::default()
        },
        span,
    )
}

/// Connect over HTTPS with token auth and open a session.
pub fn open_http(creds: &Credentials, span: Span) -> Result<HiveSession> {
    validate_creds(creds, HTTP_REQUIRED, creds.method.as_str())?;

    let url = connection_url(creds);
    span.in_scope(|| info!(url = %url, "Connecting over http"));

    let token = creds.token_value().unwrap_or_default();
    let transport = HttpTransport::new(
        url,
        vec![("Authorization".to_string(), basic_auth_header(token))],
        TRANSPORT_TIMEOUT,
    );
    HiveSession::open(Box::new(transport), SessionOptions::default(), span)
}
