//! Framed transports carrying Thrift messages.
//!
//! Two transports are provided: a TCP socket with SASL PLAIN framing for the
//! `thrift` method, and HTTPS POSTs for the `http` method.

use sparkwire_core::error::{ConnectionError, ConnectionErrorKind, Error, Result};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use ureq::Agent;

/// Sends one encoded Thrift message and returns the encoded reply.
pub trait ThriftTransport: Send {
    fn call(&mut self, request: &[u8]) -> Result<Vec<u8>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// SASL negotiation status bytes.
mod sasl {
    pub const START: u8 = 1;
    pub const OK: u8 = 2;
    pub const BAD: u8 = 3;
    pub const ERROR: u8 = 4;
    pub const COMPLETE: u8 = 5;
}

/// Largest frame accepted from the server.
const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// TCP transport with SASL PLAIN authentication and length-prefixed frames.
#[derive(Debug)]
pub struct SaslTransport {
    stream: TcpStream,
    closed: bool,
}

impl SaslTransport {
    /// Connect to `host:port` and complete the PLAIN handshake.
    pub fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let stream = connect_tcp(host, port, timeout)?;
        stream.set_nodelay(true).ok();
        let mut transport = Self {
            stream,
            closed: false,
        };
        transport.authenticate(user, password)?;
        Ok(transport)
    }

    fn authenticate(&mut self, user: &str, password: &str) -> Result<()> {
        let mut credentials = Vec::with_capacity(user.len() + password.len() + 2);
        credentials.push(0);
        credentials.extend_from_slice(user.as_bytes());
        credentials.push(0);
        credentials.extend_from_slice(password.as_bytes());

        self.write_sasl(sasl::START, b"PLAIN")?;
        self.write_sasl(sasl::OK, &credentials)?;
        self.stream.flush()?;

        loop {
            let (status, payload) = self.read_sasl()?;
            match status {
                sasl::COMPLETE => {
                    tracing::debug!(user = %user, "SASL PLAIN handshake complete");
                    return Ok(());
                }
                sasl::OK => continue,
                sasl::BAD | sasl::ERROR => {
                    return Err(Error::connection(
                        ConnectionErrorKind::Authentication,
                        format!(
                            "SASL authentication failed: {}",
                            String::from_utf8_lossy(&payload)
                        ),
                    ));
                }
                other => {
                    return Err(Error::protocol(format!(
                        "Unexpected SASL status {}",
                        other
                    )));
                }
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_sasl(&mut self, status: u8, payload: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(payload.len() + 5);
        frame.push(status);
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(payload);
        self.stream.write_all(&frame)?;
        Ok(())
    }

    fn read_sasl(&mut self) -> Result<(u8, Vec<u8>)> {
        let mut status = [0u8; 1];
        self.stream.read_exact(&mut status)?;
        let payload = self.read_frame()?;
        Ok((status[0], payload))
    }

    fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len)?;
        let len = u32::from_be_bytes(len) as usize;
        if len > MAX_FRAME_LEN {
            return Err(Error::protocol(format!("Frame of {} bytes is too large", len)));
        }
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload)?;
        Ok(payload)
    }
}

impl ThriftTransport for SaslTransport {
    #[allow(clippy::cast_possible_truncation)]
    fn call(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::connection(
                ConnectionErrorKind::Closed,
                "Transport is closed",
            ));
        }
        let mut frame = Vec::with_capacity(request.len() + 4);
        frame.extend_from_slice(&(request.len() as u32).to_be_bytes());
        frame.extend_from_slice(request);
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        self.read_frame()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let target = format!("{}:{}", host, port);
    let addrs = (host, port).to_socket_addrs().map_err(|e| {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Connect,
            message: format!("Failed to resolve {}: {}", target, e),
            source: Some(Box::new(e)),
        })
    })?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Connect,
            message: format!("Failed to connect to {}: {}", target, e),
            source: Some(Box::new(e)),
        }),
        None => Error::connection(
            ConnectionErrorKind::Connect,
            format!("No addresses found for {}", target),
        ),
    })
}

/// Thrift over HTTP(S): one POST per message.
pub struct HttpTransport {
    agent: Agent,
    url: String,
    headers: Vec<(String, String)>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // header values carry credentials
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field(
                "headers",
                &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, headers: Vec<(String, String)>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            url: url.into(),
            headers,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ThriftTransport for HttpTransport {
    fn call(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let mut builder = self
            .agent
            .post(&self.url)
            .header("Content-Type", "application/x-thrift")
            .header("Accept", "application/x-thrift");
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send(request).map_err(map_ureq_error)?;
        let status = response.status().as_u16();
        let mut reader = response.into_body().into_reader();
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;

        if status >= 400 {
            return Err(Error::connection(
                ConnectionErrorKind::Http,
                format!(
                    "HTTP Response code: {}, {}",
                    status,
                    String::from_utf8_lossy(&body).trim()
                ),
            ));
        }
        Ok(body)
    }
}

fn map_ureq_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Io(e) => Error::Io(e),
        ureq::Error::StatusCode(status) => Error::connection(
            ConnectionErrorKind::Http,
            format!("HTTP Response code: {}", status),
        ),
        ureq::Error::Timeout(_) => {
            Error::connection(ConnectionErrorKind::Connect, "HTTP request timed out")
        }
        other => Error::connection(
            ConnectionErrorKind::Http,
            format!("HTTP transport error: {}", other),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn read_sasl_frame(stream: &mut TcpStream) -> (u8, Vec<u8>) {
        let mut header = [0u8; 5];
        stream.read_exact(&mut header).unwrap();
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).unwrap();
        (header[0], payload)
    }

    #[test]
    fn sasl_plain_handshake_and_framed_call() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            assert_eq!(read_sasl_frame(&mut stream), (1, b"PLAIN".to_vec()));
            assert_eq!(read_sasl_frame(&mut stream), (2, b"\0alice\0x".to_vec()));
            stream.write_all(&[5, 0, 0, 0, 0]).unwrap();

            let mut len = [0u8; 4];
            stream.read_exact(&mut len).unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
            stream.read_exact(&mut body).unwrap();
            assert_eq!(body, b"ping");
            stream.write_all(&[0, 0, 0, 4]).unwrap();
            stream.write_all(b"pong").unwrap();
        });

        let mut transport =
            SaslTransport::connect("127.0.0.1", port, "alice", "x", Duration::from_secs(5))
                .unwrap();
        assert_eq!(transport.call(b"ping").unwrap(), b"pong");
        transport.close().unwrap();
        server.join().unwrap();

        let err = transport.call(b"ping").unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn sasl_rejection_is_authentication_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_sasl_frame(&mut stream);
            read_sasl_frame(&mut stream);
            let reason = b"bad credentials";
            stream.write_all(&[4, 0, 0, 0, reason.len() as u8]).unwrap();
            stream.write_all(reason).unwrap();
        });

        let err = SaslTransport::connect("127.0.0.1", port, "bob", "x", Duration::from_secs(5))
            .unwrap_err();
        server.join().unwrap();
        match err {
            Error::Connection(c) => {
                assert_eq!(c.kind, ConnectionErrorKind::Authentication);
                assert!(c.message.contains("bad credentials"));
            }
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[test]
    fn refused_connection_is_connect_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = SaslTransport::connect("127.0.0.1", port, "u", "x", Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn http_debug_hides_header_values() {
        let transport = HttpTransport::new(
            "https://example.invalid/sql",
            vec![("Authorization".into(), "Basic c2VjcmV0".into())],
            Duration::from_secs(1),
        );
        let debug = format!("{:?}", transport);
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}
