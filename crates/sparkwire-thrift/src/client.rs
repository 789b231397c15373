//! TCLIService client over a framed transport.

use crate::protocol::{MessageType, ThriftReader, ThriftWriter, ttype};
use crate::tcli::{HasStatus, TRead, TcliRequest};
use crate::transport::ThriftTransport;
use sparkwire_core::error::{Error, ProtocolError, Result};

/// Synchronous request/response client for one TCLIService connection.
pub struct TcliClient {
    transport: Box<dyn ThriftTransport>,
    writer: ThriftWriter,
    seq_id: i32,
}

impl std::fmt::Debug for TcliClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcliClient")
            .field("seq_id", &self.seq_id)
            .finish_non_exhaustive()
    }
}

impl TcliClient {
    pub fn new(transport: Box<dyn ThriftTransport>) -> Self {
        Self {
            transport,
            writer: ThriftWriter::new(),
            seq_id: 0,
        }
    }

    /// Send one request and decode its reply.
    ///
    /// Error statuses in the reply are turned into query errors.
    pub fn call<R: TcliRequest>(&mut self, request: &R) -> Result<R::Response> {
        self.seq_id = self.seq_id.wrapping_add(1);
        tracing::trace!(method = R::METHOD, seq_id = self.seq_id, "TCLIService call");

        self.writer.clear();
        self.writer
            .write_message_begin(R::METHOD, MessageType::Call, self.seq_id);
        self.writer.write_field_begin(ttype::STRUCT, 1);
        request.write(&mut self.writer);
        self.writer.write_field_stop();

        let reply = self.transport.call(self.writer.as_bytes())?;
        let mut r = ThriftReader::new(&reply);
        let header = r.read_message_begin()?;
        match header.message_type {
            MessageType::Reply => {}
            MessageType::Exception => return Err(read_application_exception(&mut r)?),
            other => {
                return Err(Error::protocol(format!(
                    "Unexpected message type {:?} in reply to {}",
                    other,
                    R::METHOD
                )));
            }
        }
        if header.name != R::METHOD || header.seq_id != self.seq_id {
            return Err(Error::Protocol(ProtocolError {
                message: format!(
                    "Reply {}#{} does not match call {}#{}",
                    header.name,
                    header.seq_id,
                    R::METHOD,
                    self.seq_id
                ),
                raw_data: Some(reply.clone()),
            }));
        }

        let mut success = None;
        loop {
            let field = r.read_field_begin()?;
            if field.is_stop() {
                break;
            }
            if field.id == 0 && field.field_type == ttype::STRUCT {
                success = Some(R::Response::read(&mut r)?);
            } else {
                r.skip(field.field_type)?;
            }
        }
        let response = success
            .ok_or_else(|| Error::protocol(format!("{} returned no result", R::METHOD)))?;
        response.status().check()?;
        Ok(response)
    }

    /// Close the underlying transport.
    pub fn close(&mut self) -> Result<()> {
        self.transport.close()
    }
}

/// Decode a `TApplicationException` into a protocol error.
fn read_application_exception(r: &mut ThriftReader<'_>) -> Result<Error> {
    let mut message = None;
    let mut kind = 0;
    loop {
        let field = r.read_field_begin()?;
        if field.is_stop() {
            break;
        }
        match (field.id, field.field_type) {
            (1, ttype::STRING) => message = Some(r.read_string()?),
            (2, ttype::I32) => kind = r.read_i32()?,
            _ => r.skip(field.field_type)?,
        }
    }
    Ok(Error::protocol(format!(
        "Application exception (type {}): {}",
        kind,
        message.unwrap_or_default()
    )))
}
