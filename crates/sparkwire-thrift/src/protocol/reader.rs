//! Thrift binary protocol decoder.

#![allow(clippy::cast_sign_loss)]

use super::{FieldHeader, MessageHeader, MessageType, TYPE_MASK, VERSION_1, VERSION_MASK, ttype};
use sparkwire_core::error::{Error, ProtocolError, Result};

/// Nesting depth at which `skip` gives up.
const MAX_SKIP_DEPTH: usize = 64;

/// Cursor over one complete Thrift message.
#[derive(Debug)]
pub struct ThriftReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ThriftReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Protocol(ProtocolError {
                message: format!(
                    "Unexpected end of message: needed {} bytes at offset {}, {} left",
                    n,
                    self.pos,
                    self.remaining()
                ),
                raw_data: Some(self.buf.to_vec()),
            }));
        }
        let buf = self.buf;
        let slice = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a strict message header.
    pub fn read_message_begin(&mut self) -> Result<MessageHeader> {
        let header = u32::from_be_bytes(self.take_array()?);
        if header & VERSION_MASK != VERSION_1 {
            return Err(Error::protocol(format!(
                "Bad message version: {:#010x}",
                header
            )));
        }
        let raw_type = (header & TYPE_MASK) as u8;
        let message_type = MessageType::from_u8(raw_type)
            .ok_or_else(|| Error::protocol(format!("Unknown message type {}", raw_type)))?;
        let name = self.read_string()?;
        let seq_id = self.read_i32()?;
        Ok(MessageHeader {
            name,
            message_type,
            seq_id,
        })
    }

    pub fn read_field_begin(&mut self) -> Result<FieldHeader> {
        let field_type = self.read_u8()?;
        if field_type == ttype::STOP {
            return Ok(FieldHeader { field_type, id: 0 });
        }
        let id = self.read_i16()?;
        Ok(FieldHeader { field_type, id })
    }

    /// Read a list or set header, returning the element type and length.
    pub fn read_list_begin(&mut self) -> Result<(u8, usize)> {
        let elem_type = self.read_u8()?;
        let len = self.read_len()?;
        Ok((elem_type, len))
    }

    /// Read a map header, returning key type, value type and length.
    pub fn read_map_begin(&mut self) -> Result<(u8, u8, usize)> {
        let key_type = self.read_u8()?;
        let value_type = self.read_u8()?;
        let len = self.read_len()?;
        Ok((key_type, value_type, len))
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::protocol(format!("Negative length {}", len)));
        }
        Ok(len as usize)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_byte(&mut self) -> Result<i8> {
        Ok(i8::from_be_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_be_bytes(self.take_array()?)))
    }

    pub fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a string; invalid UTF-8 is replaced rather than rejected.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    /// Skip over a value of the given wire type.
    pub fn skip(&mut self, field_type: u8) -> Result<()> {
        self.skip_depth(field_type, 0)
    }

    fn skip_depth(&mut self, field_type: u8, depth: usize) -> Result<()> {
        if depth > MAX_SKIP_DEPTH {
            return Err(Error::protocol("Maximum skip depth exceeded"));
        }
        match field_type {
            ttype::BOOL | ttype::BYTE => {
                self.take(1)?;
            }
            ttype::I16 => {
                self.take(2)?;
            }
            ttype::I32 => {
                self.take(4)?;
            }
            ttype::I64 | ttype::DOUBLE => {
                self.take(8)?;
            }
            ttype::STRING => {
                let len = self.read_len()?;
                self.take(len)?;
            }
            ttype::STRUCT => loop {
                let field = self.read_field_begin()?;
                if field.is_stop() {
                    break;
                }
                self.skip_depth(field.field_type, depth + 1)?;
            },
            ttype::MAP => {
                let (k, v, len) = self.read_map_begin()?;
                for _ in 0..len {
                    self.skip_depth(k, depth + 1)?;
                    self.skip_depth(v, depth + 1)?;
                }
            }
            ttype::SET | ttype::LIST => {
                let (elem, len) = self.read_list_begin()?;
                for _ in 0..len {
                    self.skip_depth(elem, depth + 1)?;
                }
            }
            other => {
                return Err(Error::protocol(format!("Cannot skip unknown type {}", other)));
            }
        }
        Ok(())
    }
}
