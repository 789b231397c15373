//! Thrift binary protocol encoder.

#![allow(clippy::cast_possible_truncation)]

use super::{MessageType, VERSION_1, ttype};

/// Buffer for writing Thrift binary protocol data.
///
/// All multi-byte integers are written in big-endian (network) byte order.
#[derive(Debug, Clone)]
pub struct ThriftWriter {
    buf: Vec<u8>,
}

impl Default for ThriftWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThriftWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take ownership of the buffer, leaving an empty one in its place.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Write a strict message header.
    pub fn write_message_begin(&mut self, name: &str, message_type: MessageType, seq_id: i32) {
        let version = VERSION_1 | message_type as u32;
        self.buf.extend_from_slice(&version.to_be_bytes());
        self.write_string(name);
        self.write_i32(seq_id);
    }

    pub fn write_field_begin(&mut self, field_type: u8, id: i16) {
        self.buf.push(field_type);
        self.write_i16(id);
    }

    pub fn write_field_stop(&mut self) {
        self.buf.push(ttype::STOP);
    }

    pub fn write_list_begin(&mut self, elem_type: u8, len: usize) {
        self.buf.push(elem_type);
        self.write_i32(len as i32);
    }

    pub fn write_map_begin(&mut self, key_type: u8, value_type: u8, len: usize) {
        self.buf.push(key_type);
        self.buf.push(value_type);
        self.write_i32(len as i32);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_byte(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_double(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_binary(value.as_bytes());
    }

    /// Write length-prefixed bytes.
    pub fn write_binary(&mut self, value: &[u8]) {
        self.write_i32(value.len() as i32);
        self.buf.extend_from_slice(value);
    }

    // ==================== Field helpers ====================

    pub fn write_i32_field(&mut self, id: i16, value: i32) {
        self.write_field_begin(ttype::I32, id);
        self.write_i32(value);
    }

    pub fn write_i64_field(&mut self, id: i16, value: i64) {
        self.write_field_begin(ttype::I64, id);
        self.write_i64(value);
    }

    pub fn write_bool_field(&mut self, id: i16, value: bool) {
        self.write_field_begin(ttype::BOOL, id);
        self.write_bool(value);
    }

    pub fn write_string_field(&mut self, id: i16, value: &str) {
        self.write_field_begin(ttype::STRING, id);
        self.write_string(value);
    }

    pub fn write_binary_field(&mut self, id: i16, value: &[u8]) {
        self.write_field_begin(ttype::STRING, id);
        self.write_binary(value);
    }
}
