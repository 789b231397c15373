//! Thrift binary protocol codec.
//!
//! Only the strict binary protocol is implemented. Messages are framed by the
//! transport layer, so the codec works on complete in-memory buffers.

mod reader;
mod writer;

pub use reader::ThriftReader;
pub use writer::ThriftWriter;

/// Strict binary protocol version marker.
pub const VERSION_1: u32 = 0x8001_0000;

/// Mask selecting the version bits of a message header.
pub const VERSION_MASK: u32 = 0xffff_0000;

/// Mask selecting the message type bits of a message header.
pub const TYPE_MASK: u32 = 0x0000_00ff;

/// Thrift message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MessageType::Call),
            2 => Some(MessageType::Reply),
            3 => Some(MessageType::Exception),
            4 => Some(MessageType::Oneway),
            _ => None,
        }
    }
}

/// Thrift wire type identifiers.
pub mod ttype {
    pub const STOP: u8 = 0;
    pub const BOOL: u8 = 2;
    pub const BYTE: u8 = 3;
    pub const DOUBLE: u8 = 4;
    pub const I16: u8 = 6;
    pub const I32: u8 = 8;
    pub const I64: u8 = 10;
    pub const STRING: u8 = 11;
    pub const STRUCT: u8 = 12;
    pub const MAP: u8 = 13;
    pub const SET: u8 = 14;
    pub const LIST: u8 = 15;
}

/// Header of a decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub message_type: MessageType,
    pub seq_id: i32,
}

/// Header of one struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub field_type: u8,
    pub id: i16,
}

impl FieldHeader {
    pub fn is_stop(&self) -> bool {
        self.field_type == ttype::STOP
    }
}
