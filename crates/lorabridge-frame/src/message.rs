//! Validated protocol messages and the built-in type tags.

use std::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::codec::{bytes_to_hex, checksum};

/// Management traffic (link control, canned commands).
pub const TYPE_MANAGEMENT: u8 = 0x01;

/// Application data relayed over the radio link.
pub const TYPE_DATA: u8 = 0x02;

/// Semantic reading of a message's type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Management,
    Data,
    /// Any other tag. Still parsed and delivered.
    Unknown(u8),
}

impl MessageKind {
    /// Display label for the kind.
    pub fn label(self) -> &'static str {
        match self {
            MessageKind::Management => "Management",
            MessageKind::Data => "Data",
            MessageKind::Unknown(_) => "Unknown",
        }
    }
}

impl From<u8> for MessageKind {
    fn from(tag: u8) -> Self {
        match tag {
            TYPE_MANAGEMENT => MessageKind::Management,
            TYPE_DATA => MessageKind::Data,
            other => MessageKind::Unknown(other),
        }
    }
}

/// A message accepted by the parser.
///
/// The checksum is verified but never enforced: a mismatch is reported
/// through [`Message::is_checksum_valid`] and the consumer decides what to do.
///
/// Equality and hashing cover the received fields only; the locally
/// calculated checksum is excluded.
#[derive(Debug, Clone)]
pub struct Message {
    msg_type: u8,
    declared_length: u8,
    payload: Bytes,
    received_checksum: u8,
    calculated_checksum: u8,
}

impl Message {
    pub(crate) fn new(
        msg_type: u8,
        declared_length: u8,
        payload: Bytes,
        received_checksum: u8,
    ) -> Self {
        let calculated_checksum = checksum(msg_type, declared_length, &payload);
        Self {
            msg_type,
            declared_length,
            payload,
            received_checksum,
            calculated_checksum,
        }
    }

    pub fn msg_type(&self) -> u8 {
        self.msg_type
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self.msg_type)
    }

    /// Payload size as asserted by the sender.
    pub fn declared_length(&self) -> u8 {
        self.declared_length
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn received_checksum(&self) -> u8 {
        self.received_checksum
    }

    pub fn calculated_checksum(&self) -> u8 {
        self.calculated_checksum
    }

    pub fn is_checksum_valid(&self) -> bool {
        self.received_checksum == self.calculated_checksum
    }

    /// Payload as uppercase hex.
    pub fn payload_hex(&self) -> String {
        bytes_to_hex(&self.payload)
    }

    /// Best-effort text rendering, one char per byte. Informational only.
    pub fn payload_ascii(&self) -> String {
        self.payload.iter().map(|&byte| byte as char).collect()
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.msg_type == other.msg_type
            && self.declared_length == other.declared_length
            && self.payload == other.payload
            && self.received_checksum == other.received_checksum
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.msg_type.hash(state);
        self.declared_length.hash(state);
        self.payload.hash(state);
        self.received_checksum.hash(state);
    }
}
