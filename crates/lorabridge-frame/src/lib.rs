//! Frame codec for the LoRa bridge serial protocol.
//!
//! Every packet on the wire is:
//! - A `0xEA` header and a `0x55` footer, neither escaped inside the payload
//! - A 1-byte message type and a 1-byte payload length
//! - An XOR checksum seeded with `type ^ length`
//!
//! Outbound packets are raw bytes. Inbound traffic is handled as uppercase
//! hex text, reassembled across reads by [`FrameExtractor`].

pub mod codec;
pub mod error;
pub mod extractor;
pub mod message;
pub mod parser;

pub use codec::{
    bytes_to_hex, bytes_to_spaced_hex, checksum, encode_packet, hex_to_bytes, packet_bytes,
    put_hex, FOOTER_BYTE, FRAME_OVERHEAD, HEADER_BYTE, MAX_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use extractor::{Extraction, ExtractionPolicy, FrameExtractor};
pub use message::{Message, MessageKind, TYPE_DATA, TYPE_MANAGEMENT};
pub use parser::{parse_frame, parse_frame_with};
