use bytes::Bytes;

use crate::codec::{decode_byte_at, hex_to_bytes, FOOTER_HEX, HEADER_HEX};
use crate::error::{FrameError, Result};
use crate::extractor::ExtractionPolicy;
use crate::message::Message;

/// Type + length + checksum, as hex digits, with an empty payload.
pub const MIN_BODY_HEX: usize = 6;

/// Parse a candidate frame (hex text, markers included) with the
/// compatible policy.
pub fn parse_frame(candidate: impl AsRef<[u8]>) -> Result<Message> {
    parse_frame_with(candidate, ExtractionPolicy::Compatible)
}

/// Parse a candidate frame under `policy`.
///
/// `Compatible` removes every `EA` and `55` digit pair anywhere in the text,
/// so payload bytes that spell a marker are lost. `Hardened` only removes
/// the leading header and the trailing footer.
///
/// A checksum mismatch is not an error; see [`Message::is_checksum_valid`].
/// Hex after the checksum is ignored.
pub fn parse_frame_with(candidate: impl AsRef<[u8]>, policy: ExtractionPolicy) -> Result<Message> {
    let candidate = candidate.as_ref();
    match policy {
        ExtractionPolicy::Compatible => {
            let without_header = remove_all(candidate, HEADER_HEX);
            let body = remove_all(&without_header, FOOTER_HEX);
            parse_body(&body)
        }
        ExtractionPolicy::Hardened => parse_body(strip_ends(candidate)),
    }
}

fn parse_body(body: &[u8]) -> Result<Message> {
    if body.len() < MIN_BODY_HEX {
        return Err(FrameError::FrameTooShort {
            needed: MIN_BODY_HEX,
            available: body.len(),
        });
    }

    let msg_type = decode_byte_at(body, 0)?;
    let declared_length = decode_byte_at(body, 2)?;

    let payload_start = 4;
    let payload_end = payload_start + declared_length as usize * 2;
    let needed = payload_end + 2;
    if body.len() < needed {
        return Err(FrameError::FrameTooShort {
            needed,
            available: body.len(),
        });
    }

    let payload = hex_to_bytes(&body[payload_start..payload_end]).map_err(|err| match err {
        FrameError::MalformedHex { offset, reason } => FrameError::MalformedHex {
            offset: offset + payload_start,
            reason,
        },
        other => other,
    })?;
    let received_checksum = decode_byte_at(body, payload_end)?;

    Ok(Message::new(
        msg_type,
        declared_length,
        Bytes::from(payload),
        received_checksum,
    ))
}

/// Remove non-overlapping occurrences of `pattern`, scanning left to right.
fn remove_all(text: &[u8], pattern: &[u8; 2]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if text[i..].starts_with(pattern) {
            i += pattern.len();
        } else {
            out.push(text[i]);
            i += 1;
        }
    }
    out
}

fn strip_ends(candidate: &[u8]) -> &[u8] {
    let body = candidate.strip_prefix(HEADER_HEX).unwrap_or(candidate);
    body.strip_suffix(FOOTER_HEX).unwrap_or(body)
}
