use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Start-of-frame marker. Not escaped inside payloads.
pub const HEADER_BYTE: u8 = 0xEA;

/// End-of-frame marker. Not escaped inside payloads.
pub const FOOTER_BYTE: u8 = 0x55;

/// Header marker as it appears in the inbound hex text.
pub const HEADER_HEX: &[u8; 2] = b"EA";

/// Footer marker as it appears in the inbound hex text.
pub const FOOTER_HEX: &[u8; 2] = b"55";

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Bytes around the payload: header + type + length + checksum + footer.
pub const FRAME_OVERHEAD: usize = 5;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Uppercase hex, two characters per byte, no separators.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
        out.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
    }
    out
}

/// Append the uppercase hex form of `bytes` to `dst`.
pub fn put_hex(bytes: &[u8], dst: &mut BytesMut) {
    dst.reserve(bytes.len() * 2);
    for &byte in bytes {
        dst.put_u8(HEX_DIGITS[(byte >> 4) as usize]);
        dst.put_u8(HEX_DIGITS[(byte & 0x0F) as usize]);
    }
}

/// Hex with a space between bytes (`EA 01 02`), for log lines.
pub fn bytes_to_spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode hex text. Both digit cases are accepted.
pub fn hex_to_bytes(hex: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    let hex = hex.as_ref();
    if hex.len() % 2 != 0 {
        return Err(FrameError::MalformedHex {
            offset: hex.len(),
            reason: "odd number of hex digits",
        });
    }

    hex.chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| decode_pair(pair, i * 2))
        .collect()
}

/// Decode the byte whose two hex digits start at `offset`.
pub(crate) fn decode_byte_at(hex: &[u8], offset: usize) -> Result<u8> {
    match hex.get(offset..offset + 2) {
        Some(pair) => decode_pair(pair, offset),
        None => Err(FrameError::FrameTooShort {
            needed: offset + 2,
            available: hex.len(),
        }),
    }
}

fn decode_pair(pair: &[u8], offset: usize) -> Result<u8> {
    let hi = hex_value(pair[0]).ok_or(FrameError::MalformedHex {
        offset,
        reason: "invalid hex digit",
    })?;
    let lo = hex_value(pair[1]).ok_or(FrameError::MalformedHex {
        offset: offset + 1,
        reason: "invalid hex digit",
    })?;
    Ok((hi << 4) | lo)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// XOR fold seeded with `msg_type ^ declared_length`.
///
/// Not an integrity guarantee: payloads with equal XOR parity collide.
pub fn checksum(msg_type: u8, declared_length: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(msg_type ^ declared_length, |acc, &byte| acc ^ byte)
}

/// Encode one outbound packet as raw bytes.
///
/// Wire format:
/// ```text
/// ┌────────┬──────┬────────┬──────────────────┬──────────┬────────┐
/// │ Header │ Type │ Length │ Payload          │ Checksum │ Footer │
/// │ 0xEA   │ (1B) │ (1B)   │ (Length bytes)   │ (1B XOR) │ 0x55   │
/// └────────┴──────┴────────┴──────────────────┴──────────┴────────┘
/// ```
///
/// Inbound traffic arrives as hex text; outbound goes out as these raw bytes.
pub fn encode_packet(msg_type: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let declared_length = payload.len() as u8;

    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.put_u8(HEADER_BYTE);
    dst.put_u8(msg_type);
    dst.put_u8(declared_length);
    dst.put_slice(payload);
    dst.put_u8(checksum(msg_type, declared_length, payload));
    dst.put_u8(FOOTER_BYTE);
    Ok(())
}

/// Encode one packet into a fresh buffer.
pub fn packet_bytes(msg_type: u8, payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(FRAME_OVERHEAD + payload.len());
    encode_packet(msg_type, payload, &mut dst)?;
    Ok(dst.freeze())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_bytes_to_hex_uppercase_no_separators() {
        assert_eq!(bytes_to_hex(&[0xEA, 0x02, 0x0f, 0x55]), "EA020F55");
        assert_eq!(bytes_to_hex(&[]), "");
    }

    #[test]
    fn test_put_hex_appends() {
        let mut buf = BytesMut::from(&b"00"[..]);
        put_hex(&[0xAB, 0x01], &mut buf);
        assert_eq!(buf.as_ref(), b"00AB01");
    }

    #[test]
    fn test_hex_to_bytes_accepts_both_cases() {
        assert_eq!(hex_to_bytes("4c45").unwrap(), vec![0x4C, 0x45]);
        assert_eq!(hex_to_bytes("4C45").unwrap(), vec![0x4C, 0x45]);
        assert!(hex_to_bytes("").unwrap().is_empty());
    }

    #[test]
    fn test_hex_to_bytes_odd_length() {
        let err = hex_to_bytes("EA0").unwrap_err();
        assert!(matches!(err, FrameError::MalformedHex { offset: 3, .. }));
    }

    #[test]
    fn test_hex_to_bytes_invalid_digit() {
        let err = hex_to_bytes("EA0G").unwrap_err();
        assert!(matches!(err, FrameError::MalformedHex { offset: 3, .. }));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_checksum_empty_payload() {
        assert_eq!(checksum(0x01, 0x00, &[]), 0x01);
        assert_eq!(checksum(0x7F, 0x7F, &[]), 0x00);
    }

    #[test]
    fn test_encode_canned_command() {
        let mut buf = BytesMut::new();
        encode_packet(0x01, b"on", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0xEA, 0x01, 0x02, 0x6F, 0x6E, 0x02, 0x55]);
    }

    #[test]
    fn test_encode_empty_payload() {
        let bytes = packet_bytes(0x02, &[]).unwrap();
        assert_eq!(bytes.as_ref(), &[0xEA, 0x02, 0x00, 0x02, 0x55]);
    }

    #[test]
    fn test_encode_max_payload() {
        let payload = vec![0x11; MAX_PAYLOAD];
        let bytes = packet_bytes(0x02, &payload).unwrap();
        assert_eq!(bytes.len(), FRAME_OVERHEAD + MAX_PAYLOAD);
        assert_eq!(bytes[2], 0xFF);
    }

    #[test]
    fn test_encode_payload_too_large() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        let err = packet_bytes(0x02, &payload).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge {
                size: 256,
                max: 255
            }
        ));
    }

    #[test]
    fn test_spaced_hex() {
        assert_eq!(
            bytes_to_spaced_hex(&[0xEA, 0x01, 0x02, 0x6F, 0x6E, 0x02, 0x55]),
            "EA 01 02 6F 6E 02 55"
        );
    }

    proptest! {
        #[test]
        fn checksum_is_xor_of_every_field(
            msg_type in any::<u8>(),
            length in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut expected = msg_type ^ length;
            for byte in &payload {
                expected ^= byte;
            }
            prop_assert_eq!(checksum(msg_type, length, &payload), expected);
        }

        #[test]
        fn hex_text_decodes_to_the_same_bytes(
            bytes in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            let hex = bytes_to_hex(&bytes);
            prop_assert_eq!(hex.len(), bytes.len() * 2);
            prop_assert_eq!(hex_to_bytes(&hex).unwrap(), bytes);
        }
    }
}
