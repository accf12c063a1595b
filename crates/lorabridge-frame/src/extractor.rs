//! Stream reassembly for the inbound hex text.
//!
//! Serial reads land at arbitrary points inside frames. [`FrameExtractor`]
//! keeps the not-yet-framed hex digits in an accumulation buffer and slices
//! candidate frames out of it as soon as both markers are present.

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::codec::{decode_byte_at, put_hex, FOOTER_HEX, HEADER_HEX};
use crate::error::FrameError;
use crate::message::Message;
use crate::parser::parse_frame_with;

const INITIAL_BUFFER_CAPACITY: usize = 2 * 1024;

/// How candidate frames are located and how their markers are stripped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionPolicy {
    /// Matches the deployed firmware peers: first `EA` to the **last** `55`
    /// in the buffer, markers stripped anywhere in the candidate.
    ///
    /// Two frames buffered before a pass are merged into one candidate, and
    /// payload bytes equal to a marker are lost.
    #[default]
    Compatible,
    /// The footer is expected exactly where the length byte puts it and
    /// markers are stripped only at the two ends.
    ///
    /// A header whose footer slot holds anything else is skipped. While a
    /// header still waits for its footer slot, a complete frame buffered
    /// behind it is delivered and the waiting header is dropped.
    Hardened,
}

/// Outcome for one candidate frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The candidate parsed. The checksum may still be invalid.
    Message {
        candidate: String,
        message: Message,
    },
    /// The candidate was structurally unusable and has been discarded.
    Rejected {
        candidate: String,
        error: FrameError,
    },
}

impl Extraction {
    /// The hex text sliced out of the buffer, markers included.
    pub fn candidate(&self) -> &str {
        match self {
            Extraction::Message { candidate, .. } | Extraction::Rejected { candidate, .. } => {
                candidate
            }
        }
    }

    /// The parsed message, if any.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Extraction::Message { message, .. } => Some(message),
            Extraction::Rejected { .. } => None,
        }
    }
}

/// Accumulates inbound hex text and yields candidate frames.
///
/// The buffer has no size cap. Digits leave the front of the buffer only as
/// part of a candidate or as garbage ahead of a header.
#[derive(Debug)]
pub struct FrameExtractor {
    buf: BytesMut,
    policy: ExtractionPolicy,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExtractor {
    /// Create an extractor with the compatible policy.
    pub fn new() -> Self {
        Self::with_policy(ExtractionPolicy::default())
    }

    pub fn with_policy(policy: ExtractionPolicy) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            policy,
        }
    }

    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    /// Append a chunk of hex text and extract every complete candidate.
    ///
    /// An incomplete frame is not an error: it stays buffered and the call
    /// returns nothing for it.
    pub fn ingest(&mut self, hex_chunk: &str) -> Vec<Extraction> {
        self.buf.extend_from_slice(hex_chunk.as_bytes());
        self.drain()
    }

    /// Hex-encode raw bytes from the transport, then [`ingest`](Self::ingest) them.
    pub fn ingest_raw(&mut self, bytes: &[u8]) -> Vec<Extraction> {
        put_hex(bytes, &mut self.buf);
        self.drain()
    }

    /// Hex digits buffered but not yet part of a frame.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn drain(&mut self) -> Vec<Extraction> {
        let mut extracted = Vec::new();

        while let Some(raw) = self.next_candidate() {
            let candidate = String::from_utf8_lossy(&raw).into_owned();
            match parse_frame_with(&raw, self.policy) {
                Ok(message) => {
                    debug!(
                        %candidate,
                        msg_type = message.msg_type(),
                        len = message.declared_length(),
                        checksum_valid = message.is_checksum_valid(),
                        "frame parsed"
                    );
                    extracted.push(Extraction::Message { candidate, message });
                }
                Err(error) => {
                    warn!(%candidate, %error, "discarding malformed frame");
                    extracted.push(Extraction::Rejected { candidate, error });
                }
            }
        }

        extracted
    }

    fn next_candidate(&mut self) -> Option<BytesMut> {
        match self.policy {
            ExtractionPolicy::Compatible => self.next_compatible(),
            ExtractionPolicy::Hardened => self.next_hardened(),
        }
    }

    fn next_compatible(&mut self) -> Option<BytesMut> {
        let header = find_first(&self.buf, HEADER_HEX)?;
        let footer = find_last(&self.buf, FOOTER_HEX)?;
        if footer <= header {
            return None;
        }

        let mut candidate = self.buf.split_to(footer + FOOTER_HEX.len());
        if header > 0 {
            debug!(
                discarded = header,
                "dropping hex digits ahead of frame header"
            );
            candidate.advance(header);
        }
        Some(candidate)
    }

    fn next_hardened(&mut self) -> Option<BytesMut> {
        loop {
            let Some(header) = find_first(&self.buf, HEADER_HEX) else {
                // A trailing `E` may be the first half of the next header.
                let keep = usize::from(self.buf.last() == Some(&HEADER_HEX[0]));
                let garbage = self.buf.len() - keep;
                if garbage > 0 {
                    debug!(
                        discarded = garbage,
                        "dropping hex digits with no frame header"
                    );
                    self.buf.advance(garbage);
                }
                return None;
            };

            // The header may sit at any digit offset; realign the buffer to it.
            if header > 0 {
                debug!(
                    discarded = header,
                    "dropping hex digits ahead of frame header"
                );
                self.buf.advance(header);
            }

            match frame_at(&self.buf, 0) {
                FrameSlot::Complete(end) => return Some(self.buf.split_to(end)),
                FrameSlot::Broken => {
                    debug!("no footer where the length byte points; resynchronizing");
                    self.buf.advance(HEADER_HEX.len());
                }
                FrameSlot::Short => {
                    // A later frame already complete outranks a header still
                    // waiting for its footer slot.
                    let at = (2..self.buf.len())
                        .step_by(2)
                        .find(|&at| frame_at(&self.buf, at).is_complete())?;
                    debug!(
                        skipped = at,
                        "complete frame behind an unfinished header; resynchronizing"
                    );
                    self.buf.advance(at);
                }
            }
        }
    }
}

/// Where a length-directed frame starting at a given offset stands.
enum FrameSlot {
    /// Footer found where the length byte points; frame ends at this offset.
    Complete(usize),
    /// Not enough digits buffered to reach the footer slot.
    Short,
    /// No header here, an unreadable length byte, or no footer in the slot.
    Broken,
}

impl FrameSlot {
    fn is_complete(&self) -> bool {
        matches!(self, FrameSlot::Complete(_))
    }
}

fn frame_at(hex: &[u8], header: usize) -> FrameSlot {
    if hex.get(header..header + HEADER_HEX.len()) != Some(HEADER_HEX.as_slice()) {
        return FrameSlot::Broken;
    }

    // Length byte follows header and type.
    let length_at = header + 4;
    if hex.len() < length_at + 2 {
        return FrameSlot::Short;
    }
    let Ok(declared_length) = decode_byte_at(hex, length_at) else {
        return FrameSlot::Broken;
    };

    let footer = length_at + 2 + usize::from(declared_length) * 2 + 2;
    match hex.get(footer..footer + FOOTER_HEX.len()) {
        None => FrameSlot::Short,
        Some(slot) if slot == FOOTER_HEX => FrameSlot::Complete(footer + FOOTER_HEX.len()),
        Some(_) => FrameSlot::Broken,
    }
}

fn find_first(haystack: &[u8], pattern: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == pattern)
}

fn find_last(haystack: &[u8], pattern: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).rposition(|w| w == pattern)
}
