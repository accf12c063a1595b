/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Hex text has an odd length or a character that is not a hex digit.
    #[error("malformed hex at offset {offset}: {reason}")]
    MalformedHex { offset: usize, reason: &'static str },

    /// The candidate cannot supply the fields its length byte promises.
    #[error("frame too short ({available} hex digits, need {needed})")]
    FrameTooShort { needed: usize, available: usize },

    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl FrameError {
    /// True for structural parse failures: the candidate is discarded and
    /// extraction carries on with the rest of the buffer.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FrameError::MalformedHex { .. } | FrameError::FrameTooShort { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
