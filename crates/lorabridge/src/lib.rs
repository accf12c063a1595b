//! Host-side bridge for ESP32 LoRa serial links.
//!
//! The bridge firmware speaks a small marker-delimited protocol over a
//! 9600 baud serial line. This crate ties the layers together:
//!
//! - [`transport`]: serial device and unix-socket links
//! - [`frame`]: packet encoding, hex-stream extraction and parsing
//! - [`session`]: reader, consumer and send tasks around one link

/// Re-export transport types.
pub mod transport {
    pub use lorabridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use lorabridge_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use lorabridge_session::*;
}
