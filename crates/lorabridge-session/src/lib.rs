//! Session runtime for the LoRa bridge link.
//!
//! A [`Session`] owns three kinds of task:
//! - a reader that blocks on the transport, hex-encodes what arrives and
//!   feeds the frame extractor, queueing every parsed message
//! - a consumer that presents at most one queued message per tick
//! - one short-lived send task per outbound packet
//!
//! Status text and verbose log lines go to a [`Presenter`].

pub mod config;
pub mod consumer;
pub mod error;
pub mod presenter;
pub mod queue;
mod reader;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::SessionConfig;
pub use consumer::drain_one;
pub use error::{Result, SessionError};
pub use presenter::{format_message, Presenter, TracingPresenter};
pub use queue::MessageQueue;
pub use session::{Session, CANNED_PAYLOAD, TEST_FRAME_HEX};
