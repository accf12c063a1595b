use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Default line speed used by the bridge firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// A byte link to the bridge: a serial device or a socket standing in for one.
///
/// Reads and writes carry their own timeout. A read that times out returns
/// `Ok(0)` rather than an error, so callers can poll in a loop.
pub trait SerialTransport: Send {
    /// Read whatever bytes arrive within `timeout`.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Write all of `bytes`, failing if that takes longer than `timeout`.
    fn write(&mut self, bytes: &[u8], timeout: Duration) -> Result<()>;

    /// Release the handle. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;

    /// Open an independent handle onto the same link.
    fn try_clone(&self) -> Result<Box<dyn SerialTransport>>;

    /// Short name of the transport kind, for logs.
    fn kind(&self) -> &'static str;
}

/// Where and how to open the link.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Device node (e.g. `/dev/ttyUSB0`) or unix socket path.
    pub path: PathBuf,
    /// Line speed applied to terminal devices. Default: 9600.
    pub baud_rate: u32,
    /// Put terminal devices into raw 8N1 mode on open. Default: true.
    pub raw_mode: bool,
}

impl TransportConfig {
    /// Config for `path` with default line settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            raw_mode: true,
        }
    }

    /// Override the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}
