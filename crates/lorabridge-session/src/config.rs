use std::time::Duration;

use lorabridge_frame::ExtractionPolicy;

/// How long one blocking read waits before the reader re-checks for shutdown.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Bound on a single outbound packet write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Consumer cadence. At most one message is presented per tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Consecutive read errors surfaced to the presenter before going quiet.
pub const DEFAULT_ERROR_REPORT_LIMIT: u32 = 3;

/// Pause after a failed read.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Tunables for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout for each blocking read. Default: 1s.
    pub read_timeout: Duration,
    /// Timeout for each packet write. Default: 1s.
    pub write_timeout: Duration,
    /// Size of the read buffer. Default: 1024 bytes.
    pub read_buffer_size: usize,
    /// Consumer tick. Default: 50ms.
    pub tick_interval: Duration,
    /// Read errors surfaced before suppression. Default: 3.
    pub error_report_limit: u32,
    /// Sleep after a read error. Default: 100ms.
    pub error_backoff: Duration,
    /// How frames are cut out of the inbound hex stream.
    pub policy: ExtractionPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            error_report_limit: DEFAULT_ERROR_REPORT_LIMIT,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            policy: ExtractionPolicy::default(),
        }
    }
}
