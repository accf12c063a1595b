//! Inbound path: transport reads, frame extraction, queueing.

use std::sync::{Arc, Mutex, PoisonError};

use lorabridge_frame::{bytes_to_hex, Extraction, FrameExtractor};
use lorabridge_transport::SerialTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::presenter::Presenter;
use crate::queue::MessageQueue;

/// Everything the ingestion path touches. Shared by the reader thread and
/// test-frame injection.
#[derive(Clone)]
pub(crate) struct Inbound {
    pub(crate) extractor: Arc<Mutex<FrameExtractor>>,
    pub(crate) queue: Arc<MessageQueue>,
    pub(crate) presenter: Arc<dyn Presenter>,
}

impl Inbound {
    /// Feed hex text through the extractor and queue what parses.
    /// Returns the number of messages queued.
    pub(crate) fn ingest_hex(&self, hex_chunk: &str) -> usize {
        let extracted = self
            .extractor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ingest(hex_chunk);

        let mut queued = 0;
        for extraction in extracted {
            let candidate = extraction.candidate();
            self.presenter
                .append_log(&format!("Potential message found: {candidate}"));
            match extraction {
                Extraction::Message { message, .. } => {
                    self.presenter.append_log(&format!(
                        "Message parsed and queued: {}",
                        message.payload_hex()
                    ));
                    self.queue.push(message);
                    queued += 1;
                }
                Extraction::Rejected { candidate, error } => {
                    self.presenter
                        .append_log(&format!("Failed to parse message: {candidate} ({error})"));
                }
            }
        }
        queued
    }

    /// Hex-encode a raw read and ingest it.
    pub(crate) fn ingest_chunk(&self, bytes: &[u8]) -> usize {
        let hex = bytes_to_hex(bytes);
        debug!(bytes = bytes.len(), "received chunk");
        self.presenter
            .append_log(&format!("Received Hex Chunk: {hex}"));
        self.ingest_hex(&hex)
    }
}

/// Counts consecutive read failures and decides which ones are surfaced.
#[derive(Debug)]
pub(crate) struct ErrorGate {
    limit: u32,
    consecutive: u32,
}

impl ErrorGate {
    pub(crate) fn new(limit: u32) -> Self {
        Self {
            limit,
            consecutive: 0,
        }
    }

    /// Record a failure. True while the failure should reach the presenter.
    pub(crate) fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive <= self.limit
    }

    /// A read delivered data.
    pub(crate) fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub(crate) fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// Blocking read loop. Runs until `cancel` fires; I/O errors never end it.
pub(crate) fn run_reader(
    mut transport: Box<dyn SerialTransport>,
    inbound: Inbound,
    config: SessionConfig,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];
    let mut gate = ErrorGate::new(config.error_report_limit);
    debug!(kind = transport.kind(), "reader started");

    while !cancel.is_cancelled() {
        match transport.read(&mut buf, config.read_timeout) {
            Ok(0) => {}
            Ok(n) => {
                gate.record_success();
                inbound.ingest_chunk(&buf[..n]);
            }
            Err(err) => {
                if cancel.is_cancelled() {
                    break;
                }
                if gate.record_failure() {
                    warn!(error = %err, consecutive = gate.consecutive(), "serial read failed");
                    inbound
                        .presenter
                        .set_status(&format!("Error reading data: {err}"));
                    inbound
                        .presenter
                        .append_log(&format!("Error reading serial data: {err}"));
                } else {
                    debug!(
                        error = %err,
                        consecutive = gate.consecutive(),
                        "serial read failed (not reported)"
                    );
                }
                std::thread::sleep(config.error_backoff);
            }
        }
    }

    debug!("reader stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lorabridge_frame::packet_bytes;

    use super::*;
    use crate::presenter::testing::RecordingPresenter;
    use crate::testing::{ScriptedTransport, Step};

    fn inbound(presenter: &Arc<RecordingPresenter>) -> Inbound {
        Inbound {
            extractor: Arc::new(Mutex::new(FrameExtractor::new())),
            queue: Arc::new(MessageQueue::new()),
            presenter: presenter.clone(),
        }
    }

    #[test]
    fn gate_reports_up_to_limit_then_goes_quiet() {
        let mut gate = ErrorGate::new(3);
        assert!(gate.record_failure());
        assert!(gate.record_failure());
        assert!(gate.record_failure());
        assert!(!gate.record_failure());
        assert!(!gate.record_failure());

        gate.record_success();
        assert_eq!(gate.consecutive(), 0);
        assert!(gate.record_failure());
    }

    #[test]
    fn ingest_logs_each_stage() {
        let presenter = Arc::new(RecordingPresenter::default());
        let inbound = inbound(&presenter);

        assert_eq!(inbound.ingest_chunk(&[0xEA, 0x01, 0x02, 0x6F]), 0);
        assert_eq!(inbound.ingest_chunk(&[0x6E, 0x02, 0x55]), 1);
        assert_eq!(inbound.queue.len(), 1);

        assert_eq!(
            presenter.lines(),
            vec![
                "Received Hex Chunk: EA01026F".to_string(),
                "Received Hex Chunk: 6E0255".to_string(),
                "Potential message found: EA01026F6E0255".to_string(),
                "Message parsed and queued: 6F6E".to_string(),
            ]
        );
    }

    #[test]
    fn malformed_candidate_is_logged_not_queued() {
        let presenter = Arc::new(RecordingPresenter::default());
        let inbound = inbound(&presenter);

        assert_eq!(inbound.ingest_hex("EA010555"), 0);
        assert!(inbound.queue.is_empty());
        assert_eq!(
            presenter
                .lines_starting_with("Failed to parse message: EA010555")
                .len(),
            1
        );
    }

    #[test]
    fn reader_reports_three_errors_then_resets_on_data() {
        let presenter = Arc::new(RecordingPresenter::default());
        let inbound = inbound(&presenter);
        let wire = packet_bytes(0x01, b"on").unwrap().to_vec();

        let mut script = vec![Step::Fail; 5];
        script.push(Step::Data(wire));
        script.extend([Step::Fail, Step::Fail]);
        let transport = ScriptedTransport::new(script);
        let remaining = transport.remaining();

        let config = SessionConfig {
            read_timeout: Duration::from_millis(2),
            error_backoff: Duration::from_millis(1),
            ..SessionConfig::default()
        };
        let cancel = CancellationToken::new();
        let reader = {
            let inbound = inbound.clone();
            let cancel = cancel.clone();
            let transport = Box::new(transport);
            std::thread::spawn(move || run_reader(transport, inbound, config, cancel))
        };

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while remaining() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        // Let the last scripted failure finish its backoff.
        std::thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        reader.join().unwrap();

        assert_eq!(
            presenter
                .lines_starting_with("Error reading serial data")
                .len(),
            5
        );
        assert_eq!(presenter.statuses().len(), 5);
        assert_eq!(inbound.queue.len(), 1);
    }
}
