use std::sync::{Arc, Mutex, PoisonError};

use lorabridge_frame::{bytes_to_spaced_hex, packet_bytes, FrameExtractor, TYPE_MANAGEMENT};
use lorabridge_transport::{SerialTransport, TransportConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::consumer::run_consumer;
use crate::error::{Result, SessionError};
use crate::presenter::Presenter;
use crate::queue::MessageQueue;
use crate::reader::{run_reader, Inbound};

/// Literal frame fed through the ingestion path by [`Session::inject_test_frame`].
pub const TEST_FRAME_HEX: &str = "EA02094C4544206973206F6E5D55";

/// Payload of the canned management command.
pub const CANNED_PAYLOAD: &[u8] = b"on";

type SharedWriter = Arc<Mutex<Box<dyn SerialTransport>>>;

/// One bridge session: a consumer task, and once a transport is attached, a
/// reader task plus a lock-guarded write handle.
///
/// Must be started and stopped from within a Tokio runtime.
pub struct Session {
    config: SessionConfig,
    inbound: Inbound,
    writer: Option<SharedWriter>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl Session {
    pub fn new(config: SessionConfig, presenter: Arc<dyn Presenter>) -> Self {
        let inbound = Inbound {
            extractor: Arc::new(Mutex::new(FrameExtractor::with_policy(config.policy))),
            queue: Arc::new(MessageQueue::new()),
            presenter,
        };
        Self {
            config,
            inbound,
            writer: None,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            started: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    /// Messages parsed but not yet consumed.
    pub fn queue(&self) -> &MessageQueue {
        &self.inbound.queue
    }

    /// Start the consumer task.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }

        let consumer = tokio::spawn(run_consumer(
            Arc::clone(&self.inbound.queue),
            Arc::clone(&self.inbound.presenter),
            self.config.tick_interval,
            self.cancel.child_token(),
        ));
        self.tasks.push(consumer);
        self.started = true;
        info!(tick = ?self.config.tick_interval, policy = ?self.config.policy, "session started");
        Ok(())
    }

    /// Open the link described by `transport` and [`attach`](Self::attach) it.
    pub fn connect(&mut self, transport: &TransportConfig) -> Result<()> {
        let presenter = &self.inbound.presenter;
        match lorabridge_transport::open(transport) {
            Ok(handle) => {
                presenter.append_log(&format!(
                    "Serial port opened successfully. Baud rate: {}",
                    transport.baud_rate
                ));
                info!(
                    path = %transport.path.display(),
                    baud = transport.baud_rate,
                    "serial port opened"
                );
                self.attach(handle)
            }
            Err(err) => {
                presenter.set_status(&format!("Error: {err}"));
                presenter.append_log(&format!("Error opening serial port: {err}"));
                warn!(path = %transport.path.display(), error = %err, "failed to open serial port");
                Err(err.into())
            }
        }
    }

    /// Hand an open transport to the session and start the reader task.
    ///
    /// The reader gets an independent clone of the handle; `transport`
    /// itself becomes the write handle.
    pub fn attach(&mut self, transport: Box<dyn SerialTransport>) -> Result<()> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }
        if self.writer.is_some() {
            return Err(SessionError::AlreadyAttached);
        }

        let reader_handle = transport.try_clone()?;
        debug!(kind = transport.kind(), "transport attached");

        let inbound = self.inbound.clone();
        let config = self.config.clone();
        let cancel = self.cancel.child_token();
        let reader =
            tokio::task::spawn_blocking(move || run_reader(reader_handle, inbound, config, cancel));

        self.tasks.push(reader);
        self.writer = Some(Arc::new(Mutex::new(transport)));
        Ok(())
    }

    /// Feed hex text through the ingestion path as if it had been read.
    /// Returns the number of messages queued.
    pub fn inject_hex(&self, hex: &str) -> usize {
        self.inbound.ingest_hex(hex)
    }

    /// Feed [`TEST_FRAME_HEX`] through the ingestion path.
    pub fn inject_test_frame(&self) -> usize {
        self.inbound.presenter.append_log(&format!(
            "Test frame injected. Simulating message: {TEST_FRAME_HEX}"
        ));
        self.inject_hex(TEST_FRAME_HEX)
    }

    /// Encode one packet and write it from a send task.
    ///
    /// Encoding errors are returned directly. The returned task resolves to
    /// the outcome of the single write, which is never retried.
    pub fn send_packet(&self, msg_type: u8, payload: &[u8]) -> Result<JoinHandle<Result<()>>> {
        let packet = packet_bytes(msg_type, payload)?;
        let writer = self.writer.clone().ok_or(SessionError::NotConnected)?;
        let presenter = Arc::clone(&self.inbound.presenter);
        let timeout = self.config.write_timeout;
        let cancel = self.cancel.child_token();

        Ok(tokio::task::spawn_blocking(move || {
            if cancel.is_cancelled() {
                return Err(SessionError::NotStarted);
            }

            let outcome = writer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write(&packet, timeout);

            match outcome {
                Ok(()) => {
                    let spaced = bytes_to_spaced_hex(&packet);
                    debug!(packet = %spaced, "packet sent");
                    presenter.append_log(&format!("Packet sent to ESP32: {spaced}"));
                    Ok(())
                }
                Err(err) => {
                    warn!(error = %err, "error sending packet");
                    presenter.append_log(&format!("Error sending packet: {err}"));
                    Err(err.into())
                }
            }
        }))
    }

    /// Send the canned management command (`on`).
    pub fn send_canned_command(&self) -> Result<JoinHandle<Result<()>>> {
        self.send_packet(TYPE_MANAGEMENT, CANNED_PAYLOAD)
    }

    /// Close the transport, cancel every task and wait for them.
    ///
    /// A failed close is logged and does not stop the shutdown. Queued
    /// messages are dropped. The session can be started again afterwards.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }

        let mut failure = None;
        if let Some(writer) = self.writer.take() {
            let presenter = Arc::clone(&self.inbound.presenter);
            // An in-flight send holds the writer lock for up to its timeout.
            let closing = tokio::task::spawn_blocking(move || {
                let closed = writer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .close();
                match closed {
                    Ok(()) => {
                        presenter.append_log("Serial port closed");
                        info!("serial port closed");
                    }
                    Err(err) => {
                        presenter.append_log(&format!("Error closing serial port: {err}"));
                        warn!(error = %err, "error closing serial port");
                    }
                }
            });
            if let Err(err) = closing.await {
                warn!(error = %err, "closing task failed");
                failure = Some(SessionError::from(err));
            }
        }

        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "session task failed");
                if failure.is_none() {
                    failure = Some(SessionError::from(err));
                }
            }
        }

        let dropped = self.inbound.queue.len();
        self.inbound.queue.clear();
        self.cancel = CancellationToken::new();
        self.started = false;
        info!(dropped, "session stopped");

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
