//! In-memory transport for session tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lorabridge_transport::{Result, SerialTransport, TransportError};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Data(Vec<u8>),
    Fail,
}

/// Replays a script of reads, records writes. Clones share all state.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Step>>>,
    written: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    write_delay_ms: Arc<AtomicU64>,
    writing: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            written: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            write_delay_ms: Arc::new(AtomicU64::new(0)),
            writing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn remaining(&self) -> impl Fn() -> usize {
        let script = Arc::clone(&self.script);
        move || script.lock().unwrap().len()
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Every write blocks this long before it lands.
    pub(crate) fn slow_writes(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap();
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub(crate) fn is_writing(&self) -> bool {
        self.writing.load(Ordering::SeqCst)
    }
}

impl SerialTransport for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Step::Fail) => {
                let err = io::Error::other("scripted read failure");
                Err(TransportError::Io(err))
            }
            None => {
                std::thread::sleep(timeout);
                Ok(0)
            }
        }
    }

    fn write(&mut self, bytes: &[u8], _timeout: Duration) -> Result<()> {
        self.writing.store(true, Ordering::SeqCst);
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(delay));
        self.writing.store(false, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            let err = io::Error::other("scripted write failure");
            return Err(TransportError::Io(err));
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.written.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialTransport>> {
        Ok(Box::new(self.clone()))
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }
}
