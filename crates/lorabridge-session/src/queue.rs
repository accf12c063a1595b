use std::sync::Mutex;

use lorabridge_frame::Message;
use tokio::sync::mpsc;

/// Unbounded FIFO between the ingestion path and the consumer.
///
/// Any number of producers may push; the consumer pops without waiting.
/// There is no backpressure.
#[derive(Debug)]
pub struct MessageQueue {
    tx: mpsc::UnboundedSender<Message>,
    rx: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Append a message at the tail.
    pub fn push(&self, message: Message) {
        // The receiver lives in `self`, so the channel cannot be closed here.
        let _ = self.tx.send(message);
    }

    /// Remove the message at the head, if there is one.
    pub fn try_pop(&self) -> Option<Message> {
        let mut rx = match self.rx.lock() {
            Ok(rx) => rx,
            Err(poisoned) => poisoned.into_inner(),
        };
        rx.try_recv().ok()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        match self.rx.lock() {
            Ok(rx) => rx.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything queued.
    pub fn clear(&self) {
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lorabridge_frame::{bytes_to_hex, packet_bytes, parse_frame};

    use super::*;

    fn message(payload: &[u8]) -> Message {
        parse_frame(bytes_to_hex(&packet_bytes(0x02, payload).unwrap())).unwrap()
    }

    #[test]
    fn pops_in_push_order() {
        let queue = MessageQueue::new();
        queue.push(message(b"a"));
        queue.push(message(b"b"));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_pop().unwrap().payload().as_ref(), b"a");
        assert_eq!(queue.try_pop().unwrap().payload().as_ref(), b"b");
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn producers_on_many_threads() {
        let queue = Arc::new(MessageQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        queue.push(message(&[i]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 100);

        queue.clear();
        assert!(queue.is_empty());
    }
}
