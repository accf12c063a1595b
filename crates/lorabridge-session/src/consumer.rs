use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::presenter::Presenter;
use crate::queue::MessageQueue;

/// Pop at most one message and present it. Returns whether one was popped.
pub fn drain_one(queue: &MessageQueue, presenter: &dyn Presenter) -> bool {
    match queue.try_pop() {
        Some(message) => {
            presenter.show_message(&message);
            true
        }
        None => false,
    }
}

/// Fixed-cadence consumer. Ends only on cancellation.
pub(crate) async fn run_consumer(
    queue: Arc<MessageQueue>,
    presenter: Arc<dyn Presenter>,
    tick: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(?tick, "consumer started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                drain_one(&queue, presenter.as_ref());
            }
        }
    }

    debug!("consumer stopped");
}
