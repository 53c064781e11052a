use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::utils::Backoff;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{processor::EventProcessor, queue::EventConsumer};

/// Sleep once spinning and yielding have not turned up an event.
const IDLE_SLEEP: Duration = Duration::from_micros(50);

/// Run the processor on a dedicated `event-processor` thread.
///
/// The handle yields the number of events processed once `cancel` fires.
pub fn spawn_consumer(
    mut consumer: EventConsumer,
    mut processor: EventProcessor,
    cancel: CancellationToken,
) -> std::io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("event-processor".to_string())
        .spawn(move || run_consumer(&mut consumer, &mut processor, &cancel))
}

/// Drain the ring in sequence order until cancelled.
pub fn run_consumer(
    consumer: &mut EventConsumer,
    processor: &mut EventProcessor,
    cancel: &CancellationToken,
) -> u64 {
    info!("event processor started");
    let backoff = Backoff::new();
    let mut processed = 0u64;

    while !cancel.is_cancelled() {
        match consumer.try_consume() {
            Some(event) => {
                processor.on_event(&event);
                processed += 1;
                backoff.reset();
            }
            None if backoff.is_completed() => thread::sleep(IDLE_SLEEP),
            None => backoff.snooze(),
        }
    }

    info!(processed, "event processor stopped");
    processed
}
