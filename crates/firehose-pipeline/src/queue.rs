//! Bounded single-producer/single-consumer event ring.
//!
//! [`event_queue`] splits the ring into an [`EventPublisher`] and an
//! [`EventConsumer`]. Neither half is `Clone` and publishing needs `&mut`, so
//! the one-writer/one-reader discipline is enforced by ownership rather than
//! by a lock. Slot reuse is guarded by the underlying `ArrayQueue`: a push
//! only succeeds when a slot has been vacated by a pop.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use crossbeam::queue::ArrayQueue;

use crate::{
    error::{PipelineError, Result},
    types::{Event, Payload},
};

struct Ring {
    slots: ArrayQueue<Event>,
    /// Sequence of the most recently published event, -1 before the first.
    cursor: AtomicI64,
}

/// Create a ring with `capacity` slots.
pub fn event_queue(capacity: usize) -> Result<(EventPublisher, EventConsumer)> {
    if capacity == 0 || !capacity.is_power_of_two() {
        return Err(PipelineError::InvalidCapacity { capacity });
    }
    let ring = Arc::new(Ring {
        slots: ArrayQueue::new(capacity),
        cursor: AtomicI64::new(-1),
    });
    Ok((
        EventPublisher {
            ring: Arc::clone(&ring),
            next_sequence: 0,
        },
        EventConsumer { ring },
    ))
}

/// Producer half. Owned by whoever drives the publish rate.
pub struct EventPublisher {
    ring: Arc<Ring>,
    next_sequence: u64,
}

impl EventPublisher {
    /// Claim the next sequence and copy `payload` into its slot.
    ///
    /// Returns `false` with no side effects when every slot is occupied.
    /// Counting the failure is up to the caller.
    pub fn try_publish(&mut self, payload: &Payload) -> bool {
        let sequence = self.next_sequence;
        let event = Event {
            sequence,
            payload: *payload,
        };
        if self.ring.slots.push(event).is_err() {
            return false;
        }
        self.next_sequence += 1;
        self.ring.cursor.store(sequence as i64, Ordering::Release);
        true
    }

    pub fn available_capacity(&self) -> usize {
        self.ring.available_capacity()
    }

    pub fn backlog(&self) -> usize {
        self.ring.slots.len()
    }

    pub fn cursor(&self) -> i64 {
        self.ring.cursor.load(Ordering::Acquire)
    }

    pub fn gauge(&self) -> QueueGauge {
        QueueGauge {
            ring: Arc::clone(&self.ring),
        }
    }
}

/// Consumer half. Events come out in sequence order.
pub struct EventConsumer {
    ring: Arc<Ring>,
}

impl EventConsumer {
    pub fn try_consume(&mut self) -> Option<Event> {
        self.ring.slots.pop()
    }

    pub fn backlog(&self) -> usize {
        self.ring.slots.len()
    }

    pub fn gauge(&self) -> QueueGauge {
        QueueGauge {
            ring: Arc::clone(&self.ring),
        }
    }
}

/// Read-only view of the ring for monitoring.
#[derive(Clone)]
pub struct QueueGauge {
    ring: Arc<Ring>,
}

impl QueueGauge {
    pub fn cursor(&self) -> i64 {
        self.ring.cursor.load(Ordering::Acquire)
    }

    pub fn backlog(&self) -> usize {
        self.ring.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.slots.capacity()
    }

    pub fn available_capacity(&self) -> usize {
        self.ring.available_capacity()
    }
}

impl Ring {
    fn available_capacity(&self) -> usize {
        self.slots.capacity() - self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firehose_core::config::EVENT_SIZE;

    fn marked(seq: u64) -> Payload {
        let mut p = [0u8; EVENT_SIZE];
        p[..8].copy_from_slice(&seq.to_le_bytes());
        p
    }

    fn mark_of(event: &Event) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&event.payload[..8]);
        u64::from_le_bytes(b)
    }

    #[test]
    fn rejects_bad_capacity() {
        assert!(matches!(
            event_queue(0),
            Err(PipelineError::InvalidCapacity { capacity: 0 })
        ));
        assert!(matches!(
            event_queue(6),
            Err(PipelineError::InvalidCapacity { capacity: 6 })
        ));
        assert!(event_queue(8).is_ok());
    }

    #[test]
    fn fifth_publish_fails_when_consumer_paused() {
        let (mut publisher, _consumer) = event_queue(4).unwrap();
        let payload = [1u8; EVENT_SIZE];

        let outcomes: Vec<bool> = (0..5).map(|_| publisher.try_publish(&payload)).collect();

        assert_eq!(outcomes, vec![true, true, true, true, false]);
        assert_eq!(publisher.available_capacity(), 0);
        assert_eq!(publisher.backlog(), 4);
        // the failed publish claimed nothing
        assert_eq!(publisher.cursor(), 3);
    }

    #[test]
    fn cursor_starts_before_first_sequence() {
        let (mut publisher, consumer) = event_queue(2).unwrap();
        assert_eq!(publisher.cursor(), -1);
        assert_eq!(consumer.gauge().available_capacity(), 2);

        assert!(publisher.try_publish(&[0u8; EVENT_SIZE]));
        assert_eq!(consumer.gauge().cursor(), 0);
        assert_eq!(consumer.backlog(), 1);
    }

    #[test]
    fn sequences_increase_across_wraparound() {
        let (mut publisher, mut consumer) = event_queue(4).unwrap();
        let mut next_mark = 0u64;
        let mut last_seen: Option<u64> = None;

        // Many laps around a four-slot ring with a varying fill level.
        for round in 0..50u64 {
            let burst = 1 + (round % 4);
            for _ in 0..burst {
                assert!(publisher.try_publish(&marked(next_mark)));
                next_mark += 1;
            }
            while let Some(event) = consumer.try_consume() {
                // Payload still belongs to this sequence: no slot was
                // overwritten before it was consumed.
                assert_eq!(mark_of(&event), event.sequence);
                if let Some(prev) = last_seen {
                    assert_eq!(event.sequence, prev + 1);
                }
                last_seen = Some(event.sequence);
            }
        }
        assert_eq!(last_seen, Some(next_mark - 1));
        assert_eq!(publisher.cursor(), (next_mark - 1) as i64);
    }

    #[test]
    fn full_ring_frees_slot_after_consume() {
        let (mut publisher, mut consumer) = event_queue(2).unwrap();
        assert!(publisher.try_publish(&marked(0)));
        assert!(publisher.try_publish(&marked(1)));
        assert!(!publisher.try_publish(&marked(2)));

        let first = consumer.try_consume().unwrap();
        assert_eq!(first.sequence, 0);
        assert!(publisher.try_publish(&marked(2)));

        // failed attempt did not burn a sequence number
        assert_eq!(consumer.try_consume().unwrap().sequence, 1);
        let third = consumer.try_consume().unwrap();
        assert_eq!(third.sequence, 2);
        assert_eq!(mark_of(&third), 2);
        assert!(consumer.try_consume().is_none());
    }

    #[test]
    fn concurrent_producer_and_consumer_preserve_order() {
        let (mut publisher, mut consumer) = event_queue(64).unwrap();
        const TOTAL: u64 = 20_000;

        let producer = std::thread::spawn(move || {
            let mut sent = 0u64;
            while sent < TOTAL {
                if publisher.try_publish(&marked(sent)) {
                    sent += 1;
                } else {
                    std::thread::yield_now();
                }
            }
        });

        let mut expected = 0u64;
        while expected < TOTAL {
            match consumer.try_consume() {
                Some(event) => {
                    assert_eq!(event.sequence, expected);
                    assert_eq!(mark_of(&event), expected);
                    expected += 1;
                }
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert_eq!(consumer.backlog(), 0);
    }
}
