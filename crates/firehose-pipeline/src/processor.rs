use std::sync::Arc;

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::{
    dispatcher::{DispatchReport, FanoutDispatcher},
    types::{Event, ProcessedResult},
};

/// Queue consumer logic: digest each event and fan the result out.
///
/// Holds one CRC-32, MD5 and SHA-1 engine each and resets them after every
/// event, so results depend on the payload alone.
pub struct EventProcessor {
    crc: crc32fast::Hasher,
    md5: Md5,
    sha1: Sha1,
    dispatcher: Arc<FanoutDispatcher>,
}

impl EventProcessor {
    pub fn new(dispatcher: Arc<FanoutDispatcher>) -> Self {
        Self {
            crc: crc32fast::Hasher::new(),
            md5: Md5::new(),
            sha1: Sha1::new(),
            dispatcher,
        }
    }

    /// Checksum and digests for one event. Engines are reset on return.
    pub fn digest(&mut self, event: &Event) -> ProcessedResult {
        self.crc.update(&event.payload);
        let crc = std::mem::take(&mut self.crc).finalize();

        Digest::update(&mut self.md5, event.payload);
        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&self.md5.finalize_reset());

        Digest::update(&mut self.sha1, event.payload);
        let mut sha1 = [0u8; 20];
        sha1.copy_from_slice(&self.sha1.finalize_reset());

        ProcessedResult {
            sequence: event.sequence,
            crc,
            md5,
            sha1,
        }
    }

    /// Handle one consumed event: digest it and deliver to the waiting set.
    pub fn on_event(&mut self, event: &Event) -> DispatchReport {
        let result = Arc::new(self.digest(event));
        self.dispatcher.dispatch(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firehose_core::config::EVENT_SIZE;
    use uuid::Uuid;

    fn event(sequence: u64, byte: u8) -> Event {
        Event {
            sequence,
            payload: [byte; EVENT_SIZE],
        }
    }

    #[test]
    fn digests_match_reference_values() {
        let mut processor = EventProcessor::new(Arc::new(FanoutDispatcher::new()));
        let ev = event(0, 0);
        let result = processor.digest(&ev);

        assert_eq!(result.crc, crc32fast::hash(&ev.payload));
        assert_eq!(result.md5.as_slice(), Md5::digest(ev.payload).as_slice());
        assert_eq!(result.sha1.as_slice(), Sha1::digest(ev.payload).as_slice());
    }

    #[test]
    fn digest_is_pure_function_of_payload() {
        let mut processor = EventProcessor::new(Arc::new(FanoutDispatcher::new()));
        let first = processor.digest(&event(1, 0xab));
        // an unrelated event in between must not leak state
        let _ = processor.digest(&event(2, 0x01));
        let again = processor.digest(&event(3, 0xab));

        assert_eq!(first.crc, again.crc);
        assert_eq!(first.md5, again.md5);
        assert_eq!(first.sha1, again.sha1);
        assert_eq!(again.sequence, 3);

        let mut fresh = EventProcessor::new(Arc::new(FanoutDispatcher::new()));
        assert_eq!(fresh.digest(&event(1, 0xab)), first);
    }

    #[test]
    fn on_event_dispatches_matching_result() {
        let dispatcher = Arc::new(FanoutDispatcher::new());
        let mut processor = EventProcessor::new(Arc::clone(&dispatcher));
        let mut rx = dispatcher.register(Uuid::new_v4());

        let ev = event(42, 7);
        let report = processor.on_event(&ev);
        assert_eq!(report.delivered, 1);

        let got = rx.try_recv().unwrap();
        assert_eq!(got.sequence, 42);
        assert_eq!(got.crc, crc32fast::hash(&ev.payload));
    }
}
