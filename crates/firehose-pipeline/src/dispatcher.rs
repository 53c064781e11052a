//! Long-poll fan-out.
//!
//! The waiting set is a lock-free FIFO. Request handlers push into it from
//! any number of tasks while the processor thread drains it. `dispatch`
//! takes a length snapshot first and pops exactly that many entries: with a
//! single drainer and FIFO order those are precisely the connections that
//! were waiting when the snapshot was taken. Anything pushed later sits
//! behind them and waits for the next result.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crossbeam::queue::SegQueue;
use tokio::sync::oneshot;
use tracing::trace;
use uuid::Uuid;

use crate::{
    error::{PipelineError, Result},
    types::ProcessedResult,
};

/// What a waiting connection receives.
pub type Delivery = Arc<ProcessedResult>;

/// One suspended client request.
///
/// Consumed by delivery, so a registration can be served at most once.
pub struct WaitingConnection {
    id: Uuid,
    tx: oneshot::Sender<Delivery>,
}

impl WaitingConnection {
    /// New waiting entry plus the receiving half for the request handler.
    pub fn new() -> (Self, oneshot::Receiver<Delivery>) {
        Self::with_id(Uuid::new_v4())
    }

    /// Same as [`WaitingConnection::new`] but keeps the caller's id, so a
    /// streaming session can re-register under one id.
    pub fn with_id(id: Uuid) -> (Self, oneshot::Receiver<Delivery>) {
        let (tx, rx) = oneshot::channel();
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn deliver(self, result: &Delivery) -> Result<()> {
        let conn_id = self.id;
        self.tx
            .send(Arc::clone(result))
            .map_err(|_| PipelineError::Disconnected { conn_id })
    }
}

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Connections that received the result.
    pub delivered: usize,
    /// Connections that had already gone away.
    pub dropped: usize,
}

#[derive(Default)]
pub struct FanoutDispatcher {
    waiting: SegQueue<WaitingConnection>,
    cycles: AtomicU64,
    delivered: AtomicU64,
}

impl FanoutDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a connection until the next result. Safe from any thread.
    pub fn add_waiting(&self, connection: WaitingConnection) {
        trace!(conn_id = %connection.id, "connection waiting");
        self.waiting.push(connection);
    }

    /// Create, park and hand back the receiver in one step.
    pub fn register(&self, id: Uuid) -> oneshot::Receiver<Delivery> {
        let (connection, rx) = WaitingConnection::with_id(id);
        self.add_waiting(connection);
        rx
    }

    /// Current size of the waiting set.
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Number of results dispatched so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Total successful deliveries across all cycles.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Deliver `result` to every connection waiting right now.
    ///
    /// Must only be called from one thread at a time (the event processor).
    pub fn dispatch(&self, result: &Delivery) -> DispatchReport {
        let snapshot = self.waiting.len();
        let mut report = DispatchReport::default();

        for _ in 0..snapshot {
            let Some(connection) = self.waiting.pop() else {
                break;
            };
            match connection.deliver(result) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    trace!(sequence = result.sequence, "{e}");
                    report.dropped += 1;
                }
            }
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        report
    }
}
