use std::fmt;

use firehose_core::config::{EVENT_SIZE, RESPONSE_REPEAT};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use serde::Serialize;

/// Raw event body. Every event carries exactly this many bytes.
pub type Payload = [u8; EVENT_SIZE];

/// One published event: its sequence number and a copy of the payload.
#[derive(Clone)]
pub struct Event {
    pub sequence: u64,
    pub payload: Payload,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("sequence", &self.sequence)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// Deterministic payload used by the producer for every event.
pub fn seeded_payload(seed: u64) -> Payload {
    let mut payload = [0u8; EVENT_SIZE];
    StdRng::seed_from_u64(seed).fill_bytes(&mut payload);
    payload
}

/// Checksum and digests of one event, shared by every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    pub sequence: u64,
    pub crc: u32,
    pub md5: [u8; 16],
    pub sha1: [u8; 20],
}

impl ProcessedResult {
    /// Single result line: `crc=<decimal>,mds=<hex>,sha1=<hex>\n`.
    pub fn line(&self) -> String {
        format!(
            "crc={},mds={},sha1={}\n",
            self.crc,
            hex::encode(self.md5),
            hex::encode(self.sha1)
        )
    }

    /// Wire body: the result line repeated [`RESPONSE_REPEAT`] times, then a
    /// blank line.
    pub fn render(&self) -> String {
        let line = self.line();
        let mut out = String::with_capacity(line.len() * RESPONSE_REPEAT + 1);
        for _ in 0..RESPONSE_REPEAT {
            out.push_str(&line);
        }
        out.push('\n');
        out
    }
}

/// Rate search phase. Phases only move forward within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Warmup,
    Doubling,
    Bisecting,
    Stable,
    /// Warm-up could not be sustained.
    Aborted,
}

impl Phase {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Warmup => 1,
            Phase::Doubling => 2,
            Phase::Bisecting => 3,
            Phase::Stable => 4,
            Phase::Aborted => 5,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Phase::Warmup,
            2 => Phase::Doubling,
            3 => Phase::Bisecting,
            4 => Phase::Stable,
            5 => Phase::Aborted,
            _ => Phase::Idle,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Warmup => "warmup",
            Phase::Doubling => "doubling",
            Phase::Bisecting => "bisecting",
            Phase::Stable => "stable",
            Phase::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}
