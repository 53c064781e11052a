//! `firehose-pipeline`: single-writer event pipeline with rate search and
//! long-poll fan-out.
//!
//! # Overview
//!
//! A [`controller::RateController`] publishes fixed-size events into a
//! bounded ring ([`queue::event_queue`]) at a target rate. A dedicated
//! consumer thread ([`consumer::spawn_consumer`]) runs every event through the
//! [`processor::EventProcessor`], which digests the payload and hands the
//! result to the [`dispatcher::FanoutDispatcher`]. The dispatcher delivers
//! each result to every connection waiting at that instant.
//!
//! # Search phases
//!
//! | Phase       | Behaviour                                                  |
//! |-------------|------------------------------------------------------------|
//! | `Warmup`    | One long trial at the initial rate; failure aborts the run |
//! | `Doubling`  | Double the rate after every passing trial                  |
//! | `Bisecting` | Halve the bracket until the midpoint moves < 16 events/sec |
//! | `Stable`    | Converged; the last tested rate is reported                |

pub mod consumer;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod processor;
pub mod queue;
pub mod types;

pub use controller::{RateController, RateState, SearchOutcome};
pub use dispatcher::{DispatchReport, FanoutDispatcher, WaitingConnection};
pub use error::{PipelineError, Result};
pub use processor::EventProcessor;
pub use queue::{event_queue, EventConsumer, EventPublisher, QueueGauge};
pub use types::{Event, Payload, Phase, ProcessedResult};
