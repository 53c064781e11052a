//! `firehose-core`: configuration, constants and the shared error type.

pub mod config;
pub mod error;

pub use config::FirehoseConfig;
pub use error::{FirehoseError, Result};
