//! Audio output boundary
//!
//! The engine does not talk to devices. It defines what a sink is
//! ([`OutputSink`]), how one is configured ([`AudioConfig`]), and ships one
//! device-less implementation ([`ClockedSink`]). Device sinks live in the
//! binary that bootstraps the engine.

mod config;
mod error;
mod sink;

pub use config::{AudioConfig, BufferSize, DeviceId, OutputDriver, LOW_LATENCY_BUFFER_SIZE};
pub use error::{AudioError, AudioResult};
pub use sink::{ClockedSink, OutputSink, StreamInfo};
