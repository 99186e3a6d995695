//! Crossdeck Core - two-deck mixing engine for the Crossdeck player

pub mod audio;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod source;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use types::*;
