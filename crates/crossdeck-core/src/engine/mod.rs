//! Audio engine - decks, crossfader, mixer, transport
//!
//! - Deck: one loaded source, its transport state and cue points
//! - Crossfader: lock-free position shared by both decks
//! - Mixer: pulls both deck slots, limits, sums and soft-clips
//! - TransportController: the control surface over all of the above

pub mod gc;
pub mod limiter;

mod crossfader;
mod deck;
mod engine;
mod mixer;
mod transport;

pub use crossfader::*;
pub use deck::*;
pub use engine::*;
pub use mixer::*;
pub use transport::*;
