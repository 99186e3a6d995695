//! Crossfader
//!
//! The position lives in [`CrossfaderState`], shared between the control
//! writer and the audio reader. Both deck gains are derived on write and
//! published together in a single 64-bit store, so the mixer can never see
//! deck 1 updated and deck 2 still at the old value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF32;

use crate::diagnostics::Diagnostics;
use crate::types::DeckId;

/// Gain a deck receives from the crossfader at `position`.
///
/// The position [-1, 1] is remapped to p' in [0, 1]; deck 1 gets `1 - p'`,
/// deck 2 gets `p'`. Out-of-range or NaN positions are clamped first.
pub fn crossfader_gain(deck: DeckId, position: f32) -> f32 {
    let p = clamp_position(position);
    let remapped = (p + 1.0) * 0.5;
    if deck == DeckId::ONE {
        1.0 - remapped
    } else {
        remapped
    }
}

#[inline]
fn clamp_position(position: f32) -> f32 {
    if position.is_nan() {
        0.0
    } else {
        position.clamp(-1.0, 1.0)
    }
}

/// Both deck gains as one consistent snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfaderGains {
    pub deck1: f32,
    pub deck2: f32,
}

impl CrossfaderGains {
    pub fn at(position: f32) -> Self {
        Self {
            deck1: crossfader_gain(DeckId::ONE, position),
            deck2: crossfader_gain(DeckId::TWO, position),
        }
    }

    #[inline]
    pub fn for_deck(&self, deck: DeckId) -> f32 {
        if deck == DeckId::ONE {
            self.deck1
        } else {
            self.deck2
        }
    }

    #[inline]
    fn pack(&self) -> u64 {
        (self.deck1.to_bits() as u64) | ((self.deck2.to_bits() as u64) << 32)
    }

    #[inline]
    fn unpack(bits: u64) -> Self {
        Self {
            deck1: f32::from_bits(bits as u32),
            deck2: f32::from_bits((bits >> 32) as u32),
        }
    }
}

/// Crossfader position and derived gains, lock-free
pub struct CrossfaderState {
    position: AtomicF32,
    gains: AtomicU64,
}

impl CrossfaderState {
    pub fn new(position: f32) -> Self {
        let position = clamp_position(position);
        Self {
            position: AtomicF32::new(position),
            gains: AtomicU64::new(CrossfaderGains::at(position).pack()),
        }
    }

    /// Clamp, store, and publish both gains in one store
    pub fn set_position(&self, position: f32) -> f32 {
        let position = clamp_position(position);
        self.gains
            .store(CrossfaderGains::at(position).pack(), Ordering::Release);
        self.position.store(position, Ordering::Relaxed);
        position
    }

    #[inline]
    pub fn position(&self) -> f32 {
        self.position.load(Ordering::Relaxed)
    }

    /// Snapshot of both gains (audio thread: load once per pull)
    #[inline]
    pub fn gains(&self) -> CrossfaderGains {
        CrossfaderGains::unpack(self.gains.load(Ordering::Acquire))
    }
}

impl Default for CrossfaderState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Control-side crossfader handle
pub struct CrossfaderController {
    state: Arc<CrossfaderState>,
    diagnostics: Diagnostics,
}

impl CrossfaderController {
    pub fn new(state: Arc<CrossfaderState>, diagnostics: Diagnostics) -> Self {
        Self { state, diagnostics }
    }

    /// Move the crossfader. Returns the clamped position actually applied.
    pub fn set_position(&self, position: f32) -> f32 {
        let applied = self.state.set_position(position);
        if applied != position {
            self.diagnostics.debug(format_args!(
                "crossfader position {} clamped to {}",
                position, applied
            ));
        }
        applied
    }

    pub fn position(&self) -> f32 {
        self.state.position()
    }

    pub fn gains(&self) -> CrossfaderGains {
        self.state.gains()
    }

    pub fn gain_for(&self, deck: DeckId) -> f32 {
        self.state.gains().for_deck(deck)
    }

    pub fn state(&self) -> &Arc<CrossfaderState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_left_and_right() {
        let state = CrossfaderState::default();

        state.set_position(-1.0);
        assert_eq!(state.gains(), CrossfaderGains { deck1: 1.0, deck2: 0.0 });

        state.set_position(1.0);
        assert_eq!(state.gains(), CrossfaderGains { deck1: 0.0, deck2: 1.0 });
    }

    #[test]
    fn test_center_gives_equal_gains() {
        let state = CrossfaderState::new(0.7);
        state.set_position(0.0);
        let gains = state.gains();
        assert_eq!(gains.deck1, gains.deck2);
        assert_eq!(gains.deck1, 0.5);
    }

    #[test]
    fn test_position_clamped() {
        let state = CrossfaderState::default();
        assert_eq!(state.set_position(3.0), 1.0);
        assert_eq!(state.position(), 1.0);
        assert_eq!(state.set_position(-9.0), -1.0);
        assert_eq!(state.set_position(f32::NAN), 0.0);
    }

    #[test]
    fn test_pack_preserves_bits() {
        let gains = CrossfaderGains { deck1: 0.123, deck2: 0.877 };
        assert_eq!(CrossfaderGains::unpack(gains.pack()), gains);
    }

    #[test]
    fn test_pure_gain_function_matches_state() {
        for i in -20..=20 {
            let p = i as f32 / 20.0;
            let state = CrossfaderState::new(p);
            assert_eq!(state.gains().deck1, crossfader_gain(DeckId::ONE, p));
            assert_eq!(state.gains().deck2, crossfader_gain(DeckId::TWO, p));
        }
    }
}
