//! Transport controller - the control surface of the engine
//!
//! Owns both decks, the crossfader handle, and the decoder. Every method runs
//! on the control context; the audio side only ever sees the atomics and
//! chain references these calls publish.

use std::path::Path;
use std::sync::Arc;

use super::crossfader::CrossfaderController;
use super::deck::{Deck, TrackInfo};
use super::mixer::MixerAtomics;
use crate::diagnostics::Diagnostics;
use crate::error::EngineResult;
use crate::source::{sine_tone, AudioDecoder, DecodedAudio};
use crate::types::{DeckId, DeckState, NUM_DECKS};

pub struct TransportController {
    decks: [Deck; NUM_DECKS],
    crossfader: CrossfaderController,
    mixer: Arc<MixerAtomics>,
    decoder: Arc<dyn AudioDecoder>,
    diagnostics: Diagnostics,
}

impl TransportController {
    pub fn new(
        decks: [Deck; NUM_DECKS],
        crossfader: CrossfaderController,
        mixer: Arc<MixerAtomics>,
        decoder: Arc<dyn AudioDecoder>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            decks,
            crossfader,
            mixer,
            decoder,
            diagnostics,
        }
    }

    pub fn deck(&self, deck: DeckId) -> &Deck {
        &self.decks[deck.index()]
    }

    fn deck_mut(&mut self, deck: DeckId) -> &mut Deck {
        &mut self.decks[deck.index()]
    }

    /// Replace the decoder used by `load_file`
    pub fn set_decoder(&mut self, decoder: Arc<dyn AudioDecoder>) {
        self.decoder = decoder;
    }

    // Loading

    /// Decode and load a file. Errors leave the deck untouched.
    pub fn load_file(&mut self, deck: DeckId, path: impl AsRef<Path>) -> EngineResult<TrackInfo> {
        let decoder = Arc::clone(&self.decoder);
        self.deck_mut(deck).load_file(path.as_ref(), decoder.as_ref())
    }

    /// Load audio decoded elsewhere
    pub fn load_decoded(
        &mut self,
        deck: DeckId,
        label: &str,
        audio: &DecodedAudio,
    ) -> EngineResult<TrackInfo> {
        self.deck_mut(deck).load_decoded(label, audio)
    }

    /// Load a generated sine for line checks
    pub fn load_test_tone(
        &mut self,
        deck: DeckId,
        frequency_hz: f64,
        seconds: f64,
    ) -> EngineResult<TrackInfo> {
        let tone = sine_tone(frequency_hz, seconds)?;
        let label = format!("test tone {} Hz", frequency_hz);
        self.deck_mut(deck).load_decoded(&label, &tone)
    }

    pub fn eject(&mut self, deck: DeckId) {
        self.deck_mut(deck).eject();
    }

    // Transport

    pub fn play(&self, deck: DeckId) {
        self.deck(deck).play();
    }

    pub fn pause(&self, deck: DeckId) {
        self.deck(deck).pause();
    }

    pub fn stop(&self, deck: DeckId) {
        self.deck(deck).stop();
    }

    /// Play if stopped, pause if playing
    pub fn toggle_play(&self, deck: DeckId) {
        let deck = self.deck(deck);
        if deck.is_playing() {
            deck.pause();
        } else {
            deck.play();
        }
    }

    pub fn is_playing(&self, deck: DeckId) -> bool {
        self.deck(deck).is_playing()
    }

    pub fn state(&self, deck: DeckId) -> DeckState {
        self.deck(deck).state()
    }

    pub fn seek(&self, deck: DeckId, seconds: f64) {
        self.deck(deck).seek(seconds);
    }

    pub fn fast_forward(&self, deck: DeckId, seconds: f64) {
        self.deck(deck).fast_forward(seconds);
    }

    pub fn rewind(&self, deck: DeckId, seconds: f64) {
        self.deck(deck).rewind(seconds);
    }

    pub fn position(&self, deck: DeckId) -> f64 {
        self.deck(deck).position_seconds()
    }

    pub fn length(&self, deck: DeckId) -> f64 {
        self.deck(deck).length_seconds()
    }

    // Cue points

    /// Store the deck's current position. Returns the cue index, or None for
    /// an empty deck.
    pub fn add_cue_point(&mut self, deck: DeckId) -> Option<usize> {
        let index = self.deck_mut(deck).add_cue_point();
        if let Some(index) = index {
            self.diagnostics.debug(format_args!(
                "{} cue {} at {:.3}s",
                deck,
                index,
                self.position(deck)
            ));
        }
        index
    }

    /// Seek to a stored cue. Out-of-range is reported and the position is
    /// left unchanged.
    pub fn jump_to_cue_point(&self, deck: DeckId, index: usize) -> EngineResult<()> {
        self.deck(deck).jump_to_cue_point(index)
    }

    pub fn remove_cue_point(&mut self, deck: DeckId, index: usize) -> EngineResult<f64> {
        self.deck_mut(deck).remove_cue_point(index)
    }

    pub fn clear_cue_points(&mut self, deck: DeckId) {
        self.deck_mut(deck).clear_cue_points();
    }

    pub fn cue_points(&self, deck: DeckId) -> Vec<f64> {
        self.deck(deck).cue_points()
    }

    // Gain

    /// Set base volume, clamped to [0, 2]. Returns the applied value.
    pub fn set_volume(&self, deck: DeckId, volume: f32) -> f32 {
        self.deck(deck).set_volume(volume)
    }

    pub fn volume(&self, deck: DeckId) -> f32 {
        self.deck(deck).volume()
    }

    /// volume × crossfader gain for `deck`
    pub fn effective_volume(&self, deck: DeckId) -> f32 {
        self.deck(deck).effective_gain()
    }

    /// Move the crossfader, clamped to [-1, 1]. Both deck gains change in
    /// the same store.
    pub fn set_crossfader(&self, position: f32) -> f32 {
        self.crossfader.set_position(position)
    }

    pub fn crossfader(&self) -> f32 {
        self.crossfader.position()
    }

    pub fn crossfader_gain(&self, deck: DeckId) -> f32 {
        self.crossfader.gain_for(deck)
    }

    /// Master gain [0, 1]. Returns the applied value.
    pub fn set_master_volume(&self, volume: f32) -> f32 {
        self.mixer.set_master_volume(volume)
    }

    pub fn master_volume(&self) -> f32 {
        self.mixer.master_volume()
    }

    /// Mixer meters (bus peak, clip indicator)
    pub fn mixer_atomics(&self) -> &Arc<MixerAtomics> {
        &self.mixer
    }
}
