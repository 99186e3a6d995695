//! Deck - one playback unit
//!
//! A deck is split in two halves:
//! - [`DeckOutput`]: the audio-facing half, permanently wired into a mixer
//!   slot. Volume and playing flag are atomics; the active source chain sits
//!   behind an `ArcSwapOption` so a load replaces it in one store.
//! - [`Deck`]: the control-facing half, owned by the transport. Loading,
//!   cue points, and everything that may allocate or log happens here.
//!
//! Muting never touches the graph: a stopped or empty deck simply pulls
//! silence.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use atomic_float::AtomicF32;

use super::crossfader::CrossfaderState;
use super::mixer::{FrameProvider, PullContext};
use crate::diagnostics::Diagnostics;
use crate::error::{EngineError, EngineResult};
use crate::source::normalize::{normalize, Normalization};
use crate::source::{AudioDecoder, AudioSource, DecodedAudio, LoopingSource};
use crate::types::{
    frames_to_seconds, seconds_to_frames, DeckId, DeckState, StereoSample,
};

/// Lowest and highest base volume
pub const VOLUME_RANGE: (f32, f32) = (0.0, 2.0);

/// Clamp a requested volume into [`VOLUME_RANGE`]. NaN mutes.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        VOLUME_RANGE.0
    } else {
        volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1)
    }
}

/// The fully built provider chain for one loaded source
struct DeckChain {
    source: LoopingSource,
}

/// Audio-facing half of a deck
pub struct DeckOutput {
    id: DeckId,
    volume: AtomicF32,
    playing: AtomicBool,
    chain: ArcSwapOption<DeckChain>,
}

impl DeckOutput {
    fn new(id: DeckId, volume: f32) -> Self {
        Self {
            id,
            volume: AtomicF32::new(clamp_volume(volume)),
            playing: AtomicBool::new(false),
            chain: ArcSwapOption::empty(),
        }
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.chain.load().is_some()
    }

    /// Read cursor in frames (0 when empty)
    pub fn position_frames(&self) -> u64 {
        match &*self.chain.load() {
            Some(chain) => chain.source.source().position(),
            None => 0,
        }
    }

    /// Source length in frames (0 when empty)
    pub fn length_frames(&self) -> u64 {
        match &*self.chain.load() {
            Some(chain) => chain.source.source().len() as u64,
            None => 0,
        }
    }
}

impl FrameProvider for DeckOutput {
    fn pull(&self, out: &mut [StereoSample], ctx: &PullContext) {
        // Chain before flag: a load stores `playing = false` ahead of the
        // swap, so seeing the new chain implies seeing the cleared flag.
        let guard = self.chain.load();
        let Some(chain) = &*guard else {
            out.fill(StereoSample::silence());
            return;
        };
        if !self.playing.load(Ordering::Acquire) {
            out.fill(StereoSample::silence());
            return;
        }

        // The cursor keeps moving even at zero gain
        chain.source.read(out);

        let gain = self.volume.load(Ordering::Relaxed) * ctx.crossfader.for_deck(self.id);
        if gain == 0.0 {
            out.fill(StereoSample::silence());
        } else if gain != 1.0 {
            for frame in out.iter_mut() {
                *frame *= gain;
            }
        }
    }
}

/// Description of the currently loaded source
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    /// Path or caller-supplied label
    pub label: String,
    /// Length in frames at the engine rate
    pub frames: u64,
    pub normalization: Normalization,
}

impl TrackInfo {
    pub fn duration_seconds(&self) -> f64 {
        frames_to_seconds(self.frames)
    }
}

/// Control-facing half of a deck
pub struct Deck {
    id: DeckId,
    output: Arc<DeckOutput>,
    crossfader: Arc<CrossfaderState>,
    track: Option<TrackInfo>,
    /// Cue offsets in frames, in insertion order
    cue_points: Vec<u64>,
    diagnostics: Diagnostics,
}

impl Deck {
    /// Create an empty deck
    pub fn new(
        id: DeckId,
        crossfader: Arc<CrossfaderState>,
        volume: f32,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            id,
            output: Arc::new(DeckOutput::new(id, volume)),
            crossfader,
            track: None,
            cue_points: Vec::new(),
            diagnostics,
        }
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    /// The provider to wire into the mixer slot for this deck
    pub fn output(&self) -> Arc<DeckOutput> {
        Arc::clone(&self.output)
    }

    pub fn track(&self) -> Option<&TrackInfo> {
        self.track.as_ref()
    }

    pub fn state(&self) -> DeckState {
        if !self.output.is_loaded() {
            DeckState::Empty
        } else if self.output.is_playing() {
            DeckState::Playing
        } else {
            DeckState::Stopped
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.output.is_loaded()
    }

    pub fn is_playing(&self) -> bool {
        self.output.is_playing()
    }

    // ─────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────

    /// Decode `path` and replace the loaded source.
    ///
    /// On any failure the deck is left exactly as it was.
    pub fn load_file(&mut self, path: &Path, decoder: &dyn AudioDecoder) -> EngineResult<TrackInfo> {
        let audio = decoder.decode(path).map_err(|e| {
            self.diagnostics
                .warn(format_args!("load of {:?} failed: {}", path, e));
            e
        })?;
        self.load_decoded(&path.display().to_string(), &audio)
    }

    /// Normalize already-decoded audio and replace the loaded source.
    ///
    /// The new chain is built completely before it is published; the audio
    /// thread sees either the old chain or the new one.
    pub fn load_decoded(&mut self, label: &str, audio: &DecodedAudio) -> EngineResult<TrackInfo> {
        let built = normalize(audio)
            .and_then(|(frames, report)| Ok((AudioSource::new(frames)?, report)));
        let (source, normalization) = match built {
            Ok(built) => built,
            Err(e) => {
                self.diagnostics
                    .warn(format_args!("load of {} failed: {}", label, e));
                return Err(e);
            }
        };

        let info = TrackInfo {
            label: label.to_string(),
            frames: source.len() as u64,
            normalization,
        };
        let chain = Arc::new(DeckChain {
            source: LoopingSource::new(source),
        });

        // Loaded state is Stopped; gate output before the swap
        self.output.playing.store(false, Ordering::SeqCst);
        let previous = self.output.chain.swap(Some(Arc::clone(&chain)));
        self.cue_points.clear();
        self.track = Some(info.clone());

        // Only `&mut self` swaps the chain
        debug_assert!(
            matches!(&*self.output.chain.load(), Some(current) if Arc::ptr_eq(current, &chain)),
            "{} chain changed during load",
            self.id
        );
        drop(previous);

        self.diagnostics.info(format_args!(
            "loaded {} ({:.2}s{}{})",
            info.label,
            info.duration_seconds(),
            if normalization.upmixed { ", mono->stereo" } else { "" },
            if normalization.resampled { ", resampled" } else { "" },
        ));

        Ok(info)
    }

    /// Release the source. The deck returns to Empty.
    pub fn eject(&mut self) {
        self.output.playing.store(false, Ordering::SeqCst);
        let previous = self.output.chain.swap(None);
        self.cue_points.clear();
        if let Some(track) = self.track.take() {
            self.diagnostics.info(format_args!("ejected {}", track.label));
        }
        drop(previous);
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Start playback. No-op on an empty deck.
    pub fn play(&self) {
        if self.output.is_loaded() {
            self.output.playing.store(true, Ordering::Release);
        }
    }

    pub fn pause(&self) {
        self.output.playing.store(false, Ordering::Release);
    }

    /// Pause and return to the start
    pub fn stop(&self) {
        self.output.playing.store(false, Ordering::Release);
        self.seek_frames(0);
    }

    /// Move the cursor, clamped into [0, length). Safe while playing.
    pub fn seek(&self, seconds: f64) {
        self.seek_frames(seconds_to_frames(seconds));
    }

    pub fn seek_frames(&self, frame: u64) {
        if let Some(chain) = &*self.output.chain.load() {
            chain.source.source().seek(frame);
        }
    }

    /// Relative seek forward, clamped to the end
    pub fn fast_forward(&self, seconds: f64) {
        if !self.is_loaded() || !seconds.is_finite() {
            return;
        }
        let target = self.position_seconds() + seconds.abs();
        self.seek(target);
    }

    /// Relative seek backward, clamped to the start
    pub fn rewind(&self, seconds: f64) {
        if !self.is_loaded() || !seconds.is_finite() {
            return;
        }
        let target = self.position_seconds() - seconds.abs();
        self.seek(target);
    }

    pub fn position_frames(&self) -> u64 {
        self.output.position_frames()
    }

    pub fn position_seconds(&self) -> f64 {
        frames_to_seconds(self.output.position_frames())
    }

    pub fn length_seconds(&self) -> f64 {
        frames_to_seconds(self.output.length_frames())
    }

    // ─────────────────────────────────────────────────────────────
    // Gain
    // ─────────────────────────────────────────────────────────────

    /// Set base volume, clamped to [0, 2]. Returns the applied value.
    pub fn set_volume(&self, volume: f32) -> f32 {
        let applied = clamp_volume(volume);
        self.output.volume.store(applied, Ordering::Relaxed);
        applied
    }

    pub fn volume(&self) -> f32 {
        self.output.volume()
    }

    /// This deck's share of the crossfader
    pub fn crossfader_gain(&self) -> f32 {
        self.crossfader.gains().for_deck(self.id)
    }

    /// volume × crossfader gain, as the next pull will apply it
    pub fn effective_gain(&self) -> f32 {
        self.volume() * self.crossfader_gain()
    }

    // ─────────────────────────────────────────────────────────────
    // Cue points
    // ─────────────────────────────────────────────────────────────

    /// Store the current position as a cue point.
    ///
    /// Returns the cue's index (the existing one for an exact repeat), or
    /// None on an empty deck.
    pub fn add_cue_point(&mut self) -> Option<usize> {
        if !self.is_loaded() {
            return None;
        }
        let position = self.position_frames();
        if let Some(index) = self.cue_points.iter().position(|&cue| cue == position) {
            return Some(index);
        }
        self.cue_points.push(position);
        Some(self.cue_points.len() - 1)
    }

    /// Seek to a stored cue. Out-of-range indices are reported and ignored.
    pub fn jump_to_cue_point(&self, index: usize) -> EngineResult<()> {
        let Some(&frame) = self.cue_points.get(index) else {
            self.diagnostics.warn(format_args!(
                "cue point {} does not exist ({} stored)",
                index,
                self.cue_points.len()
            ));
            return Err(EngineError::OutOfRange {
                index,
                count: self.cue_points.len(),
            });
        };
        self.seek_frames(frame);
        Ok(())
    }

    /// Remove a cue point, returning its offset in seconds
    pub fn remove_cue_point(&mut self, index: usize) -> EngineResult<f64> {
        if index >= self.cue_points.len() {
            self.diagnostics.warn(format_args!(
                "cannot remove cue point {} ({} stored)",
                index,
                self.cue_points.len()
            ));
            return Err(EngineError::OutOfRange {
                index,
                count: self.cue_points.len(),
            });
        }
        Ok(frames_to_seconds(self.cue_points.remove(index)))
    }

    pub fn clear_cue_points(&mut self) {
        self.cue_points.clear();
    }

    /// Cue offsets in seconds, in insertion order
    pub fn cue_points(&self) -> Vec<f64> {
        self.cue_points.iter().map(|&f| frames_to_seconds(f)).collect()
    }
}
