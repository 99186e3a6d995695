//! Common types for Crossdeck
//!
//! Fundamental audio types shared by the engine: stereo frames, the
//! pre-allocated buffers the mixer works in, and deck identity.

use std::fmt;

/// Canonical engine sample rate. Every source is normalized to this on load.
pub const SAMPLE_RATE: u32 = 44100;

/// Output channel count (interleaved stereo)
pub const CHANNELS: usize = 2;

/// Number of decks in the mixer
pub const NUM_DECKS: usize = 2;

/// Largest block the mixer renders in one pass from its pre-allocated scratch.
/// Common hardware periods: 64, 128, 256, 512, 1024, 2048, 4096 frames
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default output period in frames (~11.6ms at 44.1kHz)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Audio sample type
pub type Sample = f32;

/// Convert a frame count at the canonical rate to seconds
#[inline]
pub fn frames_to_seconds(frames: u64) -> f64 {
    frames as f64 / SAMPLE_RATE as f64
}

/// Convert seconds to a frame count at the canonical rate.
///
/// Negative and non-finite inputs map to frame 0.
#[inline]
pub fn seconds_to_frames(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * SAMPLE_RATE as f64).floor() as u64
    } else {
        0
    }
}

/// A single stereo frame (left and right channels)
///
/// Uses `#[repr(C)]` to ensure predictable memory layout: [left, right].
/// This enables zero-copy conversion between `&[StereoSample]` and `&[f32]`
/// (interleaved format) using bytemuck, which is what the output sink wants.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Exact digital silence (+0.0 in both channels)
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Same value in both channels
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.right.is_finite()
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// Peak amplitude over a slice of frames.
///
/// NaN samples propagate as NaN so callers can detect a broken source.
pub fn peak_of(frames: &[StereoSample]) -> Sample {
    let mut peak: Sample = 0.0;
    for frame in frames {
        if !frame.is_finite() {
            return Sample::NAN;
        }
        peak = peak.max(frame.peak());
    }
    peak
}

/// A buffer of stereo frames
///
/// The mixer keeps one of these per slot, allocated once at startup with
/// `MAX_BUFFER_SIZE` capacity and resized within that capacity per pull.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a new buffer with the specified capacity (in frames)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Must not exceed capacity. Newly exposed frames are silent.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        let current_len = self.samples.len();
        if new_len > current_len {
            debug_assert!(
                new_len <= self.samples.capacity(),
                "set_len_from_capacity called with len > capacity"
            );
            self.samples.resize(new_len, StereoSample::silence());
        } else {
            self.samples.truncate(new_len);
        }
    }

    /// Grow the buffer so it can hold `len` frames. Allocates; never call on
    /// the audio thread.
    pub fn reserve_frames(&mut self, len: usize) {
        if len > self.samples.capacity() {
            self.samples.reserve_exact(len - self.samples.len());
        }
    }

    pub fn fill_silence(&mut self) {
        self.samples.fill(StereoSample::silence());
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Zero-copy view of the frames as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }
}

/// Deck identifier. Decks are numbered 1 and 2 on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeckId(usize);

impl DeckId {
    /// Deck 1, the left side of the crossfader
    pub const ONE: DeckId = DeckId(0);
    /// Deck 2, the right side of the crossfader
    pub const TWO: DeckId = DeckId(1);

    pub const ALL: [DeckId; NUM_DECKS] = [DeckId::ONE, DeckId::TWO];

    /// Look up a deck by its display number (1 or 2)
    pub fn from_number(number: usize) -> Option<Self> {
        match number {
            1 => Some(DeckId::ONE),
            2 => Some(DeckId::TWO),
            _ => None,
        }
    }

    /// Zero-based slot index
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }

    /// Deck number for display (1 or 2)
    pub fn number(&self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deck {}", self.number())
    }
}

/// Observable deck state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeckState {
    /// No source loaded
    #[default]
    Empty,
    /// Source loaded, output gated to silence
    Stopped,
    Playing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sample_operations() {
        let a = StereoSample::new(1.0, 2.0);
        let b = StereoSample::new(0.5, 0.5);

        let sum = a + b;
        assert_eq!(sum.left, 1.5);
        assert_eq!(sum.right, 2.5);

        let scaled = a * 0.5;
        assert_eq!(scaled.left, 0.5);
        assert_eq!(scaled.right, 1.0);
    }

    #[test]
    fn test_stereo_buffer_interleaved_view() {
        let mut buffer = StereoBuffer::with_capacity(4);
        buffer.set_len_from_capacity(2);
        buffer.as_mut_slice()[1] = StereoSample::new(3.0, 4.0);

        assert_eq!(buffer.as_interleaved(), &[0.0, 0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_set_len_from_capacity_fills_silence() {
        let mut buffer = StereoBuffer::with_capacity(16);
        buffer.set_len_from_capacity(8);
        assert_eq!(buffer.len(), 8);
        assert!(buffer.as_slice().iter().all(|s| *s == StereoSample::silence()));
        buffer.set_len_from_capacity(4);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.capacity(), 16);
    }

    #[test]
    fn test_peak_reports_nan_for_broken_frames() {
        let frames = [StereoSample::new(0.2, -0.7), StereoSample::mono(0.1)];
        assert_eq!(peak_of(&frames), 0.7);

        let broken = [StereoSample::new(0.2, f32::NAN)];
        assert!(peak_of(&broken).is_nan());
    }

    #[test]
    fn test_deck_numbers() {
        assert_eq!(DeckId::from_number(1), Some(DeckId::ONE));
        assert_eq!(DeckId::from_number(2), Some(DeckId::TWO));
        assert_eq!(DeckId::from_number(3), None);
        assert_eq!(DeckId::TWO.index(), 1);
        assert_eq!(DeckId::TWO.to_string(), "deck 2");
    }

    #[test]
    fn test_seconds_frames_conversion() {
        assert_eq!(seconds_to_frames(1.0), 44100);
        assert_eq!(seconds_to_frames(-3.0), 0);
        assert_eq!(seconds_to_frames(f64::NAN), 0);
        assert_eq!(frames_to_seconds(22050), 0.5);
    }
}
