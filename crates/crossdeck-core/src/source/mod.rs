//! Audio sources
//!
//! - [`AudioSource`]: a fully decoded, seekable stereo buffer at 44.1kHz with
//!   a lock-free read cursor
//! - [`LoopingSource`]: wraps an `AudioSource` so it never runs dry
//! - [`decode`]: the decode capability (symphonia by default)
//! - [`normalize`]: channel folding and sample-rate conversion applied on load
//! - [`tone`]: generated test tones

pub mod decode;
pub mod normalize;
pub mod tone;

use std::sync::atomic::{AtomicU64, Ordering};

use basedrop::Shared;

use crate::engine::gc::gc_handle;
use crate::error::{EngineError, EngineResult};
use crate::types::{frames_to_seconds, StereoSample, SAMPLE_RATE};

pub use decode::{AudioDecoder, DecodedAudio, SymphoniaDecoder};
pub use tone::sine_tone;

/// Decoded, seekable, finite stereo stream at the canonical sample rate
///
/// Reads happen on the audio thread and seeks on the control thread, both
/// through `&self`. The cursor only advances if no seek landed in between,
/// so a seek issued mid-pull always wins.
pub struct AudioSource {
    frames: Shared<Vec<StereoSample>>,
    cursor: AtomicU64,
}

impl AudioSource {
    /// Wrap already-normalized frames. Rejects empty input.
    pub fn new(frames: Vec<StereoSample>) -> EngineResult<Self> {
        if frames.is_empty() {
            return Err(EngineError::Decode(
                "audio has no frames (zero-length source)".to_string(),
            ));
        }
        Ok(Self {
            frames: Shared::new(&gc_handle(), frames),
            cursor: AtomicU64::new(0),
        })
    }

    /// Total frames
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a constructed source
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    pub fn channels(&self) -> usize {
        crate::types::CHANNELS
    }

    pub fn duration_seconds(&self) -> f64 {
        frames_to_seconds(self.len() as u64)
    }

    /// Current read cursor in frames
    #[inline]
    pub fn position(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Move the cursor, clamped into [0, len)
    pub fn seek(&self, frame: u64) {
        let last = self.len().saturating_sub(1) as u64;
        self.cursor.store(frame.min(last), Ordering::Release);
    }

    /// Copy up to `out.len()` frames from the cursor. Returns frames copied;
    /// 0 means the cursor is at the end.
    pub fn read(&self, out: &mut [StereoSample]) -> usize {
        let start = self.cursor.load(Ordering::Acquire);
        let len = self.frames.len();
        let Ok(start_idx) = usize::try_from(start) else {
            return 0;
        };
        if start_idx >= len {
            return 0;
        }

        let count = out.len().min(len - start_idx);
        out[..count].copy_from_slice(&self.frames[start_idx..start_idx + count]);

        // A failed exchange means a seek happened during the copy; keep it.
        let _ = self.cursor.compare_exchange(
            start,
            start + count as u64,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        count
    }

    /// Move an exhausted cursor back to frame 0.
    ///
    /// Only succeeds while the cursor still sits at the end; a seek that
    /// landed after the exhausting read is kept.
    pub fn rewind_if_exhausted(&self) -> bool {
        self.cursor
            .compare_exchange(self.len() as u64, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Direct access to the decoded frames
    pub fn frames(&self) -> &[StereoSample] {
        &self.frames
    }
}

impl std::fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSource")
            .field("frames", &self.len())
            .field("cursor", &self.position())
            .finish()
    }
}

/// Makes a finite source behave as an infinite one
///
/// On exhaustion the wrapped cursor is reset to 0 (unless a seek moved it
/// first) and filling continues in the same buffer, so `read` always produces
/// exactly `out.len()` frames.
#[derive(Debug)]
pub struct LoopingSource {
    source: AudioSource,
}

impl LoopingSource {
    pub fn new(source: AudioSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    /// Fill `out` completely, wrapping around the end of the source
    pub fn read(&self, out: &mut [StereoSample]) {
        let mut filled = 0;
        let mut empty_reads = 0;
        while filled < out.len() {
            let n = self.source.read(&mut out[filled..]);
            if n == 0 {
                empty_reads += 1;
                // Two empty reads in a row means even frame 0 yields nothing
                if empty_reads > 1 {
                    out[filled..].fill(StereoSample::silence());
                    return;
                }
                self.source.rewind_if_exhausted();
            } else {
                empty_reads = 0;
                filled += n;
            }
        }
    }
}
