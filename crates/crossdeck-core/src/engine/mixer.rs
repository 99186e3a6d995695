//! Mixer - combines the fixed deck slots into one stereo stream
//!
//! Per pull:
//! 1. Snapshot the crossfader gains once, so every slot in this pull sees the
//!    same pair
//! 2. Pull each attached slot into its own pre-allocated scratch buffer
//! 3. Per-source limit (scale the block if it peaks above the threshold)
//! 4. Sum into the bus, apply master volume
//! 5. Bus soft clip, update meters
//!
//! Nothing here blocks or allocates once the mixer is built, as long as
//! `read` is asked for at most `MAX_BUFFER_SIZE` frames (`render` and
//! `read_into` never allocate). A slot that produces non-finite samples is
//! dropped from that pull and the rest of the mix continues.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF32;

use super::crossfader::{CrossfaderGains, CrossfaderState};
use super::limiter::{BusClipper, SourceLimiter};
use crate::config::MixerConfig;
use crate::diagnostics::{MixEvent, MixEventSender};
use crate::error::{EngineError, EngineResult};
use crate::types::{peak_of, DeckId, StereoBuffer, StereoSample, MAX_BUFFER_SIZE, NUM_DECKS};

/// Per-pull state handed to every provider
#[derive(Debug, Clone, Copy)]
pub struct PullContext {
    /// Crossfader gains for this pull
    pub crossfader: CrossfaderGains,
}

/// A source of stereo frames wired into a mixer slot
///
/// Called on the audio thread. Implementations must fill `out` completely
/// and must not block, allocate, or panic.
pub trait FrameProvider: Send + Sync {
    fn pull(&self, out: &mut [StereoSample], ctx: &PullContext);
}

/// Lock-free mixer controls and meters shared with the control side
pub struct MixerAtomics {
    /// Master gain [0, 1], written by control
    pub master_volume: AtomicF32,
    /// Bus peak of the last pull, before the soft clip
    pub peak: AtomicF32,
    /// Set by the audio thread when the soft clip engages; cleared by readers
    pub clip: AtomicBool,
}

impl MixerAtomics {
    pub fn new(master_volume: f32) -> Self {
        Self {
            master_volume: AtomicF32::new(clamp_master(master_volume)),
            peak: AtomicF32::new(0.0),
            clip: AtomicBool::new(false),
        }
    }

    /// Clamp to [0, 1] and store. Returns the applied value.
    pub fn set_master_volume(&self, volume: f32) -> f32 {
        let volume = clamp_master(volume);
        self.master_volume.store(volume, Ordering::Relaxed);
        volume
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.master_volume.load(Ordering::Relaxed)
    }

    /// Last bus peak (pre-clip)
    #[inline]
    pub fn peak(&self) -> f32 {
        self.peak.load(Ordering::Relaxed)
    }

    /// Whether the soft clip engaged since the indicator was last cleared
    #[inline]
    pub fn clip(&self) -> bool {
        self.clip.load(Ordering::Relaxed)
    }

    /// Read and clear the clip indicator
    pub fn take_clip(&self) -> bool {
        self.clip.swap(false, Ordering::Relaxed)
    }
}

fn clamp_master(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Pull-based two-slot mixer. Owned by the audio context once started.
pub struct Mixer {
    slots: [Option<Arc<dyn FrameProvider>>; NUM_DECKS],
    /// One pre-allocated scratch buffer per slot
    scratch: [StereoBuffer; NUM_DECKS],
    /// Output buffer backing `read`
    output: StereoBuffer,
    crossfader: Arc<CrossfaderState>,
    limiter: SourceLimiter,
    clipper: BusClipper,
    atomics: Arc<MixerAtomics>,
    events: MixEventSender,
    /// Edge detection so events fire on state changes, not every block
    limited_last: [bool; NUM_DECKS],
    silenced_last: [bool; NUM_DECKS],
    clipped_last: bool,
}

impl Mixer {
    pub fn new(
        crossfader: Arc<CrossfaderState>,
        config: &MixerConfig,
        events: MixEventSender,
    ) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            scratch: std::array::from_fn(|_| StereoBuffer::with_capacity(MAX_BUFFER_SIZE)),
            output: StereoBuffer::with_capacity(MAX_BUFFER_SIZE),
            crossfader,
            limiter: SourceLimiter::new(config.source_limit),
            clipper: BusClipper::new(config.bus_knee, config.bus_ceiling),
            atomics: Arc::new(MixerAtomics::new(config.master_volume)),
            events,
            limited_last: [false; NUM_DECKS],
            silenced_last: [false; NUM_DECKS],
            clipped_last: false,
        }
    }

    /// Wire a provider into a slot. Slots are fixed at startup: attaching to
    /// an occupied slot is refused rather than rewiring a live graph.
    pub fn attach_source(&mut self, slot: usize, provider: Arc<dyn FrameProvider>) -> EngineResult<()> {
        let count = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(EngineError::OutOfRange { index: slot, count })?;
        if entry.is_some() {
            return Err(EngineError::ConcurrencyInvariantViolation(format!(
                "mixer slot {} is already wired",
                slot
            )));
        }
        *entry = Some(provider);
        Ok(())
    }

    pub fn is_attached(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Shared controls/meters for the control side
    pub fn atomics(&self) -> Arc<MixerAtomics> {
        Arc::clone(&self.atomics)
    }

    /// Mix `frames` frames and return them as interleaved stereo.
    ///
    /// The returned slice always holds `frames * 2` samples. Requests larger
    /// than `MAX_BUFFER_SIZE` grow the internal buffer once.
    pub fn read(&mut self, frames: usize) -> &[f32] {
        let mut output = std::mem::take(&mut self.output);
        output.reserve_frames(frames);
        output.set_len_from_capacity(frames);
        self.render(output.as_mut_slice());
        self.output = output;
        self.output.as_interleaved()
    }

    /// Mix into an interleaved stereo buffer supplied by the sink.
    ///
    /// A trailing odd sample is set to silence.
    pub fn read_into(&mut self, out: &mut [f32]) {
        let even = out.len() & !1;
        let (head, tail) = out.split_at_mut(even);
        tail.fill(0.0);
        match bytemuck::try_cast_slice_mut::<f32, StereoSample>(head) {
            Ok(frames) => self.render(frames),
            Err(_) => head.fill(0.0),
        }
    }

    /// Mix `out.len()` frames into `out`, in blocks of at most
    /// `MAX_BUFFER_SIZE`.
    pub fn render(&mut self, out: &mut [StereoSample]) {
        for block in out.chunks_mut(MAX_BUFFER_SIZE) {
            self.render_block(block);
        }
    }

    fn render_block(&mut self, bus: &mut [StereoSample]) {
        let frames = bus.len();
        bus.fill(StereoSample::silence());

        let ctx = PullContext {
            crossfader: self.crossfader.gains(),
        };

        let Self {
            slots,
            scratch,
            limiter,
            events,
            limited_last,
            silenced_last,
            ..
        } = self;

        for (index, slot) in slots.iter().enumerate() {
            let Some(provider) = slot else {
                continue;
            };
            let deck = DeckId::ALL[index];

            let buffer = &mut scratch[index];
            buffer.set_len_from_capacity(frames);
            buffer.fill_silence();
            provider.pull(buffer.as_mut_slice(), &ctx);

            let peak = peak_of(buffer.as_slice());
            if !peak.is_finite() {
                if !silenced_last[index] {
                    events.send(MixEvent::SlotSilenced { deck });
                }
                silenced_last[index] = true;
                continue;
            }
            silenced_last[index] = false;

            if peak == 0.0 {
                limited_last[index] = false;
                continue;
            }

            let gain = limiter.gain_for_peak(peak);
            let limited = gain < 1.0;
            if limited && !limited_last[index] {
                events.send(MixEvent::SourceLimited { deck, peak });
            }
            limited_last[index] = limited;

            if limited {
                for (dst, src) in bus.iter_mut().zip(buffer.as_slice()) {
                    *dst += *src * gain;
                }
            } else {
                for (dst, src) in bus.iter_mut().zip(buffer.as_slice()) {
                    *dst += *src;
                }
            }
        }

        let master = self.atomics.master_volume();
        if master == 0.0 {
            bus.fill(StereoSample::silence());
        } else if master != 1.0 {
            for frame in bus.iter_mut() {
                *frame *= master;
            }
        }

        let peak = peak_of(bus);
        self.atomics.peak.store(peak, Ordering::Relaxed);

        let samples: &mut [f32] = bytemuck::cast_slice_mut(bus);
        let clipped = self.clipper.process(samples);
        if clipped {
            self.atomics.clip.store(true, Ordering::Relaxed);
            if !self.clipped_last {
                self.events.send(MixEvent::BusClipped { peak });
            }
        }
        self.clipped_last = clipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::mix_event_channel;

    /// Constant-value provider that ignores the crossfader
    struct Dc(f32);

    impl FrameProvider for Dc {
        fn pull(&self, out: &mut [StereoSample], _ctx: &PullContext) {
            out.fill(StereoSample::mono(self.0));
        }
    }

    /// Constant provider scaled by its crossfader side
    struct FadedDc(DeckId, f32);

    impl FrameProvider for FadedDc {
        fn pull(&self, out: &mut [StereoSample], ctx: &PullContext) {
            out.fill(StereoSample::mono(self.1 * ctx.crossfader.for_deck(self.0)));
        }
    }

    struct Broken;

    impl FrameProvider for Broken {
        fn pull(&self, out: &mut [StereoSample], _ctx: &PullContext) {
            out.fill(StereoSample::mono(f32::NAN));
        }
    }

    fn make_mixer() -> (Mixer, crate::diagnostics::MixEventReceiver) {
        let (tx, rx) = mix_event_channel(64);
        let mixer = Mixer::new(
            Arc::new(CrossfaderState::default()),
            &MixerConfig::default(),
            tx,
        );
        (mixer, rx)
    }

    #[test]
    fn test_read_returns_requested_frames_with_no_slots() {
        let (mut mixer, _rx) = make_mixer();
        for frames in [0, 1, 64, 512, MAX_BUFFER_SIZE, MAX_BUFFER_SIZE * 3 + 7] {
            let out = mixer.read(frames);
            assert_eq!(out.len(), frames * 2);
            assert!(out.iter().all(|&s| s == 0.0 && s.is_sign_positive()));
        }
    }

    #[test]
    fn test_sum_below_limits_is_exact() {
        let (mut mixer, _rx) = make_mixer();
        mixer.attach_source(0, Arc::new(Dc(0.25))).unwrap();
        mixer.attach_source(1, Arc::new(Dc(0.125))).unwrap();

        let out = mixer.read(256);
        assert!(out.iter().all(|&s| s == 0.375));
    }

    #[test]
    fn test_hot_source_is_limited_to_threshold() {
        let (mut mixer, mut rx) = make_mixer();
        mixer.attach_source(0, Arc::new(Dc(1.6))).unwrap();

        let out = mixer.read(64).to_vec();
        // 1.6 limited to 0.8, then soft-clipped above the 0.7 knee
        let expected = BusClipper::default().shape(0.8);
        assert!(out.iter().all(|&s| (s - expected).abs() < 1e-6));
        assert!(expected < 0.8);

        let events = rx.drain();
        assert!(events.contains(&MixEvent::SourceLimited { deck: DeckId::ONE, peak: 1.6 }));
        assert!(matches!(events.last(), Some(MixEvent::BusClipped { .. })));
        assert!(mixer.atomics().clip());
        assert!(mixer.atomics().take_clip());
        assert!(!mixer.atomics().clip());
        assert!(!mixer.atomics().take_clip());
    }

    #[test]
    fn test_two_hot_sources_never_exceed_ceiling() {
        let (mut mixer, _rx) = make_mixer();
        mixer.attach_source(0, Arc::new(Dc(0.95))).unwrap();
        mixer.attach_source(1, Arc::new(Dc(-0.95))).unwrap();
        assert!(mixer.read(32).iter().all(|&s| s == 0.0));

        let (mut mixer, _rx) = make_mixer();
        mixer.attach_source(0, Arc::new(Dc(0.95))).unwrap();
        mixer.attach_source(1, Arc::new(Dc(0.95))).unwrap();
        let out = mixer.read(32);
        assert!(out.iter().all(|&s| s > 0.7 && s <= 0.98));
    }

    #[test]
    fn test_broken_slot_degrades_to_silence() {
        let (mut mixer, mut rx) = make_mixer();
        mixer.attach_source(0, Arc::new(Broken)).unwrap();
        mixer.attach_source(1, Arc::new(Dc(0.5))).unwrap();

        let out = mixer.read(128).to_vec();
        assert!(out.iter().all(|&s| s == 0.5));
        mixer.read(128);

        // Reported once, not per block
        let events = rx.drain();
        assert_eq!(events, vec![MixEvent::SlotSilenced { deck: DeckId::ONE }]);
    }

    #[test]
    fn test_attach_rejects_bad_or_taken_slot() {
        let (mut mixer, _rx) = make_mixer();
        assert!(matches!(
            mixer.attach_source(2, Arc::new(Dc(0.1))),
            Err(EngineError::OutOfRange { index: 2, count: 2 })
        ));
        mixer.attach_source(1, Arc::new(Dc(0.1))).unwrap();
        assert!(matches!(
            mixer.attach_source(1, Arc::new(Dc(0.2))),
            Err(EngineError::ConcurrencyInvariantViolation(_))
        ));
        assert!(mixer.is_attached(1));
        assert!(!mixer.is_attached(0));
    }

    #[test]
    fn test_crossfader_snapshot_shared_by_both_slots() {
        let (tx, _rx) = mix_event_channel(8);
        let crossfader = Arc::new(CrossfaderState::new(-1.0));
        let mut mixer = Mixer::new(Arc::clone(&crossfader), &MixerConfig::default(), tx);
        mixer.attach_source(0, Arc::new(FadedDc(DeckId::ONE, 0.5))).unwrap();
        mixer.attach_source(1, Arc::new(FadedDc(DeckId::TWO, 0.5))).unwrap();

        for position in [-1.0, -0.3, 0.0, 0.6, 1.0] {
            crossfader.set_position(position);
            let out = mixer.read(16);
            assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6), "position {}", position);
        }
    }

    #[test]
    fn test_master_volume_and_peak_meter() {
        let (mut mixer, _rx) = make_mixer();
        mixer.attach_source(0, Arc::new(Dc(0.5))).unwrap();
        let atomics = mixer.atomics();

        assert_eq!(atomics.set_master_volume(3.0), 1.0);
        atomics.set_master_volume(0.5);
        assert!(mixer.read(8).iter().all(|&s| s == 0.25));
        assert_eq!(atomics.peak(), 0.25);

        atomics.set_master_volume(0.0);
        assert!(mixer.read(8).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_read_into_odd_length() {
        let (mut mixer, _rx) = make_mixer();
        mixer.attach_source(0, Arc::new(Dc(0.5))).unwrap();
        let mut out = vec![9.0f32; 7];
        mixer.read_into(&mut out);
        assert_eq!(&out[..6], &[0.5; 6]);
        assert_eq!(out[6], 0.0);
    }
}
