//! Full path: load a known source, play it through the mixer, compare output

use crossdeck_core::config::EngineConfig;
use crossdeck_core::engine::{build_engine, EngineParts};
use crossdeck_core::source::DecodedAudio;
use crossdeck_core::{DeckId, DeckState, SAMPLE_RATE};

const TRACK_SECONDS: usize = 10;

/// Interleaved stereo ramp, distinct per channel, peak below every limit
fn ramp_track(frames: usize) -> DecodedAudio {
    let mut samples = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        samples.push((i % 1000) as f32 / 2000.0);
        samples.push(-((i % 700) as f32) / 2000.0);
    }
    DecodedAudio::new(samples, 2, SAMPLE_RATE)
}

#[test]
fn ten_second_track_loops_through_mixer() {
    let frames = TRACK_SECONDS * SAMPLE_RATE as usize;
    let track = ramp_track(frames);

    let EngineParts {
        mut transport,
        mut mixer,
        ..
    } = build_engine(&EngineConfig::default());

    transport.load_decoded(DeckId::ONE, "ramp", &track).unwrap();
    transport.set_volume(DeckId::ONE, 1.0);
    transport.set_crossfader(-1.0);
    transport.play(DeckId::ONE);
    assert_eq!(transport.state(DeckId::TWO), DeckState::Empty);

    // 10.5 s in uneven blocks
    let total = frames + SAMPLE_RATE as usize / 2;
    let mut output = Vec::with_capacity(total * 2);
    let mut remaining = total;
    let mut block = 1;
    while remaining > 0 {
        let n = block.min(remaining);
        let out = mixer.read(n);
        assert_eq!(out.len(), n * 2);
        output.extend_from_slice(out);
        remaining -= n;
        block = block * 3 % 4099 + 1;
    }

    // First 10 s match the source, the next 0.5 s match it again from frame 0
    for i in 0..total {
        let src = i % frames;
        assert_eq!(output[i * 2], track.samples[src * 2], "left at frame {}", i);
        assert_eq!(output[i * 2 + 1], track.samples[src * 2 + 1], "right at frame {}", i);
    }

    assert_eq!(
        transport.position(DeckId::ONE),
        (SAMPLE_RATE as f64 / 2.0) / SAMPLE_RATE as f64
    );
    assert!(!mixer.atomics().take_clip());
}

#[test]
fn read_always_returns_requested_frames() {
    let EngineParts {
        mut transport,
        mut mixer,
        ..
    } = build_engine(&EngineConfig::default());
    transport.load_test_tone(DeckId::TWO, 440.0, 0.01).unwrap();
    transport.play(DeckId::TWO);

    for frames in [0usize, 1, 7, 64, 441, 512, 8192, 10_000] {
        assert_eq!(mixer.read(frames).len(), frames * 2);
    }

    let mut interleaved = vec![1.0f32; 1025];
    mixer.read_into(&mut interleaved);
    assert_eq!(interleaved[1024], 0.0);
}

#[test]
fn crossfader_selects_deck() {
    let EngineParts {
        mut transport,
        mut mixer,
        ..
    } = build_engine(&EngineConfig::default());

    let left = DecodedAudio::new(vec![0.25; 2 * 4410], 2, SAMPLE_RATE);
    let right = DecodedAudio::new(vec![-0.5; 2 * 4410], 2, SAMPLE_RATE);
    transport.load_decoded(DeckId::ONE, "left", &left).unwrap();
    transport.load_decoded(DeckId::TWO, "right", &right).unwrap();
    transport.play(DeckId::ONE);
    transport.play(DeckId::TWO);

    transport.set_crossfader(-1.0);
    assert!(mixer.read(256).iter().all(|&s| s == 0.25));

    transport.set_crossfader(1.0);
    assert!(mixer.read(256).iter().all(|&s| s == -0.5));

    transport.set_crossfader(0.0);
    assert!(mixer.read(256).iter().all(|&s| (s - (-0.125)).abs() < 1e-6));

    // Pausing one deck leaves only the other in the mix
    transport.pause(DeckId::TWO);
    assert!(mixer.read(256).iter().all(|&s| (s - 0.125).abs() < 1e-6));
}

#[test]
fn hot_sources_are_limited_and_bus_stays_below_full_scale() {
    let EngineParts {
        mut transport,
        mut mixer,
        mut events,
        ..
    } = build_engine(&EngineConfig::default());

    let hot = DecodedAudio::new(vec![1.6; 2 * 4410], 2, SAMPLE_RATE);
    transport.load_decoded(DeckId::ONE, "hot", &hot).unwrap();
    transport.load_decoded(DeckId::TWO, "hot", &hot).unwrap();
    transport.set_volume(DeckId::ONE, 2.0);
    transport.set_volume(DeckId::TWO, 2.0);
    transport.play(DeckId::ONE);
    transport.play(DeckId::TWO);

    for &s in mixer.read(1024) {
        assert!(s.abs() < 1.0, "bus sample {} reached full scale", s);
    }
    assert!(mixer.atomics().take_clip());
    assert!(!events.drain().is_empty());
}
