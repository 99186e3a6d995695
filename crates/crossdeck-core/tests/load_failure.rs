//! Failed loads leave the deck exactly as it was

use std::path::Path;

use crossdeck_core::config::EngineConfig;
use crossdeck_core::engine::{build_engine, EngineParts};
use crossdeck_core::source::DecodedAudio;
use crossdeck_core::{DeckId, DeckState, EngineError, SAMPLE_RATE};

fn write_wav(path: &Path, frames: usize) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let v = ((i % 100) as i16) * 100;
        writer.write_sample(v).unwrap();
        writer.write_sample(-v).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn corrupt_and_empty_files_keep_prior_source() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.wav");
    let empty = dir.path().join("empty.wav");
    let corrupt = dir.path().join("corrupt.wav");
    write_wav(&good, 4410);
    write_wav(&empty, 0);
    std::fs::write(&corrupt, vec![0x13u8; 4096]).unwrap();

    let EngineParts {
        mut transport,
        mut mixer,
        ..
    } = build_engine(&EngineConfig::default());

    let info = transport.load_file(DeckId::ONE, &good).unwrap();
    assert_eq!(info.frames, 4410);
    transport.set_crossfader(-1.0);
    transport.play(DeckId::ONE);
    transport.seek(DeckId::ONE, 0.05);
    transport.add_cue_point(DeckId::ONE);
    let before = mixer.read(64).to_vec();
    let position = transport.position(DeckId::ONE);

    for bad in [&empty, &corrupt] {
        let err = transport.load_file(DeckId::ONE, bad).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)), "{:?}: {}", bad, err);
        assert_eq!(transport.state(DeckId::ONE), DeckState::Playing);
        assert_eq!(transport.position(DeckId::ONE), position);
        assert_eq!(transport.cue_points(DeckId::ONE).len(), 1);
    }

    // Still playing the same material
    transport.jump_to_cue_point(DeckId::ONE, 0).unwrap();
    assert_eq!(mixer.read(64), &before[..]);
}

#[test]
fn unsupported_and_missing_files_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "not audio").unwrap();

    let EngineParts { mut transport, .. } = build_engine(&EngineConfig::default());

    let err = transport.load_file(DeckId::TWO, &text).unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedFormat(_)));

    let err = transport
        .load_file(DeckId::TWO, dir.path().join("gone.flac"))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    assert_eq!(transport.state(DeckId::TWO), DeckState::Empty);
}

#[test]
fn zero_length_decoded_audio_is_rejected() {
    let EngineParts { mut transport, .. } = build_engine(&EngineConfig::default());
    let err = transport
        .load_decoded(DeckId::ONE, "nothing", &DecodedAudio::new(Vec::new(), 2, SAMPLE_RATE))
        .unwrap_err();
    assert!(matches!(err, EngineError::Decode(_)));
    assert_eq!(transport.state(DeckId::ONE), DeckState::Empty);
}
