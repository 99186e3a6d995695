//! Generated test tones, for checking the output path without a file

use std::f64::consts::TAU;

use crate::error::{EngineError, EngineResult};
use crate::source::decode::DecodedAudio;
use crate::types::SAMPLE_RATE;

/// Amplitude of generated tones (-6 dBFS)
pub const TONE_AMPLITUDE: f32 = 0.5;

/// Longest tone that will be generated, in seconds
pub const MAX_TONE_SECONDS: f64 = 3600.0;

/// A stereo sine at the engine rate
pub fn sine_tone(frequency_hz: f64, seconds: f64) -> EngineResult<DecodedAudio> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(EngineError::Decode(format!(
            "invalid tone frequency: {} Hz",
            frequency_hz
        )));
    }
    if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_TONE_SECONDS {
        return Err(EngineError::Decode(format!(
            "invalid tone duration: {} s",
            seconds
        )));
    }

    let frames = (seconds * SAMPLE_RATE as f64).round() as usize;
    let step = TAU * frequency_hz / SAMPLE_RATE as f64;

    let mut samples = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let value = (step * i as f64).sin() as f32 * TONE_AMPLITUDE;
        samples.push(value);
        samples.push(value);
    }

    Ok(DecodedAudio::new(samples, 2, SAMPLE_RATE))
}
