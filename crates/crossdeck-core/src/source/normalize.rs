//! Load-time normalization to the engine format (44.1kHz stereo f32)
//!
//! Runs on the control thread, before the new chain is swapped into a deck.
//! Stages are only applied when needed:
//! - channel fold: mono is duplicated, more than two channels keep the first two
//! - sample-rate conversion with rubato when the file is not at 44.1kHz

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::{EngineError, EngineResult};
use crate::source::decode::DecodedAudio;
use crate::types::{StereoSample, SAMPLE_RATE};

/// Input frames per resampler pass
const RESAMPLE_CHUNK: usize = 1024;

/// Which normalization stages a load went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Normalization {
    /// Channel count of the decoded file
    pub source_channels: usize,
    /// Sample rate of the decoded file
    pub source_rate: u32,
    /// Mono was duplicated to both channels
    pub upmixed: bool,
    /// Extra channels were dropped
    pub folded: bool,
    /// The rate converter was spliced in
    pub resampled: bool,
}

/// Convert decoded audio of any layout into engine frames
pub fn normalize(audio: &DecodedAudio) -> EngineResult<(Vec<StereoSample>, Normalization)> {
    audio.validate()?;

    let report = Normalization {
        source_channels: audio.channels,
        source_rate: audio.sample_rate,
        upmixed: audio.channels == 1,
        folded: audio.channels > 2,
        resampled: audio.sample_rate != SAMPLE_RATE,
    };

    let frames = to_stereo(&audio.samples, audio.channels);

    if !report.resampled {
        return Ok((frames, report));
    }

    let resampled = resample_to_engine_rate(&frames, audio.sample_rate)?;
    if resampled.is_empty() {
        return Err(EngineError::Decode(
            "resampling produced no frames".to_string(),
        ));
    }

    log::debug!(
        "Resampled {} frames @ {}Hz -> {} frames @ {}Hz",
        frames.len(),
        audio.sample_rate,
        resampled.len(),
        SAMPLE_RATE
    );

    Ok((resampled, report))
}

/// Fold interleaved samples of any channel count into stereo frames
pub fn to_stereo(samples: &[f32], channels: usize) -> Vec<StereoSample> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().map(|&s| StereoSample::mono(s)).collect(),
        _ => samples
            .chunks_exact(channels)
            .map(|frame| StereoSample::new(frame[0], frame[1]))
            .collect(),
    }
}

/// Rate-convert stereo frames from `input_rate` to the engine rate
pub fn resample_to_engine_rate(
    frames: &[StereoSample],
    input_rate: u32,
) -> EngineResult<Vec<StereoSample>> {
    if input_rate == SAMPLE_RATE {
        return Ok(frames.to_vec());
    }
    if input_rate == 0 {
        return Err(EngineError::Decode("cannot resample from 0 Hz".to_string()));
    }

    let ratio = SAMPLE_RATE as f64 / input_rate as f64;
    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Septic,
        RESAMPLE_CHUNK,
        2,
    )
    .map_err(|e| EngineError::Decode(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (frames.len() as f64 * ratio).round() as usize;

    let left: Vec<f32> = frames.iter().map(|f| f.left).collect();
    let right: Vec<f32> = frames.iter().map(|f| f.right).collect();

    let mut out_left: Vec<f32> = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);
    let mut out_right: Vec<f32> = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut chunk_left = vec![0.0f32; RESAMPLE_CHUNK];
    let mut chunk_right = vec![0.0f32; RESAMPLE_CHUNK];

    // Keep feeding (zero-padded past the end) until the delayed tail is out
    let mut pos = 0;
    while out_left.len() < expected + delay {
        let take = left.len().saturating_sub(pos).min(RESAMPLE_CHUNK);
        chunk_left.fill(0.0);
        chunk_right.fill(0.0);
        if take > 0 {
            chunk_left[..take].copy_from_slice(&left[pos..pos + take]);
            chunk_right[..take].copy_from_slice(&right[pos..pos + take]);
        }
        pos += RESAMPLE_CHUNK;

        let input = [chunk_left.as_slice(), chunk_right.as_slice()];
        let output = resampler
            .process(&input[..], None)
            .map_err(|e| EngineError::Decode(format!("Resampling failed: {}", e)))?;

        if output[0].is_empty() && take == 0 {
            break;
        }
        out_left.extend_from_slice(&output[0]);
        out_right.extend_from_slice(&output[1]);
    }

    let end = (expected + delay).min(out_left.len());
    let start = delay.min(end);

    Ok(out_left[start..end]
        .iter()
        .zip(&out_right[start..end])
        .map(|(&l, &r)| StereoSample::new(l, r))
        .collect())
}
