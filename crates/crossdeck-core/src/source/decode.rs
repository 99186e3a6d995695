//! Decode capability
//!
//! [`AudioDecoder`] turns a path into interleaved f32 PCM at whatever rate and
//! channel count the file has. Normalization to 44.1kHz stereo happens later,
//! in [`super::normalize`]. [`SymphoniaDecoder`] is the default implementation.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{EngineError, EngineResult};

/// File extensions the default decoder is built to read
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["wav", "wave", "flac", "mp3", "ogg"];

/// Interleaved PCM straight out of a decoder
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples, `channels` per frame
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    /// Reject audio a deck cannot play: no channels, no rate, no frames
    pub fn validate(&self) -> EngineResult<()> {
        if self.channels == 0 {
            return Err(EngineError::Decode("audio reports zero channels".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(EngineError::Decode("audio reports no sample rate".to_string()));
        }
        if self.frames() == 0 {
            return Err(EngineError::Decode(
                "audio has no frames (zero-length source)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decode/resample collaborator consumed by decks
///
/// Runs on the control thread only.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> EngineResult<DecodedAudio>;
}

/// Whether `path` carries an extension the default decoder handles
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Symphonia-backed decoder (wav/pcm, flac, mp3, ogg/vorbis)
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Classify a failure to open the container: a file we claim to support is
    /// corrupt, anything else is a format we do not handle.
    fn probe_error(path: &Path, err: SymphoniaError) -> EngineError {
        if is_supported_extension(path) {
            EngineError::Decode(format!("{}: {}", path.display(), err))
        } else {
            EngineError::UnsupportedFormat(format!("{}: {}", path.display(), err))
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> EngineResult<DecodedAudio> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EngineError::NotFound {
                path: path.to_path_buf(),
            },
            _ => EngineError::Decode(format!("{}: {}", path.display(), e)),
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Self::probe_error(path, e))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                EngineError::UnsupportedFormat(format!("{}: no audio track", path.display()))
            })?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
        let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| EngineError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(EngineError::Decode(format!("{}: {}", path.display(), e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count();

                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    // Corrupt packet; skip it and keep the rest of the track
                    skipped_packets += 1;
                    log::warn!("Skipping undecodable packet in {:?}: {}", path, msg);
                }
                Err(e) => {
                    return Err(EngineError::Decode(format!("{}: {}", path.display(), e)));
                }
            }
        }

        if skipped_packets > 0 {
            log::warn!("{:?}: skipped {} corrupt packets", path, skipped_packets);
        }

        let audio = DecodedAudio::new(samples, channels, sample_rate);
        audio.validate().map_err(|e| match e {
            EngineError::Decode(msg) => EngineError::Decode(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        log::debug!(
            "Decoded {:?}: {} frames, {} ch, {} Hz",
            path,
            audio.frames(),
            audio.channels,
            audio.sample_rate
        );

        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let samples: Vec<i16> = (0..2000).map(|i| ((i % 200) * 100) as i16).collect();
        write_wav(&path, 2, 44100, &samples);

        let audio = SymphoniaDecoder::new().decode(&path).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.frames(), 1000);
        assert!((audio.samples[1] - 100.0 / 32768.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_mono_wav_keeps_native_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 22050, &vec![1000i16; 500]);

        let audio = SymphoniaDecoder::new().decode(&path).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.frames(), 500);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = SymphoniaDecoder::new()
            .decode(Path::new("/nonexistent/track.wav"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_corrupt_wav_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wav");
        std::fs::write(&path, b"this is definitely not a riff header").unwrap();

        let err = SymphoniaDecoder::new().decode(&path).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn test_zero_length_wav_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 2, 44100, &[]);

        let err = SymphoniaDecoder::new().decode(&path).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain text").unwrap();

        let err = SymphoniaDecoder::new().decode(&path).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)), "got {:?}", err);
    }

    #[test]
    fn test_supported_extension_is_case_insensitive() {
        assert!(is_supported_extension(Path::new("a/b/Track.FLAC")));
        assert!(!is_supported_extension(Path::new("a/b/track")));
    }
}
