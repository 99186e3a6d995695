//! CPAL output sink
//!
//! Opens an f32 output stream at the engine rate and pulls the mixer from the
//! device callback. The mixer is moved into the callback and owned by the
//! audio thread from then on.
//!
//! Driver mapping:
//! - `LowLatency`: the JACK host when it is compiled in and running, else the
//!   platform default host, with a fixed small period
//! - `Generic`: the platform default host and its default period

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, Device, Host, HostId, SampleFormat, SampleRate, Stream,
    StreamConfig, SupportedBufferSize,
};

use crossdeck_core::audio::{AudioConfig, AudioError, AudioResult, OutputDriver, OutputSink, StreamInfo};
use crossdeck_core::engine::Mixer;
use crossdeck_core::{CHANNELS, MAX_BUFFER_SIZE, SAMPLE_RATE};

/// Human-readable host name ("JACK", "ALSA", "CoreAudio", ...)
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        "Asio" => "ASIO".to_string(),
        _ => name,
    }
}

fn host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|id| host_name(*id) == name)
        .and_then(|id| cpal::host_from_id(id).ok())
}

/// Host for a driver
fn host_for(driver: OutputDriver) -> Host {
    match driver {
        OutputDriver::LowLatency => host_by_name("JACK").unwrap_or_else(|| {
            log::info!("JACK host not available, low-latency driver using the default host");
            cpal::default_host()
        }),
        OutputDriver::Generic => cpal::default_host(),
    }
}

/// Find the configured device on `host`, or its default output
fn select_device(host: &Host, config: &AudioConfig) -> AudioResult<Device> {
    let host_label = host_name(host.id());

    let Some(wanted) = &config.device else {
        return host.default_output_device().ok_or(AudioError::NoDevices);
    };

    if let Some(wanted_host) = &wanted.host {
        if *wanted_host != host_label {
            return Err(AudioError::DeviceNotFound(format!(
                "{} is on host {}, driver opened {}",
                wanted.name, wanted_host, host_label
            )));
        }
    }

    let mut devices = host
        .output_devices()
        .map_err(|e| AudioError::DriverUnavailable(e.to_string()))?;
    devices
        .find(|d| d.name().map(|n| n == wanted.name).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(wanted.display_label()))
}

/// Pick an f32 config with at least one channel that runs at the engine rate,
/// preferring stereo. Returns the stream config and the nominal period.
fn output_config(
    device: &Device,
    driver: OutputDriver,
    config: &AudioConfig,
) -> AudioResult<(StreamConfig, u32)> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32 && c.channels() > 0)
        .filter(|c| SAMPLE_RATE >= c.min_sample_rate().0 && SAMPLE_RATE <= c.max_sample_rate().0)
        .collect();

    let best = supported
        .iter()
        .find(|c| c.channels() as usize == CHANNELS)
        .or_else(|| supported.iter().find(|c| c.channels() as usize > CHANNELS))
        .or_else(|| supported.first())
        .ok_or_else(|| {
            AudioError::ConfigError(format!("no f32 output configuration at {}Hz", SAMPLE_RATE))
        })?;

    let (buffer_size, frames) = match config.buffer_size.frames_for(driver) {
        Some(frames) => {
            let frames = match best.buffer_size() {
                SupportedBufferSize::Range { min, max } => frames.max(*min).min(*max),
                SupportedBufferSize::Unknown => frames,
            };
            (CpalBufferSize::Fixed(frames), frames)
        }
        None => (
            CpalBufferSize::Default,
            config.buffer_size.frames_or_default(driver),
        ),
    };

    let stream_config = StreamConfig {
        channels: best.channels(),
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size,
    };
    Ok((stream_config, frames))
}

/// Build the device callback. Stereo devices are filled directly; other
/// channel counts go through a pre-allocated stereo scratch buffer.
fn build_stream(device: &Device, config: &StreamConfig, mut mixer: Mixer) -> AudioResult<Stream> {
    let channels = config.channels as usize;
    let mut scratch = vec![0.0f32; MAX_BUFFER_SIZE * CHANNELS];

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                if channels == CHANNELS {
                    mixer.read_into(data);
                    return;
                }
                for block in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
                    let frames = block.len() / channels;
                    let stereo = &mut scratch[..frames * CHANNELS];
                    mixer.read_into(stereo);
                    for (out, frame) in block.chunks_mut(channels).zip(stereo.chunks_exact(CHANNELS)) {
                        if out.len() == 1 {
                            out[0] = 0.5 * (frame[0] + frame[1]);
                            continue;
                        }
                        out[0] = frame[0];
                        out[1] = frame[1];
                        out[2..].fill(0.0);
                    }
                }
            },
            move |err| {
                log::error!("Output stream error: {}", err);
            },
            None::<Duration>,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

/// Output sink on a CPAL host
pub struct CpalSink {
    driver: OutputDriver,
    config: AudioConfig,
    stream: Option<Stream>,
}

impl CpalSink {
    pub fn new(driver: OutputDriver, config: AudioConfig) -> Self {
        Self {
            driver,
            config,
            stream: None,
        }
    }
}

impl OutputSink for CpalSink {
    fn start(&mut self, mixer: Mixer) -> AudioResult<StreamInfo> {
        if self.stream.is_some() {
            return Err(AudioError::InvalidState("already running"));
        }

        let host = host_for(self.driver);
        let device = select_device(&host, &self.config)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let (stream_config, buffer_size) = output_config(&device, self.driver, &self.config)?;

        let stream = build_stream(&device, &stream_config, mixer)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        let info = StreamInfo {
            driver: Some(self.driver),
            device: format!("[{}] {}", host_name(host.id()), device_name),
            sample_rate: SAMPLE_RATE,
            buffer_size,
            channels: stream_config.channels,
        };
        log::info!(
            "Audio stream started on {}: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
            info.device,
            info.channels,
            info.sample_rate,
            info.buffer_size,
            info.latency_ms()
        );

        self.stream = Some(stream);
        Ok(info)
    }

    fn stop(&mut self) -> AudioResult<()> {
        let stream = self.stream.take().ok_or(AudioError::InvalidState("not running"))?;
        stream
            .pause()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
        log::info!("Audio stream stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}
