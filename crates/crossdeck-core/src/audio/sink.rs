//! Output sink capability
//!
//! A sink owns the [`Mixer`] once started and pulls it once per hardware
//! period. Which sink (and which driver) is used is decided by the bootstrap
//! layer; the engine only sees this trait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};

use super::config::OutputDriver;
use super::error::{AudioError, AudioResult};
use crate::engine::Mixer;
use crate::types::{CHANNELS, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE, SAMPLE_RATE};

/// What a started sink negotiated
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Driver that opened the stream (None for device-less sinks)
    pub driver: Option<OutputDriver>,
    /// Human-readable device label
    pub device: String,
    pub sample_rate: u32,
    /// Frames per period
    pub buffer_size: u32,
    /// Device channel count
    pub channels: u16,
}

impl StreamInfo {
    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer_size as f32 / self.sample_rate as f32 * 1000.0
    }
}

/// Host audio-driver abstraction that periodically calls `Mixer::read`
pub trait OutputSink {
    /// Move the mixer to the audio context and start pulling
    fn start(&mut self, mixer: Mixer) -> AudioResult<StreamInfo>;

    /// Stop pulling and release the stream
    fn stop(&mut self) -> AudioResult<()>;

    fn is_running(&self) -> bool;
}

/// Device-less sink: pulls the mixer on its own thread at the period cadence
/// and discards the audio. Used when no output device can be opened, and for
/// exercising the engine headless.
pub struct ClockedSink {
    buffer_size: u32,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    frames_rendered: Arc<AtomicU64>,
}

impl ClockedSink {
    pub fn new(buffer_size: u32) -> Self {
        let buffer_size = if buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            buffer_size.min(MAX_BUFFER_SIZE as u32)
        };
        Self {
            buffer_size,
            stop_tx: None,
            thread: None,
            frames_rendered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total frames pulled from the mixer so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }
}

impl OutputSink for ClockedSink {
    fn start(&mut self, mut mixer: Mixer) -> AudioResult<StreamInfo> {
        if self.thread.is_some() {
            return Err(AudioError::InvalidState("already running"));
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let frames_rendered = Arc::clone(&self.frames_rendered);
        let frames = self.buffer_size as usize;
        let period = Duration::from_secs_f64(frames as f64 / SAMPLE_RATE as f64);

        let thread = thread::Builder::new()
            .name("crossdeck-clock".to_string())
            .spawn(move || {
                let mut out = vec![0.0f32; frames * CHANNELS];
                let mut next = Instant::now();
                loop {
                    mixer.read_into(&mut out);
                    frames_rendered.fetch_add(frames as u64, Ordering::Relaxed);

                    next += period;
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // Stop requested or sink dropped
                        _ => break,
                    }
                }
            })
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);

        log::info!(
            "Clocked sink started: {} frames per period ({:.1}ms)",
            frames,
            period.as_secs_f32() * 1000.0
        );

        Ok(StreamInfo {
            driver: None,
            device: "clocked (no device)".to_string(),
            sample_rate: SAMPLE_RATE,
            buffer_size: self.buffer_size,
            channels: CHANNELS as u16,
        })
    }

    fn stop(&mut self) -> AudioResult<()> {
        let (Some(stop_tx), Some(thread)) = (self.stop_tx.take(), self.thread.take()) else {
            return Err(AudioError::InvalidState("not running"));
        };
        let _ = stop_tx.send(());
        thread
            .join()
            .map_err(|_| AudioError::StreamPlayError("clock thread panicked".to_string()))?;
        log::info!("Clocked sink stopped after {} frames", self.frames_rendered());
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for ClockedSink {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}
