//! Crossdeck Player - headless two-deck mixing
//!
//! Starts the engine, opens an output stream, and reads control commands
//! from stdin (one per line, `help` lists them).
//!
//! Output selection: the configured driver, then its fallback, then a
//! device-less clocked sink so the control surface keeps working without
//! audio hardware.

mod commands;
mod output;

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam::channel::{self, RecvTimeoutError};

use crossdeck_core::audio::{ClockedSink, OutputDriver, OutputSink, StreamInfo};
use crossdeck_core::config::{default_config_path, load_config, EngineConfig};
use crossdeck_core::diagnostics::{Diagnostics, MixEventReceiver};
use crossdeck_core::engine::{build_engine, EngineParts, TransportController};
use crossdeck_core::DeckId;

use commands::{execute, parse, Outcome};
use output::CpalSink;

/// How often queued mix events are reported while idle
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DriverArg {
    LowLatency,
    Generic,
}

impl From<DriverArg> for OutputDriver {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::LowLatency => OutputDriver::LowLatency,
            DriverArg::Generic => OutputDriver::Generic,
        }
    }
}

/// Command-line arguments for crossdeck-player
#[derive(Parser, Debug)]
#[command(name = "crossdeck-player")]
#[command(about = "Two-deck mixing engine with a line-based control surface")]
#[command(version)]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, env = "CROSSDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured output driver
    #[arg(short, long, value_enum)]
    driver: Option<DriverArg>,

    /// Skip audio devices and run on the clocked sink
    #[arg(long)]
    headless: bool,

    /// Track to load on deck 1
    #[arg(long)]
    deck1: Option<PathBuf>,

    /// Track to load on deck 2
    #[arg(long)]
    deck2: Option<PathBuf>,
}

/// A started engine: the control half plus the sink that owns the mixer
struct Running {
    transport: TransportController,
    events: MixEventReceiver,
    diagnostics: Diagnostics,
    sink: Box<dyn OutputSink>,
    info: StreamInfo,
}

/// Build an engine and hand its mixer to `sink`
fn start_on(config: &EngineConfig, mut sink: Box<dyn OutputSink>) -> Result<Running> {
    let EngineParts {
        transport,
        mixer,
        events,
        diagnostics,
    } = build_engine(config);
    let info = sink.start(mixer)?;
    Ok(Running {
        transport,
        events,
        diagnostics,
        sink,
        info,
    })
}

/// Try the configured driver, its fallback, then the clocked sink.
///
/// A failed start consumes the mixer, so every attempt gets a fresh engine.
/// Nothing is loaded yet at this point.
fn start_output(config: &EngineConfig, headless: bool) -> Result<Running> {
    if !headless {
        let preferred = config.audio.driver;
        for driver in [preferred, preferred.fallback()] {
            let sink = Box::new(CpalSink::new(driver, config.audio.clone()));
            match start_on(config, sink) {
                Ok(running) => return Ok(running),
                Err(e) => log::warn!("{:?} output driver failed: {:#}", driver, e),
            }
        }
        log::warn!("No audio output available, continuing without sound");
    }

    let period = config.audio.buffer_size.frames_or_default(OutputDriver::Generic);
    start_on(config, Box::new(ClockedSink::new(period))).context("Failed to start clocked sink")
}

/// Read stdin on its own thread so the main loop can keep draining events
fn spawn_stdin_reader() -> Result<channel::Receiver<String>> {
    let (tx, rx) = channel::unbounded();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

fn run(mut running: Running, lines: channel::Receiver<String>) {
    loop {
        match lines.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                match execute(&mut running.transport, command) {
                    Ok(Outcome::Reply(Some(reply))) => println!("{}", reply),
                    Ok(Outcome::Reply(None)) => {}
                    Ok(Outcome::Quit) => break,
                    Err(e) => println!("error: {}", e),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            // stdin closed
            Err(RecvTimeoutError::Disconnected) => break,
        }
        running.events.drain_into(&running.diagnostics);
    }

    running.events.drain_into(&running.diagnostics);
    if let Err(e) = running.sink.stop() {
        log::warn!("Stopping output failed: {}", e);
    }
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    log::info!("crossdeck-player starting up");

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config: EngineConfig = load_config(&config_path);
    if let Some(driver) = args.driver {
        config.audio.driver = driver.into();
    }

    let mut running = start_output(&config, args.headless)?;
    println!(
        "Output: {} ({} Hz, {} frames, ~{:.1}ms)",
        running.info.device,
        running.info.sample_rate,
        running.info.buffer_size,
        running.info.latency_ms()
    );

    for (deck, path) in [(DeckId::ONE, &args.deck1), (DeckId::TWO, &args.deck2)] {
        if let Some(path) = path {
            match running.transport.load_file(deck, path) {
                Ok(info) => println!("{}: loaded {} ({:.2}s)", deck, info.label, info.duration_seconds()),
                Err(e) => println!("{}: {}", deck, e),
            }
        }
    }

    println!("Type 'help' for commands");
    let lines = spawn_stdin_reader()?;
    run(running, lines);

    log::info!("crossdeck-player shut down");
    Ok(())
}
