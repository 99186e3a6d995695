//! Diagnostics plumbing
//!
//! Control-side components are handed a [`Diagnostics`] at construction and
//! report through it; nothing in the engine reaches for global state. The
//! default sink forwards to the `log` facade, and [`MemorySink`] keeps entries
//! for inspection.
//!
//! The audio path cannot log (formatting allocates, loggers lock). The mixer
//! instead pushes small [`MixEvent`] values into a lock-free SPSC queue, and
//! the control side drains them through [`MixEventReceiver::drain_into`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::Level;

use crate::types::DeckId;

/// Capacity of the audio-to-control event queue
pub const MIX_EVENT_QUEUE_SIZE: usize = 256;

/// Destination for diagnostics records
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, level: Level, component: &str, message: fmt::Arguments<'_>);
}

/// Forwards every record to the `log` facade, using the component as target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, level: Level, component: &str, message: fmt::Arguments<'_>) {
        log::log!(target: "crossdeck", level, "[{}] {}", component, message);
    }
}

/// A captured diagnostics record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub level: Level,
    pub component: String,
    pub message: String,
}

/// Keeps records in memory (status panes, tests)
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<DiagnosticEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Entries at `level` or more severe
    pub fn at_least(&self, level: Level) -> Vec<DiagnosticEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level <= level)
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, level: Level, component: &str, message: fmt::Arguments<'_>) {
        let entry = DiagnosticEntry {
            level,
            component: component.to_string(),
            message: message.to_string(),
        };
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}

/// Component-scoped diagnostics handle
#[derive(Clone)]
pub struct Diagnostics {
    component: Arc<str>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub fn new(component: &str, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            component: Arc::from(component),
            sink,
        }
    }

    /// Diagnostics backed by the `log` facade
    pub fn to_log(component: &str) -> Self {
        Self::new(component, Arc::new(LogSink))
    }

    /// Same sink, different component label
    pub fn scoped(&self, component: &str) -> Self {
        Self {
            component: Arc::from(component),
            sink: Arc::clone(&self.sink),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn error(&self, message: fmt::Arguments<'_>) {
        self.sink.record(Level::Error, &self.component, message);
    }

    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.sink.record(Level::Warn, &self.component, message);
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.sink.record(Level::Info, &self.component, message);
    }

    pub fn debug(&self, message: fmt::Arguments<'_>) {
        self.sink.record(Level::Debug, &self.component, message);
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

/// Something the audio path noticed while mixing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixEvent {
    /// A slot peaked above the per-source threshold and was scaled down
    SourceLimited { deck: DeckId, peak: f32 },
    /// The bus went past the soft-clip knee
    BusClipped { peak: f32 },
    /// A slot produced non-finite samples and was replaced with silence
    SlotSilenced { deck: DeckId },
}

impl fmt::Display for MixEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixEvent::SourceLimited { deck, peak } => {
                write!(f, "{} limited (peak {:.3})", deck, peak)
            }
            MixEvent::BusClipped { peak } => write!(f, "bus soft clip engaged (peak {:.3})", peak),
            MixEvent::SlotSilenced { deck } => {
                write!(f, "{} produced invalid samples, slot silenced", deck)
            }
        }
    }
}

/// Audio-thread side of the event queue. Never blocks; drops when full.
pub struct MixEventSender {
    producer: rtrb::Producer<MixEvent>,
    dropped: Arc<AtomicU64>,
}

impl MixEventSender {
    #[inline]
    pub fn send(&mut self, event: MixEvent) {
        if self.producer.push(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Control side of the event queue
pub struct MixEventReceiver {
    consumer: rtrb::Consumer<MixEvent>,
    dropped: Arc<AtomicU64>,
    reported_dropped: u64,
}

impl MixEventReceiver {
    /// Pop everything queued so far
    pub fn drain(&mut self) -> Vec<MixEvent> {
        let mut events = Vec::with_capacity(self.consumer.slots());
        while let Ok(event) = self.consumer.pop() {
            events.push(event);
        }
        events
    }

    /// Total events lost to a full queue
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drain the queue and report each event. Returns how many were drained.
    pub fn drain_into(&mut self, diagnostics: &Diagnostics) -> usize {
        let events = self.drain();
        for event in &events {
            match event {
                MixEvent::SlotSilenced { .. } => diagnostics.warn(format_args!("{}", event)),
                _ => diagnostics.debug(format_args!("{}", event)),
            }
        }

        let dropped = self.dropped();
        if dropped > self.reported_dropped {
            diagnostics.warn(format_args!(
                "{} mix events dropped (queue full)",
                dropped - self.reported_dropped
            ));
            self.reported_dropped = dropped;
        }
        events.len()
    }
}

/// Create the audio-to-control event queue
pub fn mix_event_channel(capacity: usize) -> (MixEventSender, MixEventReceiver) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        MixEventSender {
            producer,
            dropped: Arc::clone(&dropped),
        },
        MixEventReceiver {
            consumer,
            dropped,
            reported_dropped: 0,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_scoped_records() {
        let sink = Arc::new(MemorySink::new());
        let diagnostics = Diagnostics::new("transport", sink.clone());
        let deck = diagnostics.scoped("deck 1");

        diagnostics.info(format_args!("ready"));
        deck.warn(format_args!("cue {} missing", 3));

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].component, "deck 1");
        assert_eq!(entries[1].message, "cue 3 missing");
        assert_eq!(sink.at_least(Level::Warn).len(), 1);
    }

    #[test]
    fn test_event_queue_counts_drops_when_full() {
        let (mut tx, mut rx) = mix_event_channel(2);
        for _ in 0..5 {
            tx.send(MixEvent::BusClipped { peak: 1.2 });
        }

        assert_eq!(rx.dropped(), 3);

        let sink = Arc::new(MemorySink::new());
        let diagnostics = Diagnostics::new("mixer", sink.clone());
        assert_eq!(rx.drain_into(&diagnostics), 2);

        let warnings = sink.at_least(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("3 mix events dropped"));

        // Already reported
        rx.drain_into(&diagnostics);
        assert_eq!(sink.at_least(Level::Warn).len(), 1);
    }
}
