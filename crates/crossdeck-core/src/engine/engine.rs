//! Engine assembly - wires decks, crossfader and mixer together
//!
//! [`build_engine`] returns the two halves of a running engine: the
//! [`TransportController`] stays on the control side, the [`Mixer`] is handed
//! to an output sink. They share nothing but atomics and swap slots.

use std::sync::Arc;

use super::crossfader::{CrossfaderController, CrossfaderState};
use super::deck::Deck;
use super::mixer::{FrameProvider, Mixer};
use super::transport::TransportController;
use crate::config::EngineConfig;
use crate::diagnostics::{mix_event_channel, Diagnostics, MixEventReceiver, MIX_EVENT_QUEUE_SIZE};
use crate::source::{AudioDecoder, SymphoniaDecoder};
use crate::types::DeckId;

/// Everything a host needs to run the engine
pub struct EngineParts {
    /// Control surface (control thread)
    pub transport: TransportController,
    /// Pull side (move into an `OutputSink`)
    pub mixer: Mixer,
    /// Mix events reported by the audio thread, drain on the control side
    pub events: MixEventReceiver,
    /// Root diagnostics handle
    pub diagnostics: Diagnostics,
}

/// Build an engine that decodes with Symphonia and reports via `log`
pub fn build_engine(config: &EngineConfig) -> EngineParts {
    build_engine_with(
        config,
        Arc::new(SymphoniaDecoder::new()),
        Diagnostics::to_log("engine"),
    )
}

/// Build an engine with an explicit decoder and diagnostics sink
pub fn build_engine_with(
    config: &EngineConfig,
    decoder: Arc<dyn AudioDecoder>,
    diagnostics: Diagnostics,
) -> EngineParts {
    let crossfader_state = Arc::new(CrossfaderState::new(config.decks.crossfader));

    let decks = DeckId::ALL.map(|id| {
        Deck::new(
            id,
            Arc::clone(&crossfader_state),
            config.decks.volume,
            diagnostics.scoped(&id.to_string()),
        )
    });

    let (event_tx, events) = mix_event_channel(MIX_EVENT_QUEUE_SIZE);
    let mut mixer = Mixer::new(Arc::clone(&crossfader_state), &config.mixer, event_tx);
    for deck in &decks {
        let provider: Arc<dyn FrameProvider> = deck.output();
        if let Err(e) = mixer.attach_source(deck.id().index(), provider) {
            diagnostics.error(format_args!("wiring {} failed: {}", deck.id(), e));
        }
    }

    let crossfader = CrossfaderController::new(crossfader_state, diagnostics.scoped("crossfader"));
    let transport = TransportController::new(
        decks,
        crossfader,
        mixer.atomics(),
        decoder,
        diagnostics.scoped("transport"),
    );

    diagnostics.info(format_args!(
        "engine ready: crossfader {:.2}, deck volume {:.2}, master {:.2}",
        transport.crossfader(),
        config.decks.volume,
        transport.master_volume()
    ));

    EngineParts {
        transport,
        mixer,
        events,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::types::DeckState;

    #[test]
    fn test_both_slots_wired() {
        let EngineParts { mixer, transport, .. } = build_engine(&EngineConfig::default());
        assert!(mixer.is_attached(0));
        assert!(mixer.is_attached(1));
        for id in DeckId::ALL {
            assert_eq!(transport.state(id), DeckState::Empty);
        }
    }

    #[test]
    fn test_config_defaults_applied() {
        let mut config = EngineConfig::default();
        config.decks.crossfader = -1.0;
        config.decks.volume = 0.5;
        config.mixer.master_volume = 0.8;

        let sink = Arc::new(MemorySink::new());
        let parts = build_engine_with(
            &config,
            Arc::new(SymphoniaDecoder::new()),
            Diagnostics::new("engine", sink.clone()),
        );
        assert_eq!(parts.transport.crossfader(), -1.0);
        assert_eq!(parts.transport.volume(DeckId::TWO), 0.5);
        assert_eq!(parts.transport.master_volume(), 0.8);
        assert!(sink.entries().iter().any(|e| e.message.contains("engine ready")));
    }

    #[test]
    fn test_empty_engine_reads_silence() {
        let EngineParts { mut mixer, .. } = build_engine(&EngineConfig::default());
        let out = mixer.read(512);
        assert_eq!(out.len(), 1024);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_transport_drives_mixer() {
        let EngineParts {
            mut transport,
            mut mixer,
            ..
        } = build_engine(&EngineConfig::default());
        transport.load_test_tone(DeckId::ONE, 441.0, 1.0).unwrap();
        transport.set_crossfader(-1.0);

        // Loaded but stopped
        assert!(mixer.read(256).iter().all(|&s| s == 0.0));

        transport.play(DeckId::ONE);
        let out = mixer.read(256);
        assert!(out.iter().any(|&s| s != 0.0));
        assert_eq!(transport.position(DeckId::ONE), 256.0 / 44100.0);
    }
}
