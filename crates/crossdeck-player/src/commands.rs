//! Line-oriented control surface
//!
//! One command per line, whitespace separated. Decks are `1` or `2`; cue
//! indices start at 0.
//!
//! ```text
//! load 1 ~/music/track.flac     tone 2 440 30
//! play 1   pause 1   stop 1     seek 1 42.5   ff 1 8   rw 1 8
//! vol 1 0.8   xf -0.3   master 0.9
//! cue 1   jump 1 0   uncue 1 0   clearcues 1   cues 1
//! eject 2   status   clip   help   quit
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crossdeck_core::engine::TransportController;
use crossdeck_core::{DeckId, DeckState, EngineResult};

/// A parsed control command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load { deck: DeckId, path: PathBuf },
    Tone { deck: DeckId, frequency: f64, seconds: f64 },
    Eject(DeckId),
    Play(DeckId),
    Pause(DeckId),
    Stop(DeckId),
    Seek { deck: DeckId, seconds: f64 },
    FastForward { deck: DeckId, seconds: f64 },
    Rewind { deck: DeckId, seconds: f64 },
    Volume { deck: DeckId, volume: f32 },
    Crossfader(f32),
    Master(f32),
    AddCue(DeckId),
    JumpCue { deck: DeckId, index: usize },
    RemoveCue { deck: DeckId, index: usize },
    ClearCues(DeckId),
    ListCues(DeckId),
    Status,
    ResetClip,
    Help,
    Quit,
}

/// Why a line could not be parsed
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' expects: {usage}")]
    Usage {
        command: &'static str,
        usage: &'static str,
    },

    #[error("invalid deck '{0}' (expected 1 or 2)")]
    InvalidDeck(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

pub const HELP: &str = "\
load <deck> <path>        load an audio file
tone <deck> <hz> <secs>   load a test tone
eject <deck>              unload the deck
play|pause|stop <deck>    transport
seek <deck> <secs>        absolute seek
ff|rw <deck> <secs>       relative seek
vol <deck> <0..2>         deck volume
xf <-1..1>                crossfader
master <0..1>             master volume
cue <deck>                store a cue at the current position
jump <deck> <index>       jump to a stored cue
uncue <deck> <index>      remove a stored cue
clearcues <deck>          remove all cues
cues <deck>               list cues
status                    show both decks
clip                      reset the clip indicator
quit                      exit";

struct Tokens<'a> {
    command: &'static str,
    usage: &'static str,
    rest: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn usage(&self) -> CommandError {
        CommandError::Usage {
            command: self.command,
            usage: self.usage,
        }
    }

    fn next(&mut self) -> Result<&'a str, CommandError> {
        self.rest.next().ok_or_else(|| self.usage())
    }

    fn deck(&mut self) -> Result<DeckId, CommandError> {
        let token = self.next()?;
        token
            .parse::<usize>()
            .ok()
            .and_then(DeckId::from_number)
            .ok_or_else(|| CommandError::InvalidDeck(token.to_string()))
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T, CommandError> {
        let token = self.next()?;
        token
            .parse()
            .map_err(|_| CommandError::InvalidNumber(token.to_string()))
    }

    fn done(mut self) -> Result<(), CommandError> {
        match self.rest.next() {
            Some(_) => Err(self.usage()),
            None => Ok(()),
        }
    }
}

/// Parse one input line
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (name, tail) = match line.split_once(char::is_whitespace) {
        Some((name, tail)) => (name, tail.trim()),
        None => (line, ""),
    };
    if name.is_empty() {
        return Err(CommandError::Empty);
    }

    let args = move |command: &'static str, usage: &'static str| Tokens {
        command,
        usage,
        rest: tail.split_whitespace(),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "load" => {
            let mut a = args("load", "load <deck> <path>");
            let deck = a.deck()?;
            // Paths may contain spaces: everything after the deck number
            let path = tail
                .split_once(char::is_whitespace)
                .map(|(_, path)| path.trim())
                .filter(|path| !path.is_empty())
                .ok_or_else(|| a.usage())?;
            return Ok(Command::Load {
                deck,
                path: PathBuf::from(path),
            });
        }
        "tone" => {
            let mut a = args("tone", "tone <deck> <hz> <secs>");
            let cmd = Command::Tone {
                deck: a.deck()?,
                frequency: a.number()?,
                seconds: a.number()?,
            };
            a.done()?;
            cmd
        }
        "eject" => deck_only(args("eject", "eject <deck>"), Command::Eject)?,
        "play" => deck_only(args("play", "play <deck>"), Command::Play)?,
        "pause" => deck_only(args("pause", "pause <deck>"), Command::Pause)?,
        "stop" => deck_only(args("stop", "stop <deck>"), Command::Stop)?,
        "cue" => deck_only(args("cue", "cue <deck>"), Command::AddCue)?,
        "clearcues" => deck_only(args("clearcues", "clearcues <deck>"), Command::ClearCues)?,
        "cues" => deck_only(args("cues", "cues <deck>"), Command::ListCues)?,
        "seek" => {
            let mut a = args("seek", "seek <deck> <secs>");
            let cmd = Command::Seek {
                deck: a.deck()?,
                seconds: a.number()?,
            };
            a.done()?;
            cmd
        }
        "ff" => {
            let mut a = args("ff", "ff <deck> <secs>");
            let cmd = Command::FastForward {
                deck: a.deck()?,
                seconds: a.number()?,
            };
            a.done()?;
            cmd
        }
        "rw" => {
            let mut a = args("rw", "rw <deck> <secs>");
            let cmd = Command::Rewind {
                deck: a.deck()?,
                seconds: a.number()?,
            };
            a.done()?;
            cmd
        }
        "vol" => {
            let mut a = args("vol", "vol <deck> <0..2>");
            let cmd = Command::Volume {
                deck: a.deck()?,
                volume: a.number()?,
            };
            a.done()?;
            cmd
        }
        "jump" => {
            let mut a = args("jump", "jump <deck> <index>");
            let cmd = Command::JumpCue {
                deck: a.deck()?,
                index: a.number()?,
            };
            a.done()?;
            cmd
        }
        "uncue" => {
            let mut a = args("uncue", "uncue <deck> <index>");
            let cmd = Command::RemoveCue {
                deck: a.deck()?,
                index: a.number()?,
            };
            a.done()?;
            cmd
        }
        "xf" => {
            let mut a = args("xf", "xf <-1..1>");
            let cmd = Command::Crossfader(a.number()?);
            a.done()?;
            cmd
        }
        "master" => {
            let mut a = args("master", "master <0..1>");
            let cmd = Command::Master(a.number()?);
            a.done()?;
            cmd
        }
        "status" => Command::Status,
        "clip" => Command::ResetClip,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn deck_only(mut args: Tokens<'_>, make: fn(DeckId) -> Command) -> Result<Command, CommandError> {
    let deck = args.deck()?;
    args.done()?;
    Ok(make(deck))
}

/// What the loop should do after a command
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Keep going, optionally printing a reply
    Reply(Option<String>),
    Quit,
}

/// Apply a command to the transport
pub fn execute(transport: &mut TransportController, command: Command) -> EngineResult<Outcome> {
    let reply = match command {
        Command::Load { deck, path } => {
            let info = transport.load_file(deck, &path)?;
            Some(format!(
                "{}: loaded {} ({:.2}s)",
                deck,
                info.label,
                info.duration_seconds()
            ))
        }
        Command::Tone {
            deck,
            frequency,
            seconds,
        } => {
            let info = transport.load_test_tone(deck, frequency, seconds)?;
            Some(format!("{}: loaded {}", deck, info.label))
        }
        Command::Eject(deck) => {
            transport.eject(deck);
            None
        }
        Command::Play(deck) => {
            transport.play(deck);
            None
        }
        Command::Pause(deck) => {
            transport.pause(deck);
            None
        }
        Command::Stop(deck) => {
            transport.stop(deck);
            None
        }
        Command::Seek { deck, seconds } => {
            transport.seek(deck, seconds);
            None
        }
        Command::FastForward { deck, seconds } => {
            transport.fast_forward(deck, seconds);
            None
        }
        Command::Rewind { deck, seconds } => {
            transport.rewind(deck, seconds);
            None
        }
        Command::Volume { deck, volume } => {
            let applied = transport.set_volume(deck, volume);
            (applied != volume).then(|| format!("{}: volume clamped to {:.2}", deck, applied))
        }
        Command::Crossfader(position) => {
            let applied = transport.set_crossfader(position);
            (applied != position).then(|| format!("crossfader clamped to {:.2}", applied))
        }
        Command::Master(volume) => {
            let applied = transport.set_master_volume(volume);
            (applied != volume).then(|| format!("master clamped to {:.2}", applied))
        }
        Command::AddCue(deck) => match transport.add_cue_point(deck) {
            Some(index) => Some(format!(
                "{}: cue {} at {:.3}s",
                deck,
                index,
                transport.position(deck)
            )),
            None => Some(format!("{}: nothing loaded", deck)),
        },
        Command::JumpCue { deck, index } => {
            transport.jump_to_cue_point(deck, index)?;
            None
        }
        Command::RemoveCue { deck, index } => {
            let seconds = transport.remove_cue_point(deck, index)?;
            Some(format!("{}: removed cue {} ({:.3}s)", deck, index, seconds))
        }
        Command::ClearCues(deck) => {
            transport.clear_cue_points(deck);
            None
        }
        Command::ListCues(deck) => Some(format_cues(deck, &transport.cue_points(deck))),
        Command::Status => Some(status(transport)),
        Command::ResetClip => {
            let was = transport.mixer_atomics().take_clip();
            Some(if was { "clip indicator reset" } else { "no clipping" }.to_string())
        }
        Command::Help => Some(HELP.to_string()),
        Command::Quit => return Ok(Outcome::Quit),
    };
    Ok(Outcome::Reply(reply))
}

fn format_cues(deck: DeckId, cues: &[f64]) -> String {
    if cues.is_empty() {
        return format!("{}: no cue points", deck);
    }
    let list: Vec<String> = cues
        .iter()
        .enumerate()
        .map(|(i, seconds)| format!("{}={:.3}s", i, seconds))
        .collect();
    format!("{}: {}", deck, list.join(" "))
}

/// Multi-line summary of both decks and the mixer. Leaves the clip
/// indicator set; `clip` resets it.
pub fn status(transport: &TransportController) -> String {
    let mut lines = Vec::with_capacity(DeckId::ALL.len() + 1);
    for deck in DeckId::ALL {
        let state = match transport.state(deck) {
            DeckState::Empty => "empty",
            DeckState::Stopped => "stopped",
            DeckState::Playing => "playing",
        };
        let label = transport
            .deck(deck)
            .track()
            .map(|t| t.label.as_str())
            .unwrap_or("-");
        lines.push(format!(
            "{}: {:<7} {:>8.2}/{:<8.2}s vol {:.2} (eff {:.2}) cues {}  {}",
            deck,
            state,
            transport.position(deck),
            transport.length(deck),
            transport.volume(deck),
            transport.effective_volume(deck),
            transport.cue_points(deck).len(),
            label
        ));
    }

    let meters = transport.mixer_atomics();
    lines.push(format!(
        "crossfader {:+.2}  master {:.2}  peak {:.2}{}",
        transport.crossfader(),
        transport.master_volume(),
        meters.peak(),
        if meters.clip() { "  CLIP" } else { "" }
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossdeck_core::config::EngineConfig;
    use crossdeck_core::engine::{build_engine, EngineParts};
    use crossdeck_core::source::DecodedAudio;
    use crossdeck_core::{EngineError, SAMPLE_RATE};

    #[test]
    fn test_parse_transport_commands() {
        assert_eq!(parse("play 1"), Ok(Command::Play(DeckId::ONE)));
        assert_eq!(parse("  PAUSE   2 "), Ok(Command::Pause(DeckId::TWO)));
        assert_eq!(
            parse("seek 2 12.5"),
            Ok(Command::Seek {
                deck: DeckId::TWO,
                seconds: 12.5
            })
        );
        assert_eq!(parse("xf -0.25"), Ok(Command::Crossfader(-0.25)));
        assert_eq!(
            parse("jump 1 3"),
            Ok(Command::JumpCue {
                deck: DeckId::ONE,
                index: 3
            })
        );
        assert_eq!(parse("q"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_load_keeps_spaces_in_path() {
        assert_eq!(
            parse("load 2 /music/My Track (edit).flac"),
            Ok(Command::Load {
                deck: DeckId::TWO,
                path: PathBuf::from("/music/My Track (edit).flac"),
            })
        );
        assert!(matches!(parse("load 1"), Err(CommandError::Usage { .. })));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   "), Err(CommandError::Empty));
        assert_eq!(parse("scratch 1"), Err(CommandError::Unknown("scratch".into())));
        assert_eq!(parse("play 3"), Err(CommandError::InvalidDeck("3".into())));
        assert_eq!(parse("vol 1 loud"), Err(CommandError::InvalidNumber("loud".into())));
        assert!(matches!(parse("play"), Err(CommandError::Usage { command: "play", .. })));
        assert!(matches!(parse("play 1 2"), Err(CommandError::Usage { .. })));
    }

    #[test]
    fn test_execute_against_engine() {
        let EngineParts { mut transport, .. } = build_engine(&EngineConfig::default());

        let outcome = execute(&mut transport, parse("tone 1 440 2").unwrap()).unwrap();
        assert!(matches!(outcome, Outcome::Reply(Some(_))));

        execute(&mut transport, parse("play 1").unwrap()).unwrap();
        assert!(transport.is_playing(DeckId::ONE));

        execute(&mut transport, parse("seek 1 1").unwrap()).unwrap();
        execute(&mut transport, parse("cue 1").unwrap()).unwrap();
        assert_eq!(transport.cue_points(DeckId::ONE), vec![1.0]);

        let err = execute(&mut transport, parse("jump 1 4").unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange { index: 4, count: 1 }));

        let reply = execute(&mut transport, parse("vol 1 5").unwrap()).unwrap();
        assert_eq!(reply, Outcome::Reply(Some("deck 1: volume clamped to 2.00".into())));

        let status = status(&transport);
        assert!(status.contains("deck 1: playing"));
        assert!(status.contains("deck 2: empty"));

        assert_eq!(execute(&mut transport, Command::Quit).unwrap(), Outcome::Quit);
    }

    #[test]
    fn test_status_leaves_clip_latched() {
        let EngineParts {
            mut transport,
            mut mixer,
            ..
        } = build_engine(&EngineConfig::default());
        let hot = DecodedAudio::new(vec![1.6; 2 * 1024], 2, SAMPLE_RATE);
        transport.load_decoded(DeckId::ONE, "hot", &hot).unwrap();
        transport.set_crossfader(-1.0);
        transport.play(DeckId::ONE);
        mixer.read(256);

        assert!(status(&transport).contains("CLIP"));
        assert!(status(&transport).contains("CLIP"));
        let reply = execute(&mut transport, parse("clip").unwrap()).unwrap();
        assert_eq!(reply, Outcome::Reply(Some("clip indicator reset".into())));
        assert!(!status(&transport).contains("CLIP"));
    }
}
