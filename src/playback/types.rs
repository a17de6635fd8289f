//! Playback state and event type definitions
//!
//! These are the values the controller hands to a display layer.

use serde::Serialize;
use std::fmt;

use crate::layout::HighlightSpan;

/// Controller state
///
/// ```text
/// Idle ──start──► CountdownToStart ──► Playing ◄──resume── Paused
///                                      │  ▲   └──pause──►
///                  stanza done ────────┘  │
///                       ▼                 │
///             CountdownBetweenStanzas ────┘        (END) ──► Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlaybackState {
    Idle,
    CountdownToStart,
    Playing,
    Paused,
    CountdownBetweenStanzas,
    Finished,
}

impl PlaybackState {
    /// True while a wakeup is expected from the scheduler.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            PlaybackState::CountdownToStart
                | PlaybackState::Playing
                | PlaybackState::CountdownBetweenStanzas
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::CountdownToStart => "CountdownToStart",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::CountdownBetweenStanzas => "CountdownBetweenStanzas",
            PlaybackState::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// What a countdown is leading up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum CountdownKind {
    /// First stanza of the session
    Start,
    /// The stanza chosen by the structure resolver
    NextStanza { index: usize, chorus: bool },
}

/// Notification for the display layer
///
/// Drained with [`PlaybackController::drain_events`](super::PlaybackController::drain_events).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    /// A stanza was loaded; its layout is available from the controller
    StanzaChanged { index: usize, label: String },
    TokenHighlighted {
        stanza: usize,
        token: usize,
        text: String,
        span: HighlightSpan,
    },
    TokenCleared { stanza: usize, token: usize },
    #[serde(rename_all = "camelCase")]
    Countdown {
        kind: CountdownKind,
        remaining_secs: u32,
    },
    TempoChanged { bpm: u32 },
    Finished,
}

/// A running countdown inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Countdown {
    pub kind: CountdownKind,
    pub remaining_secs: u32,
    /// Stanza to load when the countdown ends
    pub target: Option<usize>,
}
