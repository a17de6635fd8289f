//! # Playback Module
//!
//! Drives the syllable highlight through a hymn in time with its note codes.
//!
//! ## Purpose
//! The controller walks the tokens of the current stanza, holding each one for
//! its note duration, then asks the structure resolver which stanza comes next
//! (a chorus is sung after every verse). Pauses, tempo changes and manual
//! navigation can arrive at any point.
//!
//! ## Sub-modules
//! - `types` - PlaybackState, PlaybackEvent, CountdownKind
//! - `scheduler` - the Scheduler trait and its manual/realtime clocks
//! - `controller` - the state machine itself
//!
//! ## Key Types
//! - [`PlaybackController`] - entry points (`load`, `start`, `pause`, `resume`, `stop`,
//!   `jump_to_stanza`, `jump_to_chorus`, `set_tempo`) and the event queue
//! - [`PlaybackEvent`] - what a display layer reacts to
//! - [`Scheduler`] - injected timer; the controller never sleeps
//!
//! ## Driving the Controller
//! The host forwards due wakeups to [`PlaybackController::fire`]. With a
//! [`ManualScheduler`] that is what `advance_clock` does:
//!
//! ```rust
//! use hymnal::playback::{PlaybackController, PlaybackEvent};
//! use hymnal::{Config, Hymn};
//!
//! let json = r#"{
//!   "titulo": "Santo",
//!   "BPM": 120,
//!   "estrofes": [
//!     { "numero": 1, "tipo": "Estrofe",
//!       "linhas": [ { "texto_silabado": "San - to", "notas_codes": ["sm", "sm"] } ] }
//!   ]
//! }"#;
//!
//! let mut player = PlaybackController::manual(Config::default());
//! player.load_json(json).unwrap();
//! player.start().unwrap();
//! player.advance_clock(2000); // start countdown
//! player.advance_clock(250);
//!
//! let highlighted: Vec<String> = player
//!     .drain_events()
//!     .into_iter()
//!     .filter_map(|event| match event {
//!         PlaybackEvent::TokenHighlighted { text, .. } => Some(text),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(highlighted, vec!["San-"]);
//! ```

mod controller;
mod scheduler;
mod types;


pub use controller::PlaybackController;
pub use scheduler::{ManualScheduler, RealtimeScheduler, Scheduler, TimerHandle, Wakeup};
pub use types::{CountdownKind, PlaybackEvent, PlaybackState};
