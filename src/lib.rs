pub mod config;
pub mod duration;
pub mod error;
pub mod layout;
pub mod model;
pub mod playback;
pub mod reconcile;
pub mod structure;
pub mod tokenizer;

pub use config::Config;
pub use duration::{duration_ms, NoteBase, NoteCode, MIN_BPM};
pub use error::*;
pub use layout::{HighlightSpan, StanzaLayout, Step};
pub use model::{Hymn, Line, Stanza, StanzaType};
pub use playback::{PlaybackController, PlaybackEvent, PlaybackState};
pub use reconcile::LoadWarning;
pub use tokenizer::{tokenize, PauseMark, Token};

/// Parse a hymn document and repair its lines.
/// This is the main entry point for tools that only read hymns.
pub fn load_hymn(json: &str) -> Result<(Hymn, Vec<LoadWarning>), HymnError> {
    let mut hymn = Hymn::from_json_str(json)?;
    if hymn.stanzas.is_empty() {
        return Err(HymnError::EmptyHymn);
    }
    let warnings = hymn.reconcile();
    Ok((hymn, warnings))
}

/// Lay out every stanza at `bpm` (or the hymn's own tempo).
pub fn stanza_layouts(hymn: &Hymn, bpm: Option<u32>, config: &Config) -> Vec<StanzaLayout> {
    let bpm = bpm.unwrap_or_else(|| hymn.effective_bpm(config)).max(MIN_BPM);
    hymn.stanzas
        .iter()
        .map(|stanza| StanzaLayout::build(stanza, bpm, &hymn.unit_note_value, config))
        .collect()
}
