//! # Hymn Document Model
//!
//! Passive data structures for a hymn as stored in its JSON document.
//!
//! ## Type Hierarchy
//! ```text
//! Hymn
//!   ├── title, bpm, time_signature, unit_note_value
//!   └── Vec<Stanza>
//!         ├── number: Option<i64>
//!         ├── kind: StanzaType (Verse | Chorus)
//!         └── Vec<Line>
//!               ├── syllabic_text: String   ("Maî - tre , _ Sei - gneur")
//!               └── note_codes: Vec<NoteCode>
//! ```
//!
//! ## JSON Shape
//! Field names follow the documents produced by the digitization tools:
//! ```json
//! {
//!   "titulo": "Grande é o Senhor",
//!   "BPM": 72,
//!   "compasso": "4/4",
//!   "unidade_bpm": "sm",
//!   "estrofes": [
//!     { "numero": 1, "tipo": "Estrofe",
//!       "linhas": [ { "texto_silabado": "Gran - de é", "notas_codes": ["c", "c", "m"] } ] },
//!     { "numero": null, "tipo": "Coro", "linhas": [] }
//!   ]
//! }
//! ```
//!
//! Unknown note codes are kept as written, so reading a document and writing it
//! back reproduces the same data. The one exception is `tipo`: it is matched
//! case-insensitively on read (`"coro"`, `"CORO"` → Chorus, anything else →
//! Verse) and always written back as `"Coro"` or `"Estrofe"`.
//!
//! ## Related Modules
//! - `tokenizer` - splits `syllabic_text` into tokens
//! - `reconcile` - repairs lines whose token and note counts disagree
//! - `structure` - decides stanza order using `StanzaType`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::duration::{NoteCode, DEFAULT_NOTE_CODE};
use crate::error::HymnError;
use crate::reconcile::{reconcile, LoadWarning};
use crate::tokenizer::tokenize;

/// Whether a stanza is a numbered verse or the recurring refrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StanzaType {
    #[default]
    Verse,
    Chorus,
}

impl From<String> for StanzaType {
    fn from(tag: String) -> Self {
        if tag.trim().eq_ignore_ascii_case("coro") {
            StanzaType::Chorus
        } else {
            StanzaType::Verse
        }
    }
}

impl From<StanzaType> for String {
    fn from(kind: StanzaType) -> Self {
        match kind {
            StanzaType::Verse => "Estrofe".to_string(),
            StanzaType::Chorus => "Coro".to_string(),
        }
    }
}

/// One lyric line with its note codes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    #[serde(rename = "texto_silabado", default)]
    pub syllabic_text: String,
    #[serde(rename = "notas_codes", default)]
    pub note_codes: Vec<NoteCode>,
}

impl Line {
    pub fn new(syllabic_text: impl Into<String>, note_codes: Vec<NoteCode>) -> Self {
        Self {
            syllabic_text: syllabic_text.into(),
            note_codes,
        }
    }

    /// Build a line from code strings, e.g. `Line::with_codes("Gran - de", &["c", "m"])`.
    pub fn with_codes(syllabic_text: impl Into<String>, codes: &[&str]) -> Self {
        Self::new(syllabic_text, codes.iter().map(|c| NoteCode::new(*c)).collect())
    }

    pub fn token_count(&self) -> usize {
        tokenize(&self.syllabic_text).len()
    }

    pub fn is_consistent(&self) -> bool {
        self.token_count() == self.note_codes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stanza {
    /// Verse number; `null` or 0 conventionally marks the chorus
    #[serde(rename = "numero", default)]
    pub number: Option<i64>,
    #[serde(rename = "tipo", default)]
    pub kind: StanzaType,
    #[serde(rename = "linhas", default)]
    pub lines: Vec<Line>,
}

impl Stanza {
    pub fn verse(number: i64, lines: Vec<Line>) -> Self {
        Self {
            number: Some(number),
            kind: StanzaType::Verse,
            lines,
        }
    }

    pub fn chorus(lines: Vec<Line>) -> Self {
        Self {
            number: None,
            kind: StanzaType::Chorus,
            lines,
        }
    }

    pub fn is_chorus(&self) -> bool {
        matches!(self.kind, StanzaType::Chorus)
    }
}

fn default_time_signature() -> String {
    "4/4".to_string()
}

fn default_unit_note_value() -> NoteCode {
    NoteCode::new(DEFAULT_NOTE_CODE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hymn {
    #[serde(rename = "titulo", default)]
    pub title: String,
    /// Tempo in beats per minute; when absent, `Config::default_bpm` applies
    #[serde(rename = "BPM", default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    /// Informational only (e.g. "3/4")
    #[serde(rename = "compasso", default = "default_time_signature")]
    pub time_signature: String,
    /// Note value one beat represents (usually the quarter-equivalent `sm`)
    #[serde(rename = "unidade_bpm", default = "default_unit_note_value")]
    pub unit_note_value: NoteCode,
    #[serde(rename = "estrofes", default)]
    pub stanzas: Vec<Stanza>,
}

impl Default for Hymn {
    fn default() -> Self {
        Self {
            title: String::new(),
            bpm: None,
            time_signature: default_time_signature(),
            unit_note_value: default_unit_note_value(),
            stanzas: Vec::new(),
        }
    }
}

impl Hymn {
    pub fn from_json_str(json: &str) -> Result<Self, HymnError> {
        serde_json::from_str(json).map_err(|e| HymnError::InvalidDocument(e.to_string()))
    }

    /// Read a hymn document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HymnError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HymnError::NotFound(path.display().to_string()),
            _ => HymnError::Io(e),
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, HymnError> {
        serde_json::to_string_pretty(self).map_err(|e| HymnError::InvalidDocument(e.to_string()))
    }

    /// Tempo to play at: the document's BPM, or the configured default.
    pub fn effective_bpm(&self, config: &Config) -> u32 {
        self.bpm
            .filter(|bpm| *bpm > 0)
            .unwrap_or(config.default_bpm)
    }

    /// Beats per bar from the time signature, defaulting to 4.
    pub fn beats_per_bar(&self) -> u32 {
        self.time_signature
            .split('/')
            .next()
            .and_then(|beats| beats.trim().parse::<u32>().ok())
            .filter(|beats| *beats > 0)
            .unwrap_or(4)
    }

    /// Index of the refrain: the first Chorus-type stanza.
    pub fn chorus_index(&self) -> Option<usize> {
        self.stanzas.iter().position(Stanza::is_chorus)
    }

    /// Index of the first verse carrying `number`.
    pub fn verse_index(&self, number: i64) -> Option<usize> {
        self.stanzas.iter().position(|stanza| match stanza.kind {
            StanzaType::Verse => stanza.number == Some(number),
            StanzaType::Chorus => false,
        })
    }

    /// Human-readable stanza name: "Coro" for the chorus, "Estrofe N" for verses.
    pub fn stanza_label(&self, index: usize) -> String {
        match self.stanzas.get(index) {
            Some(stanza) => match stanza.kind {
                StanzaType::Chorus => "Coro".to_string(),
                StanzaType::Verse => {
                    let number = stanza
                        .number
                        .filter(|n| *n > 0)
                        .unwrap_or(index as i64 + 1);
                    format!("Estrofe {}", number)
                }
            },
            None => String::new(),
        }
    }

    /// Repair every line so its note count matches its token count.
    ///
    /// Returns the problems found; none of them are fatal.
    pub fn reconcile(&mut self) -> Vec<LoadWarning> {
        let mut warnings = Vec::new();
        for (stanza_index, stanza) in self.stanzas.iter_mut().enumerate() {
            for (line_index, line) in stanza.lines.iter_mut().enumerate() {
                let tokens = tokenize(&line.syllabic_text);
                let outcome = reconcile(&tokens, &line.note_codes);
                warnings.extend(outcome.warnings(stanza_index, line_index));
                line.note_codes = outcome.note_codes;
            }
        }
        warnings
    }

    /// Replace one line's text and codes. The codes are reconciled against the
    /// new text before they are stored.
    pub fn set_line(
        &mut self,
        stanza_index: usize,
        line_index: usize,
        syllabic_text: &str,
        note_codes: Vec<NoteCode>,
    ) -> Result<Vec<LoadWarning>, HymnError> {
        let len = self.stanzas.len();
        let stanza = self
            .stanzas
            .get_mut(stanza_index)
            .ok_or(HymnError::StanzaOutOfRange { index: stanza_index, len })?;

        let tokens = tokenize(syllabic_text);
        let outcome = reconcile(&tokens, &note_codes);
        let warnings = outcome.warnings(stanza_index, line_index);
        let line = Line::new(syllabic_text, outcome.note_codes);

        if line_index < stanza.lines.len() {
            stanza.lines[line_index] = line;
        } else {
            stanza.lines.push(line);
        }
        Ok(warnings)
    }

    /// Copy the note codes of one stanza onto every other stanza of the same
    /// type that has the same number of lines. Returns how many stanzas changed.
    pub fn replicate_rhythm(&mut self, source_index: usize) -> Result<usize, HymnError> {
        let len = self.stanzas.len();
        let source = self
            .stanzas
            .get(source_index)
            .ok_or(HymnError::StanzaOutOfRange { index: source_index, len })?;
        let kind = source.kind;
        let pattern: Vec<Vec<NoteCode>> = source
            .lines
            .iter()
            .map(|line| line.note_codes.clone())
            .collect();

        let mut changed = 0;
        for (index, stanza) in self.stanzas.iter_mut().enumerate() {
            if index == source_index || stanza.kind != kind || stanza.lines.len() != pattern.len() {
                continue;
            }
            for (line, codes) in stanza.lines.iter_mut().zip(&pattern) {
                let tokens = tokenize(&line.syllabic_text);
                line.note_codes = reconcile(&tokens, codes).note_codes;
            }
            changed += 1;
        }
        Ok(changed)
    }
}

impl fmt::Display for Hymn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} stanzas)", self.title, self.stanzas.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "titulo": "Santo",
        "BPM": 72,
        "compasso": "3/4",
        "unidade_bpm": "sm",
        "estrofes": [
            {"numero": 1, "tipo": "Estrofe", "linhas": [
                {"texto_silabado": "San - to", "notas_codes": ["sm", "m"]}
            ]},
            {"numero": null, "tipo": "coro", "linhas": [
                {"texto_silabado": "A - mém", "notas_codes": ["sm"]}
            ]},
            {"numero": 2, "tipo": "Estrofe", "linhas": [
                {"texto_silabado": "Glo - ri - a", "notas_codes": ["c", "c", "m", "sm"]}
            ]}
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let hymn = Hymn::from_json_str(DOC).unwrap();
        assert_eq!(hymn.title, "Santo");
        assert_eq!(hymn.bpm, Some(72));
        assert_eq!(hymn.beats_per_bar(), 3);
        assert_eq!(hymn.stanzas.len(), 3);
        assert_eq!(hymn.stanzas[1].kind, StanzaType::Chorus);
        assert_eq!(hymn.chorus_index(), Some(1));
        assert_eq!(hymn.stanzas[0].lines[0].note_codes[1], NoteCode::new("m"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let hymn = Hymn::from_json_str(r#"{"estrofes": [{"linhas": []}]}"#).unwrap();
        assert_eq!(hymn.title, "");
        assert_eq!(hymn.bpm, None);
        assert_eq!(hymn.time_signature, "4/4");
        assert_eq!(hymn.unit_note_value.as_str(), "sm");
        assert_eq!(hymn.stanzas[0].kind, StanzaType::Verse);
        assert_eq!(hymn.effective_bpm(&Config::default()), 60);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Hymn::from_json_str("{ not json"),
            Err(HymnError::InvalidDocument(_))
        ));
        assert!(matches!(
            Hymn::from_json_str(r#"{"BPM": "fast"}"#),
            Err(HymnError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = Hymn::from_path("/nonexistent/hino_999.json");
        assert!(matches!(result, Err(HymnError::NotFound(_))));
    }

    #[test]
    fn test_stanza_type_serializes_canonically() {
        let json = serde_json::to_string(&StanzaType::Chorus).unwrap();
        assert_eq!(json, "\"Coro\"");
        let kind: StanzaType = serde_json::from_str("\"CORO\"").unwrap();
        assert_eq!(kind, StanzaType::Chorus);
        let kind: StanzaType = serde_json::from_str("\"Refrão\"").unwrap();
        assert_eq!(kind, StanzaType::Verse);
    }

    #[test]
    fn test_stanza_tag_spelling_normalized_on_write() {
        let json = r#"{"estrofes": [
            {"numero": 1, "tipo": "estrofe", "linhas": []},
            {"numero": null, "tipo": "coro", "linhas": []}
        ]}"#;
        let hymn = Hymn::from_json_str(json).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&hymn.to_json_pretty().unwrap()).unwrap();
        assert_eq!(written["estrofes"][0]["tipo"], "Estrofe");
        assert_eq!(written["estrofes"][1]["tipo"], "Coro");
    }

    #[test]
    fn test_labels() {
        let hymn = Hymn::from_json_str(DOC).unwrap();
        assert_eq!(hymn.stanza_label(0), "Estrofe 1");
        assert_eq!(hymn.stanza_label(1), "Coro");
        assert_eq!(hymn.stanza_label(2), "Estrofe 2");
        assert_eq!(hymn.stanza_label(9), "");
    }

    #[test]
    fn test_verse_lookup_skips_chorus() {
        let mut hymn = Hymn::from_json_str(DOC).unwrap();
        hymn.stanzas[1].number = Some(2);
        assert_eq!(hymn.verse_index(2), Some(2));
        assert_eq!(hymn.verse_index(1), Some(0));
        assert_eq!(hymn.verse_index(7), None);
    }

    #[test]
    fn test_effective_bpm_keeps_slow_tempo() {
        let mut hymn = Hymn::from_json_str(DOC).unwrap();
        hymn.bpm = Some(3);
        assert_eq!(hymn.effective_bpm(&Config::default()), 3);
        hymn.bpm = Some(0);
        assert_eq!(hymn.effective_bpm(&Config::default()), 60);
    }

    #[test]
    fn test_reconcile_repairs_lines() {
        let mut hymn = Hymn::from_json_str(DOC).unwrap();
        let warnings = hymn.reconcile();
        assert_eq!(warnings.len(), 2);
        // Chorus line padded with the default code
        assert_eq!(
            hymn.stanzas[1].lines[0].note_codes,
            vec![NoteCode::new("sm"), NoteCode::new("sm")]
        );
        // Verse 2 truncated to three codes
        assert_eq!(hymn.stanzas[2].lines[0].note_codes.len(), 3);
        assert!(hymn.stanzas.iter().flat_map(|s| &s.lines).all(Line::is_consistent));
        assert!(hymn.reconcile().is_empty());
    }

    #[test]
    fn test_set_line_reconciles() {
        let mut hymn = Hymn::from_json_str(DOC).unwrap();
        let warnings = hymn
            .set_line(0, 0, "San - to San - to", vec![NoteCode::new("c")])
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(hymn.stanzas[0].lines[0].note_codes.len(), 4);
        assert_eq!(hymn.stanzas[0].lines[0].note_codes[0], NoteCode::new("c"));

        hymn.set_line(0, 5, "Novo", vec![NoteCode::new("m")]).unwrap();
        assert_eq!(hymn.stanzas[0].lines.len(), 2);

        assert!(matches!(
            hymn.set_line(8, 0, "x", vec![]),
            Err(HymnError::StanzaOutOfRange { index: 8, len: 3 })
        ));
    }

    #[test]
    fn test_replicate_rhythm_to_same_type() {
        let mut hymn = Hymn::from_json_str(DOC).unwrap();
        hymn.stanzas[2].lines[0] = Line::with_codes("Glo - ri", &["sm", "sm"]);
        let changed = hymn.replicate_rhythm(0).unwrap();
        assert_eq!(changed, 1);
        assert_eq!(
            hymn.stanzas[2].lines[0].note_codes,
            vec![NoteCode::new("sm"), NoteCode::new("m")]
        );
        // Chorus untouched
        assert_eq!(hymn.stanzas[1].lines[0].note_codes, vec![NoteCode::new("sm")]);
    }
}
