//! # Stanza Layout
//!
//! Builds the text a display shows for one stanza, and the position of every
//! syllable inside it, so highlight events can name an exact character span.
//!
//! ## Layout Rules
//! - Lines are joined with `\n`
//! - Syllables are separated by a space, except after a syllable ending in `-`
//!   (the next syllable continues the same word)
//! - Pause tokens produce no text and no span
//! - `~` renders as the tie character `‿`
//! - With `show_hyphens` off, trailing hyphens are hidden: `Maî-` `tre` → `Maître`
//!
//! ```text
//! "Maî - tre _ Sei - gneur"   →   "Maî-tre Sei-gneur"
//!                                  [0,4) [4,7) [8,12) [12,17)
//! ```
//!
//! Spans count characters (not bytes) from the start of the stanza text.

use serde::Serialize;

use crate::config::Config;
use crate::duration::{duration_ms, NoteCode};
use crate::model::Stanza;
use crate::reconcile::reconcile;
use crate::tokenizer::{tokenize, Token, LIAISON};

/// Rendered form of the liaison marker.
pub const LIAISON_DISPLAY: char = '‿';

/// Character range of a syllable inside the stanza text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub line: usize,
    pub start: usize,
    pub len: usize,
}

impl HighlightSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// One timed unit of a stanza: a token and the note it is sung to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub token: Token,
    pub note_code: NoteCode,
    pub duration_ms: u32,
    /// `None` for pause tokens
    pub span: Option<HighlightSpan>,
}

impl Step {
    pub fn is_pause(&self) -> bool {
        self.span.is_none()
    }
}

/// Display text and timed steps for one stanza.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StanzaLayout {
    pub text: String,
    pub steps: Vec<Step>,
}

impl StanzaLayout {
    /// Lay out `stanza` and time each token at `bpm`.
    ///
    /// Lines are reconciled on the way, so there is always exactly one step per token.
    ///
    /// # Example
    /// ```rust
    /// use hymnal::layout::StanzaLayout;
    /// use hymnal::{Config, Line, NoteCode, Stanza};
    ///
    /// let stanza = Stanza::verse(1, vec![Line::with_codes("Maî - tre _ Sei - gneur", &["c", "c", "rc", "c", "m"])]);
    /// let layout = StanzaLayout::build(&stanza, 60, &NoteCode::new("sm"), &Config::default());
    ///
    /// assert_eq!(layout.text, "Maî-tre Sei-gneur");
    /// assert_eq!(layout.steps.len(), 5);
    /// assert_eq!(layout.highlighted_text(1), Some("tre"));
    /// assert_eq!(layout.steps[2].duration_ms, 300);
    /// ```
    pub fn build(stanza: &Stanza, bpm: u32, unit_note_value: &NoteCode, config: &Config) -> Self {
        let mut text = String::new();
        let mut char_count = 0usize;
        let mut steps = Vec::new();

        for (line_index, line) in stanza.lines.iter().enumerate() {
            if line_index > 0 {
                text.push('\n');
                char_count += 1;
            }

            let tokens = tokenize(&line.syllabic_text);
            let codes = reconcile(&tokens, &line.note_codes).note_codes;
            let mut after_hyphen = false;
            let mut line_has_text = false;

            for (token, note_code) in tokens.into_iter().zip(codes) {
                let duration = duration_ms(&note_code, bpm, unit_note_value, config);
                let span = match &token {
                    Token::Pause(_) => None,
                    Token::Syllable(syllable) => {
                        if line_has_text && !after_hyphen {
                            text.push(' ');
                            char_count += 1;
                        }
                        let shown = display_syllable(syllable, config.show_hyphens);
                        let len = shown.chars().count();
                        let span = HighlightSpan {
                            line: line_index,
                            start: char_count,
                            len,
                        };
                        text.push_str(&shown);
                        char_count += len;
                        after_hyphen = token.continues_word();
                        line_has_text = true;
                        Some(span)
                    }
                };

                steps.push(Step {
                    token,
                    note_code,
                    duration_ms: duration,
                    span,
                });
            }
        }

        Self { text, steps }
    }

    /// Recompute step durations for a new tempo, keeping text and spans.
    pub fn retime(&mut self, bpm: u32, unit_note_value: &NoteCode, config: &Config) {
        for step in &mut self.steps {
            step.duration_ms = duration_ms(&step.note_code, bpm, unit_note_value, config);
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.duration_ms)).sum()
    }

    /// Text covered by step `index`'s span.
    pub fn highlighted_text(&self, index: usize) -> Option<&str> {
        let span = self.steps.get(index)?.span?;
        let start = self.text.char_indices().nth(span.start).map(|(i, _)| i)?;
        let end = self
            .text
            .char_indices()
            .nth(span.end())
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        self.text.get(start..end)
    }
}

fn display_syllable(syllable: &str, show_hyphens: bool) -> String {
    let shown: String = syllable
        .chars()
        .map(|c| if c == LIAISON { LIAISON_DISPLAY } else { c })
        .collect();
    if show_hyphens {
        shown
    } else {
        match shown.strip_suffix('-') {
            Some(stripped) if !stripped.is_empty() => stripped.to_string(),
            _ => shown,
        }
    }
}
