//! # Token/Note Reconciliation
//!
//! Every token of a line consumes one note code. Documents coming out of OCR
//! and manual editing often break that rule, so this module is the single
//! place where lines are repaired:
//! - too few codes: pad with the reference code (`sm`)
//! - too many codes: drop the extras
//!
//! Repairs never fail. They are reported as [`LoadWarning`] values so the
//! caller can show or log them.
//!
//! ## Example
//! ```rust
//! use hymnal::reconcile::reconcile;
//! use hymnal::tokenizer::tokenize;
//! use hymnal::NoteCode;
//!
//! let tokens = tokenize("Gran - de é");
//! let outcome = reconcile(&tokens, &[NoteCode::new("c")]);
//!
//! assert_eq!(outcome.note_codes.len(), 3);
//! assert_eq!(outcome.note_codes[2], NoteCode::new("sm"));
//! assert!(outcome.was_repaired());
//! ```

use std::fmt;

use crate::duration::NoteCode;
use crate::tokenizer::Token;

/// A non-fatal problem found while loading or editing a hymn.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// Token and note counts disagreed; the codes were padded or truncated.
    MalformedLine {
        stanza: usize,
        line: usize,
        tokens: usize,
        note_codes: usize,
    },
    /// A code outside the vocabulary; it is timed as a quarter-equivalent.
    UnknownNoteCode {
        stanza: usize,
        line: usize,
        position: usize,
        code: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MalformedLine {
                stanza,
                line,
                tokens,
                note_codes,
            } => write!(
                f,
                "stanza {}, line {}: {} tokens but {} note codes",
                stanza + 1,
                line + 1,
                tokens,
                note_codes
            ),
            LoadWarning::UnknownNoteCode {
                stanza,
                line,
                position,
                code,
            } => write!(
                f,
                "stanza {}, line {}, note {}: unknown note code '{}'",
                stanza + 1,
                line + 1,
                position + 1,
                code
            ),
        }
    }
}

/// Result of reconciling one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Exactly one code per token
    pub note_codes: Vec<NoteCode>,
    pub token_count: usize,
    pub original_code_count: usize,
}

impl Reconciled {
    pub fn was_repaired(&self) -> bool {
        self.token_count != self.original_code_count
    }

    /// Warnings for this line, located at `stanza`/`line`.
    pub fn warnings(&self, stanza: usize, line: usize) -> Vec<LoadWarning> {
        let mut warnings = Vec::new();
        if self.was_repaired() {
            warnings.push(LoadWarning::MalformedLine {
                stanza,
                line,
                tokens: self.token_count,
                note_codes: self.original_code_count,
            });
        }
        for (position, code) in self.note_codes.iter().enumerate() {
            if !code.is_known() {
                warnings.push(LoadWarning::UnknownNoteCode {
                    stanza,
                    line,
                    position,
                    code: code.as_str().to_string(),
                });
            }
        }
        warnings
    }
}

/// Pair a line's tokens with its note codes, padding or truncating the codes.
pub fn reconcile(tokens: &[Token], note_codes: &[NoteCode]) -> Reconciled {
    let mut codes: Vec<NoteCode> = note_codes.iter().take(tokens.len()).cloned().collect();
    codes.resize_with(tokens.len(), NoteCode::default);

    Reconciled {
        note_codes: codes,
        token_count: tokens.len(),
        original_code_count: note_codes.len(),
    }
}
