//! # Syllable Tokenizer
//!
//! Splits a syllabified lyric line into the units that receive one note code
//! each: syllables and pause marks.
//!
//! ## Source Format
//! ```text
//! Maî - tre, _ Gloi - re~à toi ''
//! ```
//! - Whitespace separates syllables
//! - `-` marks a word broken across notes; it sticks to the syllable before it
//! - `_`, `"`, `__` and `''` are breath/rest marks (pause tokens)
//! - `~` is a liaison inside a syllable and stays part of its text
//! - A punctuation-only fragment (`,` `;` `.` `!` `?` `:`) joins the syllable before it
//!
//! The example above tokenizes to
//! `["Maî-", "tre,", _, "Gloi-", "re~à", "toi", '']`.

use serde::{Serialize, Serializer};
use std::fmt;

/// Liaison marker linking two syllables under a single note.
pub const LIAISON: char = '~';

const PUNCTUATION: [char; 6] = [',', ';', '.', '!', '?', ':'];

/// The four breath/rest marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseMark {
    Underscore,       // _
    DoubleUnderscore, // __
    Quote,            // "
    DoubleApostrophe, // ''
}

impl PauseMark {
    pub fn symbol(self) -> &'static str {
        match self {
            PauseMark::Underscore => "_",
            PauseMark::DoubleUnderscore => "__",
            PauseMark::Quote => "\"",
            PauseMark::DoubleApostrophe => "''",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "_" => Some(PauseMark::Underscore),
            "__" => Some(PauseMark::DoubleUnderscore),
            "\"" => Some(PauseMark::Quote),
            "''" => Some(PauseMark::DoubleApostrophe),
            _ => None,
        }
    }
}

/// One unit of a lyric line. Each token consumes exactly one note code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Syllable(String),
    Pause(PauseMark),
}

impl Token {
    pub fn syllable(text: impl Into<String>) -> Self {
        Token::Syllable(text.into())
    }

    pub fn is_pause(&self) -> bool {
        matches!(self, Token::Pause(_))
    }

    /// Display text of a syllable; pauses have none.
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Syllable(text) => Some(text),
            Token::Pause(_) => None,
        }
    }

    /// True when the syllable continues into the next one (`"Maî-"`).
    pub fn continues_word(&self) -> bool {
        self.text().is_some_and(|text| text.ends_with('-'))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Syllable(text) => f.write_str(text),
            Token::Pause(mark) => f.write_str(mark.symbol()),
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Raw pieces of a line before hyphens and punctuation are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Fragment<'a> {
    Text(&'a str),
    Pause(PauseMark),
    Hyphen,
}

/// Scanner over a single lyric line
struct LineScanner<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> LineScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.position..]
    }

    /// Length in bytes of a delimiter at the current position, if any.
    fn delimiter_len(rest: &str) -> Option<(usize, Option<Fragment<'static>>)> {
        if rest.starts_with("__") {
            return Some((2, Some(Fragment::Pause(PauseMark::DoubleUnderscore))));
        }
        if rest.starts_with("''") {
            return Some((2, Some(Fragment::Pause(PauseMark::DoubleApostrophe))));
        }
        let c = rest.chars().next()?;
        match c {
            '_' => Some((1, Some(Fragment::Pause(PauseMark::Underscore)))),
            '"' => Some((1, Some(Fragment::Pause(PauseMark::Quote)))),
            '-' => Some((1, Some(Fragment::Hyphen))),
            c if c.is_whitespace() => Some((c.len_utf8(), None)),
            _ => None,
        }
    }

    fn next_fragment(&mut self) -> Option<Fragment<'a>> {
        loop {
            let rest = self.remaining();
            if rest.is_empty() {
                return None;
            }

            if let Some((len, fragment)) = Self::delimiter_len(rest) {
                self.position += len;
                match fragment {
                    Some(fragment) => return Some(fragment),
                    None => continue, // whitespace
                }
            }

            // Plain text runs until the next delimiter
            let start = self.position;
            while let Some(c) = self.remaining().chars().next() {
                if Self::delimiter_len(self.remaining()).is_some() {
                    break;
                }
                self.position += c.len_utf8();
            }
            return Some(Fragment::Text(&self.input[start..self.position]));
        }
    }
}

impl<'a> Iterator for LineScanner<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_fragment()
    }
}

fn is_punctuation_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| PUNCTUATION.contains(&c))
}

/// Fragments with nothing a singer could read (stray brackets, symbols) are dropped.
fn has_lyric_content(text: &str) -> bool {
    text.chars().any(|c| {
        c.is_alphanumeric() || c == '\'' || c == LIAISON || c == '-' || PUNCTUATION.contains(&c)
    })
}

/// Tokenize a syllabified lyric line.
///
/// Pure and deterministic: the same line always yields the same tokens.
///
/// # Example
/// ```rust
/// use hymnal::tokenizer::{tokenize, PauseMark, Token};
///
/// let tokens = tokenize("Maî - tre , _ Sei - gneur.");
/// assert_eq!(
///     tokens,
///     vec![
///         Token::syllable("Maî-"),
///         Token::syllable("tre,"),
///         Token::Pause(PauseMark::Underscore),
///         Token::syllable("Sei-"),
///         Token::syllable("gneur."),
///     ]
/// );
/// ```
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for fragment in LineScanner::new(line) {
        match fragment {
            Fragment::Pause(mark) => tokens.push(Token::Pause(mark)),
            Fragment::Hyphen => match tokens.last_mut() {
                Some(Token::Syllable(previous)) => previous.push('-'),
                // Leading hyphen, or one right after a pause, stays on its own
                _ => tokens.push(Token::syllable("-")),
            },
            Fragment::Text(text) if is_punctuation_only(text) => {
                if let Some(Token::Syllable(previous)) = tokens.last_mut() {
                    previous.push_str(text);
                }
            }
            Fragment::Text(text) => {
                if has_lyric_content(text) {
                    tokens.push(Token::syllable(text));
                }
            }
        }
    }

    tokens
}

/// Number of note codes a line needs.
pub fn token_count(line: &str) -> usize {
    tokenize(line).len()
}
