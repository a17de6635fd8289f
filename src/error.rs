//! # Error Types
//!
//! This module defines the error type for the hymnal engine.
//!
//! Only expected failures that stop an operation are errors. Problems the
//! engine can repair on its own (a line whose syllable count disagrees with its
//! note codes, an unknown note code) are reported as
//! [`LoadWarning`](crate::reconcile::LoadWarning) values instead.
//!
//! ## Error Types
//! - `NotFound` / `InvalidDocument` / `EmptyHymn` - the document could not be used
//! - `Config` - the configuration file is unreadable or out of range
//! - `NotLoaded` / `InvalidTransition` - an entry point was called in the wrong state
//! - `StanzaOutOfRange` / `NoChorus` / `VerseNotFound` - navigation targets that don't exist
//!
//! ## Usage
//! ```rust
//! use hymnal::{Hymn, HymnError};
//!
//! match Hymn::from_json_str(r#"{"titulo": "Vazio", "estrofes": []}"#) {
//!     Ok(hymn) => println!("{} stanzas", hymn.stanzas.len()),
//!     Err(HymnError::InvalidDocument(message)) => eprintln!("bad JSON: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HymnError {
    /// A hymn file could not be located.
    ///
    /// # Example
    /// ```
    /// # use hymnal::HymnError;
    /// let err = HymnError::NotFound("hino_042.json".to_string());
    /// assert_eq!(err.to_string(), "Hymn not found: hino_042.json");
    /// ```
    #[error("Hymn not found: {0}")]
    NotFound(String),

    /// The hymn JSON failed to parse or doesn't follow the document shape.
    #[error("Invalid hymn document: {0}")]
    InvalidDocument(String),

    /// The hymn has no stanzas, so there is nothing to play.
    #[error("Hymn has no stanzas")]
    EmptyHymn,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed or holds an unusable value.
    ///
    /// # Example
    /// ```
    /// # use hymnal::HymnError;
    /// let err = HymnError::Config("fermataFactor must be positive".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: fermataFactor must be positive");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A playback entry point was called before any hymn was loaded.
    #[error("No hymn loaded")]
    NotLoaded,

    /// The requested action is not allowed in the current playback state.
    ///
    /// # Example
    /// ```
    /// # use hymnal::HymnError;
    /// let err = HymnError::InvalidTransition {
    ///     action: "pause",
    ///     state: "Idle".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Cannot pause while Idle");
    /// ```
    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("Stanza index {index} out of range (hymn has {len} stanzas)")]
    StanzaOutOfRange { index: usize, len: usize },

    #[error("Hymn has no chorus")]
    NoChorus,

    #[error("No verse numbered {0}")]
    VerseNotFound(i64),
}
