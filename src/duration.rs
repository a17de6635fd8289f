//! # Note Codes and Durations
//!
//! Converts symbolic note codes into millisecond timings for a given tempo.
//!
//! ## Note Code Vocabulary
//! ```text
//! code   class            factor (quarter = 1.0)
//! sb     whole            4.0
//! m      half             2.0
//! sm     quarter          1.0
//! c      eighth           0.5
//! sc     sixteenth        0.25
//! cp     dotted eighth    0.75
//! rc     short breath     fixed ms (config)
//! pc     short rest       fixed ms (config)
//! rl     long breath      fixed ms (config)
//! pl     long rest        fixed ms (config)
//! ```
//! Any tempo-scaled code may carry a `_fermata` suffix (`sm_fermata`), which
//! multiplies its duration by `Config::fermata_factor`.
//!
//! ## Timing Formula
//! ```text
//! ms_per_beat = 60000 / bpm
//! ms_per_unit = ms_per_beat / factor(unit_note_value)
//! duration    = ms_per_unit * factor(code)  [* fermata_factor]
//! ```
//! The result is floored and clamped to `Config::min_note_ms`.
//!
//! ## Example
//! ```rust
//! use hymnal::{duration_ms, Config, NoteCode};
//!
//! let config = Config::default();
//! let quarter = NoteCode::new("sm");
//! let half = NoteCode::new("m");
//!
//! assert_eq!(duration_ms(&quarter, 60, &quarter, &config), 1000);
//! assert_eq!(duration_ms(&half, 120, &quarter, &config), 1000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;

/// Lowest tempo the engine will time notes at.
pub const MIN_BPM: u32 = 10;

/// Suffix marking a held note.
pub const FERMATA_SUFFIX: &str = "_fermata";

/// Code used to pad lines that have fewer note codes than syllables.
pub const DEFAULT_NOTE_CODE: &str = "sm";

/// Base duration class of a note code, with the fermata suffix stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteBase {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    DottedEighth,
    ShortBreath,
    ShortRest,
    LongBreath,
    LongRest,
}

impl NoteBase {
    pub const ALL: [NoteBase; 10] = [
        NoteBase::Whole,
        NoteBase::Half,
        NoteBase::Quarter,
        NoteBase::Eighth,
        NoteBase::Sixteenth,
        NoteBase::DottedEighth,
        NoteBase::ShortBreath,
        NoteBase::ShortRest,
        NoteBase::LongBreath,
        NoteBase::LongRest,
    ];

    /// Parse a base code like `"sm"` or `"rc"`. Case and surrounding
    /// whitespace are ignored.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "sb" => Some(NoteBase::Whole),
            "m" => Some(NoteBase::Half),
            "sm" => Some(NoteBase::Quarter),
            "c" => Some(NoteBase::Eighth),
            "sc" => Some(NoteBase::Sixteenth),
            "cp" => Some(NoteBase::DottedEighth),
            "rc" => Some(NoteBase::ShortBreath),
            "pc" => Some(NoteBase::ShortRest),
            "rl" => Some(NoteBase::LongBreath),
            "pl" => Some(NoteBase::LongRest),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            NoteBase::Whole => "sb",
            NoteBase::Half => "m",
            NoteBase::Quarter => "sm",
            NoteBase::Eighth => "c",
            NoteBase::Sixteenth => "sc",
            NoteBase::DottedEighth => "cp",
            NoteBase::ShortBreath => "rc",
            NoteBase::ShortRest => "pc",
            NoteBase::LongBreath => "rl",
            NoteBase::LongRest => "pl",
        }
    }

    /// Length relative to the quarter-equivalent reference unit.
    ///
    /// Returns `None` for the four fixed-length breath/rest codes, which are
    /// never scaled by tempo.
    pub fn relative_factor(self) -> Option<f64> {
        match self {
            NoteBase::Whole => Some(4.0),
            NoteBase::Half => Some(2.0),
            NoteBase::Quarter => Some(1.0),
            NoteBase::Eighth => Some(0.5),
            NoteBase::Sixteenth => Some(0.25),
            NoteBase::DottedEighth => Some(0.75),
            NoteBase::ShortBreath
            | NoteBase::ShortRest
            | NoteBase::LongBreath
            | NoteBase::LongRest => None,
        }
    }

    pub fn is_pause(self) -> bool {
        self.relative_factor().is_none()
    }

    /// Fixed length of a breath/rest code, read from the configuration.
    fn fixed_ms(self, config: &Config) -> Option<u32> {
        match self {
            NoteBase::ShortBreath => Some(config.short_breath_ms),
            NoteBase::ShortRest => Some(config.short_rest_ms),
            NoteBase::LongBreath => Some(config.long_breath_ms),
            NoteBase::LongRest => Some(config.long_rest_ms),
            _ => None,
        }
    }
}

/// A note code as written in the hymn document.
///
/// The raw text is kept verbatim so a document with unknown or oddly cased
/// codes serializes back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteCode(String);

impl NoteCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_fermata(&self) -> bool {
        self.0.trim().to_ascii_lowercase().contains(FERMATA_SUFFIX)
    }

    /// The duration class, or `None` if the code isn't in the vocabulary.
    pub fn base(&self) -> Option<NoteBase> {
        let lowered = self.0.trim().to_ascii_lowercase();
        NoteBase::from_code(&lowered.replace(FERMATA_SUFFIX, ""))
    }

    pub fn is_known(&self) -> bool {
        self.base().is_some()
    }

    pub fn is_pause(&self) -> bool {
        self.base().is_some_and(NoteBase::is_pause)
    }
}

impl Default for NoteCode {
    fn default() -> Self {
        Self::new(DEFAULT_NOTE_CODE)
    }
}

impl From<&str> for NoteCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<NoteBase> for NoteCode {
    fn from(base: NoteBase) -> Self {
        Self::new(base.code())
    }
}

impl fmt::Display for NoteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative factor used for timing; unknown codes and the fixed-length codes
/// count as the reference unit.
fn timing_factor(code: &NoteCode) -> f64 {
    code.base()
        .and_then(NoteBase::relative_factor)
        .unwrap_or(1.0)
}

/// Duration of one note in milliseconds.
///
/// Total over all inputs: unknown codes time as a quarter-equivalent, a `bpm`
/// of zero is raised to [`MIN_BPM`], and the result never drops below
/// `config.min_note_ms`.
///
/// # Example
/// ```rust
/// use hymnal::{duration_ms, Config, NoteCode};
///
/// let config = Config::default();
/// let unit = NoteCode::new("sm");
///
/// // Breath marks ignore tempo
/// assert_eq!(duration_ms(&NoteCode::new("rc"), 60, &unit, &config), 300);
/// assert_eq!(duration_ms(&NoteCode::new("rc"), 200, &unit, &config), 300);
///
/// // Fermata holds 1.5x by default
/// assert_eq!(duration_ms(&NoteCode::new("sm_fermata"), 60, &unit, &config), 1500);
/// ```
pub fn duration_ms(code: &NoteCode, bpm: u32, unit_note_value: &NoteCode, config: &Config) -> u32 {
    if let Some(fixed) = code.base().and_then(|base| base.fixed_ms(config)) {
        return fixed.max(config.min_note_ms);
    }

    let bpm = if bpm == 0 { MIN_BPM } else { bpm };
    let ms_per_beat = 60_000.0 / f64::from(bpm);
    let ms_per_unit = ms_per_beat / timing_factor(unit_note_value);
    let mut ms = ms_per_unit * timing_factor(code);

    if code.has_fermata() {
        ms *= config.fermata_factor;
    }

    let floored = if ms.is_finite() && ms > 0.0 {
        ms.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    };
    floored.max(config.min_note_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> NoteCode {
        NoteCode::new("sm")
    }

    #[test]
    fn test_reference_ratios() {
        assert_eq!(NoteBase::Whole.relative_factor(), Some(4.0));
        assert_eq!(NoteBase::Half.relative_factor(), Some(2.0));
        assert_eq!(NoteBase::Quarter.relative_factor(), Some(1.0));
        assert_eq!(NoteBase::Eighth.relative_factor(), Some(0.5));
        assert_eq!(NoteBase::Sixteenth.relative_factor(), Some(0.25));
        assert_eq!(NoteBase::DottedEighth.relative_factor(), Some(0.75));
    }

    #[test]
    fn test_code_table_is_closed() {
        for base in NoteBase::ALL {
            assert_eq!(NoteBase::from_code(base.code()), Some(base));
        }
        assert_eq!(NoteBase::from_code("xyz"), None);
    }

    #[test]
    fn test_parsing_ignores_case_and_whitespace() {
        let code = NoteCode::new("  SM_Fermata ");
        assert_eq!(code.base(), Some(NoteBase::Quarter));
        assert!(code.has_fermata());
        assert_eq!(code.as_str(), "  SM_Fermata ");
    }

    #[test]
    fn test_quarter_at_60_bpm() {
        let config = Config::default();
        assert_eq!(duration_ms(&NoteCode::new("sm"), 60, &unit(), &config), 1000);
        assert_eq!(duration_ms(&NoteCode::new("sb"), 60, &unit(), &config), 4000);
        assert_eq!(duration_ms(&NoteCode::new("cp"), 60, &unit(), &config), 750);
        assert_eq!(duration_ms(&NoteCode::new("sc"), 60, &unit(), &config), 250);
    }

    #[test]
    fn test_unit_note_value_rescales_beat() {
        let config = Config::default();
        // Beat is a half note: a quarter lasts half a beat
        let half_unit = NoteCode::new("m");
        assert_eq!(duration_ms(&NoteCode::new("sm"), 60, &half_unit, &config), 500);
        // Beat is an eighth: a quarter lasts two beats
        let eighth_unit = NoteCode::new("c");
        assert_eq!(duration_ms(&NoteCode::new("sm"), 60, &eighth_unit, &config), 2000);
    }

    #[test]
    fn test_pause_unit_value_falls_back_to_reference() {
        let config = Config::default();
        let odd_unit = NoteCode::new("rc");
        assert_eq!(duration_ms(&NoteCode::new("sm"), 60, &odd_unit, &config), 1000);
    }

    #[test]
    fn test_monotonic_in_tempo() {
        let config = Config::default();
        for base in NoteBase::ALL.iter().filter(|b| !b.is_pause()) {
            let code = NoteCode::from(*base);
            let mut previous = u32::MAX;
            for bpm in [1, 5, 9, 10, 20, 40, 60, 72, 90, 120, 150] {
                let ms = duration_ms(&code, bpm, &unit(), &config);
                assert!(ms < previous, "{} at {} bpm should be shorter than at slower tempo", code, bpm);
                previous = ms;
            }
        }
    }

    #[test]
    fn test_fermata_scaling() {
        let config = Config::default();
        let plain = duration_ms(&NoteCode::new("sm"), 60, &unit(), &config);
        let held = duration_ms(&NoteCode::new("sm_fermata"), 60, &unit(), &config);
        assert_eq!(held, (f64::from(plain) * config.fermata_factor).round() as u32);

        let custom = Config {
            fermata_factor: 2.0,
            ..Config::default()
        };
        assert_eq!(duration_ms(&NoteCode::new("c_fermata"), 60, &unit(), &custom), 1000);
    }

    #[test]
    fn test_pause_codes_ignore_tempo_and_fermata() {
        let config = Config::default();
        for bpm in [1, 30, 60, 200, 400] {
            assert_eq!(duration_ms(&NoteCode::new("rc"), bpm, &unit(), &config), config.short_breath_ms);
            assert_eq!(duration_ms(&NoteCode::new("pc"), bpm, &unit(), &config), config.short_rest_ms);
            assert_eq!(duration_ms(&NoteCode::new("rl"), bpm, &unit(), &config), config.long_breath_ms);
            assert_eq!(duration_ms(&NoteCode::new("pl"), bpm, &unit(), &config), config.long_rest_ms);
        }
        assert_eq!(duration_ms(&NoteCode::new("rc_fermata"), 60, &unit(), &config), 300);
    }

    #[test]
    fn test_unknown_code_is_reference_unit() {
        let config = Config::default();
        assert_eq!(duration_ms(&NoteCode::new("semibreve?"), 60, &unit(), &config), 1000);
        assert_eq!(duration_ms(&NoteCode::new(""), 120, &unit(), &config), 500);
    }

    #[test]
    fn test_minimum_clamp() {
        let config = Config::default();
        // Sixteenth at 400 bpm = 37.5 ms
        assert_eq!(duration_ms(&NoteCode::new("sc"), 400, &unit(), &config), 50);

        let tiny_pause = Config {
            short_breath_ms: 0,
            ..Config::default()
        };
        assert_eq!(duration_ms(&NoteCode::new("rc"), 60, &unit(), &tiny_pause), 50);
    }

    #[test]
    fn test_only_zero_bpm_uses_floor() {
        let config = Config::default();
        let sm = NoteCode::new("sm");
        assert_eq!(
            duration_ms(&sm, 0, &unit(), &config),
            duration_ms(&sm, MIN_BPM, &unit(), &config)
        );
        assert_eq!(duration_ms(&sm, 5, &unit(), &config), 12_000);
        assert_eq!(duration_ms(&sm, 9, &unit(), &config), 6666);
        assert_eq!(duration_ms(&sm, 10, &unit(), &config), 6000);
    }

    #[test]
    fn test_result_is_floored() {
        let config = Config::default();
        // 60000 / 70 = 857.14...
        assert_eq!(duration_ms(&NoteCode::new("sm"), 70, &unit(), &config), 857);
    }
}
