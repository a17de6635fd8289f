//! Engine configuration.
//!
//! Every option has a default, so an empty YAML document (or no file at all)
//! yields [`Config::default()`]. Keys are camelCase:
//!
//! ```yaml
//! bpmStep: 5
//! fermataFactor: 1.5
//! startDelaySec: 2
//! interStanzaDelaySec: 3
//! shortBreathMs: 300
//! shortRestMs: 500
//! longBreathMs: 800
//! longRestMs: 1000
//! minNoteMs: 50
//! defaultBpm: 60
//! showHyphens: true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::HymnError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// BPM change per tempo step (`adjust_tempo`)
    pub bpm_step: u32,
    pub fermata_factor: f64,
    /// Countdown before the first stanza; 0 starts immediately
    pub start_delay_sec: u32,
    /// Countdown between stanzas; 0 falls back to two seconds
    pub inter_stanza_delay_sec: u32,
    pub short_breath_ms: u32,
    pub short_rest_ms: u32,
    pub long_breath_ms: u32,
    pub long_rest_ms: u32,
    pub min_note_ms: u32,
    /// Tempo for hymns whose document carries no BPM
    pub default_bpm: u32,
    /// Show the continuation hyphen between syllables of a word
    pub show_hyphens: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm_step: 5,
            fermata_factor: 1.5,
            start_delay_sec: 2,
            inter_stanza_delay_sec: 3,
            short_breath_ms: 300,
            short_rest_ms: 500,
            long_breath_ms: 800,
            long_rest_ms: 1000,
            min_note_ms: 50,
            default_bpm: 60,
            show_hyphens: true,
        }
    }
}

impl Config {
    /// Parse a YAML configuration and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, HymnError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| HymnError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, HymnError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, HymnError> {
        serde_yaml::to_string(self).map_err(|e| HymnError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), HymnError> {
        if !(self.fermata_factor.is_finite() && self.fermata_factor > 0.0) {
            return Err(HymnError::Config(format!(
                "fermataFactor must be positive, got {}",
                self.fermata_factor
            )));
        }
        if self.bpm_step == 0 {
            return Err(HymnError::Config("bpmStep must be at least 1".to_string()));
        }
        if self.default_bpm == 0 {
            return Err(HymnError::Config("defaultBpm must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Seconds to wait between stanzas.
    pub fn effective_inter_stanza_delay_sec(&self) -> u32 {
        if self.inter_stanza_delay_sec > 0 {
            self.inter_stanza_delay_sec
        } else {
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fermata_factor, 1.5);
        assert_eq!(config.short_breath_ms, 300);
        assert_eq!(config.short_rest_ms, 500);
        assert_eq!(config.long_breath_ms, 800);
        assert_eq!(config.long_rest_ms, 1000);
        assert_eq!(config.min_note_ms, 50);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml_str("fermataFactor: 2.0\nstartDelaySec: 0\n").unwrap();
        assert_eq!(config.fermata_factor, 2.0);
        assert_eq!(config.start_delay_sec, 0);
        assert_eq!(config.long_rest_ms, 1000);
        assert!(config.show_hyphens);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config {
            bpm_step: 2,
            show_hyphens: false,
            ..Config::default()
        };
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.contains("bpmStep: 2"));
        assert_eq!(Config::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_yaml_str("fermataFactor: 0"),
            Err(HymnError::Config(_))
        ));
        assert!(matches!(
            Config::from_yaml_str("bpmStep: 0"),
            Err(HymnError::Config(_))
        ));
        assert!(matches!(
            Config::from_yaml_str("minNoteMs: fast"),
            Err(HymnError::Config(_))
        ));
    }

    #[test]
    fn test_zero_inter_stanza_delay_falls_back() {
        let config = Config {
            inter_stanza_delay_sec: 0,
            ..Config::default()
        };
        assert_eq!(config.effective_inter_stanza_delay_sec(), 2);
        assert_eq!(Config::default().effective_inter_stanza_delay_sec(), 3);
    }
}
