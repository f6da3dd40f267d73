//! Compile-time configuration for the content pipeline.
//!
//! Configuration is always passed explicitly into pipeline invocations.
//! Nothing in the core reads process-wide state, so tests and concurrent
//! batches cannot leak settings into each other.

use crate::core::error::ScriptoriumError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default narration speed when no configuration file or flag supplies one.
pub const DEFAULT_WORDS_PER_MINUTE: f64 = 150.0;
/// Seconds added to the estimate for each pause trigger.
pub const DEFAULT_PAUSE_WEIGHT_SECONDS: f64 = 2.0;
/// Directory under the vault root that holds write-event snapshots.
pub const HISTORY_DIR_NAME: &str = ".history";

/// Settings consumed by a single pipeline invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileConfig {
    /// Narration speed used for duration estimation. Must be positive.
    #[serde(default = "default_wpm")]
    pub words_per_minute: f64,
    /// Seconds contributed by each pause trigger. Must be positive.
    #[serde(default = "default_pause_weight")]
    pub pause_weight_seconds: f64,
    /// Root of the sovereign vault.
    pub vault_root: PathBuf,
    /// History store root. Defaults to `<vault_root>/.history`.
    #[serde(default)]
    pub history_root: Option<PathBuf>,
}

fn default_wpm() -> f64 {
    DEFAULT_WORDS_PER_MINUTE
}

fn default_pause_weight() -> f64 {
    DEFAULT_PAUSE_WEIGHT_SECONDS
}

impl CompileConfig {
    pub fn new(vault_root: PathBuf) -> Self {
        CompileConfig {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            pause_weight_seconds: DEFAULT_PAUSE_WEIGHT_SECONDS,
            vault_root,
            history_root: None,
        }
    }

    /// Load settings from a `scriptorium.toml` file.
    pub fn load(path: &Path) -> Result<Self, ScriptoriumError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScriptoriumError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: CompileConfig = toml::from_str(&text).map_err(|e| {
            ScriptoriumError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Resolved history store root.
    pub fn history_root(&self) -> PathBuf {
        self.history_root
            .clone()
            .unwrap_or_else(|| self.vault_root.join(HISTORY_DIR_NAME))
    }

    /// Reject non-positive numeric settings before any document I/O happens.
    pub fn validate(&self) -> Result<(), ScriptoriumError> {
        if !self.words_per_minute.is_finite() || self.words_per_minute <= 0.0 {
            return Err(ScriptoriumError::Configuration(format!(
                "words_per_minute must be positive, got {}",
                self.words_per_minute
            )));
        }
        if !self.pause_weight_seconds.is_finite() || self.pause_weight_seconds <= 0.0 {
            return Err(ScriptoriumError::Configuration(format!(
                "pause_weight_seconds must be positive, got {}",
                self.pause_weight_seconds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_positive_and_validate() {
        let config = CompileConfig::new(PathBuf::from("/vault"));
        assert_eq!(config.words_per_minute, 150.0);
        assert_eq!(config.pause_weight_seconds, 2.0);
        config.validate().expect("default config should validate");
    }

    #[test]
    fn zero_words_per_minute_is_rejected() {
        let mut config = CompileConfig::new(PathBuf::from("/vault"));
        config.words_per_minute = 0.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ScriptoriumError::Configuration(_)));
    }

    #[test]
    fn negative_pause_weight_is_rejected() {
        let mut config = CompileConfig::new(PathBuf::from("/vault"));
        config.pause_weight_seconds = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn history_root_defaults_under_vault() {
        let config = CompileConfig::new(PathBuf::from("/vault"));
        assert_eq!(config.history_root(), PathBuf::from("/vault/.history"));
    }

    #[test]
    fn toml_round_trip_with_partial_fields() {
        let parsed: CompileConfig = toml::from_str(
            r#"
            vault_root = "/vault"
            words_per_minute = 120.0
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(parsed.words_per_minute, 120.0);
        assert_eq!(parsed.pause_weight_seconds, 2.0);
        assert!(parsed.history_root.is_none());
    }
}
