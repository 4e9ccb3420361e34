//! Configuration loading and typed config structures.
//!
//! The configuration lives in `blindtest-config.yaml`. Every field has a
//! default, so an empty or missing file yields a playable game.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlindtestConfig {
    /// Game rules handed to [`Game::start`](crate::game::Game::start).
    #[serde(default)]
    pub game: GameConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Host orchestrator settings.
    #[serde(default)]
    pub host: HostConfig,
}

impl BlindtestConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `BLINDTEST_PLAYLIST` overrides `host.playlist_path` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a game rule is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a game rule is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.game.validate()?;
        config.host.apply_env_overrides();
        Ok(config)
    }
}

/// Rules for one game session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Soft cap on the number of rounds. Informational for the engine;
    /// the host stops feeding tracks after this many.
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Fraction of the track at which the excerpt starts (0.0 to 1.0).
    #[serde(default = "default_song_start_percent")]
    pub song_start_percent: f64,

    /// Excerpt length in seconds.
    #[serde(default = "default_song_duration")]
    pub song_duration: u64,

    /// Minimum similarity (0.0 to 1.0) for a guess to count as correct.
    #[serde(default = "default_guess_likeness_threshold")]
    pub guess_likeness_threshold: f64,

    /// Milliseconds after the first correct guess during which other
    /// correct guesses for the same target still score.
    #[serde(default = "default_guess_acceptance_window_ms")]
    pub guess_acceptance_window_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            song_start_percent: default_song_start_percent(),
            song_duration: default_song_duration(),
            guess_likeness_threshold: default_guess_likeness_threshold(),
            guess_acceptance_window_ms: default_guess_acceptance_window_ms(),
        }
    }
}

impl GameConfig {
    /// Check that fractional settings are within `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.song_start_percent) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "songStartPercent must be within [0, 1], got {}",
                    self.song_start_percent
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.guess_likeness_threshold) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "guessLikenessThreshold must be within [0, 1], got {}",
                    self.guess_likeness_threshold
                ),
            });
        }
        Ok(())
    }
}

/// Output format for the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Settings for the console host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    /// Session key the host registers its game under.
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// YAML file listing the tracks to play.
    #[serde(default = "default_playlist_path")]
    pub playlist_path: PathBuf,

    /// Pause between the end of one round and the start of the next.
    #[serde(default = "default_between_rounds_ms")]
    pub between_rounds_ms: u64,
}

impl HostConfig {
    /// Override the playlist path with `BLINDTEST_PLAYLIST` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BLINDTEST_PLAYLIST") {
            self.playlist_path = PathBuf::from(val);
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
            playlist_path: default_playlist_path(),
            between_rounds_ms: default_between_rounds_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_rounds() -> u32 {
    100
}

const fn default_song_start_percent() -> f64 {
    0.2
}

const fn default_song_duration() -> u64 {
    20
}

const fn default_guess_likeness_threshold() -> f64 {
    0.8
}

const fn default_guess_acceptance_window_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_session_id() -> String {
    "console".to_owned()
}

fn default_playlist_path() -> PathBuf {
    PathBuf::from("playlist.yaml")
}

const fn default_between_rounds_ms() -> u64 {
    3000
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GameConfig::default();
        assert_eq!(config.rounds, 100);
        assert_eq!(config.song_start_percent, 0.2);
        assert_eq!(config.song_duration, 20);
        assert_eq!(config.guess_likeness_threshold, 0.8);
        assert_eq!(config.guess_acceptance_window_ms, 1000);
    }

    #[test]
    fn empty_yaml_is_all_defaults() {
        let config = BlindtestConfig::parse("").unwrap();
        assert_eq!(config.game, GameConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn partial_game_section_keeps_other_defaults() {
        let yaml = "game:\n  songDuration: 15\n  guessAcceptanceWindowMs: 500\nlogging:\n  format: json\n";
        let config = BlindtestConfig::parse(yaml).unwrap();
        assert_eq!(config.game.song_duration, 15);
        assert_eq!(config.game.guess_acceptance_window_ms, 500);
        assert_eq!(config.game.guess_likeness_threshold, 0.8);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let yaml = "game:\n  guessLikenessThreshold: 1.5\n";
        let err = BlindtestConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn start_percent_out_of_range_is_rejected() {
        let config = GameConfig {
            song_start_percent: -0.1,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = BlindtestConfig::parse("game: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
