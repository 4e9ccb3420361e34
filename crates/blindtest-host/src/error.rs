//! Error types for the host binary.
//!
//! [`HostError`] wraps every failure mode of startup and the game loop so
//! `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the host binary.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: blindtest_core::config::ConfigError,
    },

    /// A game operation was rejected.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: blindtest_core::game::GameError,
    },

    /// Session registration failed.
    #[error("registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: blindtest_core::registry::RegistryError,
    },

    /// The playlist file could not be parsed.
    #[error("invalid playlist {}: {source}", path.display())]
    Playlist {
        /// Path of the playlist file.
        path: PathBuf,
        /// The underlying YAML error.
        source: serde_yml::Error,
    },

    /// Reading chat input or writing chat output failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
