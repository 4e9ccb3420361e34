//! Console host for the blind-test game.
//!
//! Reads guesses from stdin as `name: guess` lines, writes announcements to
//! stdout and logs to stderr. Audio playback is simulated by waiting out
//! each excerpt.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `blindtest-config.yaml` (or the path given
//!    as the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Load the playlist
//! 4. Register the console session
//! 5. Run the game loop until the playlist ends or stdin closes

mod collaborators;
mod console;
mod error;
mod orchestrator;
mod render;

use std::path::{Path, PathBuf};
use std::time::Duration;

use blindtest_core::config::{BlindtestConfig, LogFormat, LoggingConfig};
use blindtest_core::registry::SessionRegistry;
use blindtest_core::sink::event_channel;
use blindtest_types::SessionId;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::console::{LineChat, PlaylistSource, SimulatedPlayback};
use crate::error::HostError;
use crate::orchestrator::Orchestrator;

const DEFAULT_CONFIG_PATH: &str = "blindtest-config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("blindtest-host starting");
    info!(
        path = %config_path.display(),
        from_file,
        rounds = config.game.rounds,
        song_duration = config.game.song_duration,
        window_ms = config.game.guess_acceptance_window_ms,
        "Configuration loaded"
    );

    // 3. Load the playlist.
    let tracks = PlaylistSource::from_file(&config.host.playlist_path)?;
    if tracks.remaining() == 0 {
        info!("playlist is empty, nothing to play");
    }

    // 4. Register the console session.
    let registry = SessionRegistry::new();
    let session_id = SessionId::new(config.host.session_id.clone());
    let (tx, rx) = event_channel();
    let session = registry.create(session_id.clone(), tx).await?;

    // 5. Run the game loop.
    let mut orchestrator = Orchestrator::new(
        session,
        rx,
        tracks,
        SimulatedPlayback::new(),
        LineChat::new(tokio::io::stdin(), tokio::io::stdout()),
        Duration::from_millis(config.host.between_rounds_ms),
    );
    let summary = orchestrator.run(config.game).await?;
    registry.evict(&session_id).await;

    info!(
        rounds_played = summary.rounds_played,
        players = summary.standings.len(),
        "blindtest-host shutdown complete"
    );
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. The flag tells whether the file was read.
fn load_config(path: &Path) -> Result<(BlindtestConfig, bool), HostError> {
    if path.exists() {
        Ok((BlindtestConfig::from_file(path)?, true))
    } else {
        let mut config = BlindtestConfig::default();
        config.host.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Logs go to stderr so stdout stays the chat.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
