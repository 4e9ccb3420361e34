//! Interfaces of the external collaborators the orchestrator drives.
//!
//! A real bot backs these with a music catalog, a voice connection and a
//! chat gateway; the console host backs them with the types in
//! [`crate::console`].

use blindtest_types::{PlaybackWindow, PlayerId, Track};

use crate::error::HostError;

/// One chat message, forwarded as a guess while a round is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author's platform id.
    pub player_id: PlayerId,
    /// Author's display name.
    pub player_name: String,
    /// Raw message text.
    pub text: String,
    /// Arrival time in Unix milliseconds.
    pub timestamp_ms: i64,
}

/// Yields the tracks to play, in order.
pub trait TrackSource {
    /// Next track, or `None` when the playlist is exhausted.
    async fn next_track(&mut self) -> Result<Option<Track>, HostError>;
}

/// Streams audio excerpts.
pub trait PlaybackController {
    /// Start streaming `window` of `track`.
    async fn play(&mut self, track: &Track, window: PlaybackWindow) -> Result<(), HostError>;

    /// Stop the current stream, if any.
    async fn stop(&mut self) -> Result<(), HostError>;

    /// Resolve when the current stream ends on its own. Pends forever when
    /// nothing is playing. Must be cancel-safe.
    async fn finished(&mut self);
}

/// Chat channel the game is played in.
pub trait ChatTransport {
    /// Next message, or `None` once the channel is closed. Must be
    /// cancel-safe.
    async fn next_message(&mut self) -> Result<Option<ChatMessage>, HostError>;

    /// Post a message to the channel.
    async fn send(&mut self, text: &str) -> Result<(), HostError>;
}
