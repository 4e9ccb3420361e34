//! Console-backed collaborators: a YAML playlist, a timer standing in for
//! the audio stream, and a line-oriented chat over any reader/writer pair.

use std::collections::VecDeque;
use std::future;
use std::path::Path;
use std::time::Duration;

use blindtest_types::{PlaybackWindow, PlayerId, Track};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::collaborators::{ChatMessage, ChatTransport, PlaybackController, TrackSource};
use crate::error::HostError;

/// Display name used for chat lines without a `name:` prefix.
const ANONYMOUS: &str = "anonymous";

// ---------------------------------------------------------------------------
// Playlist
// ---------------------------------------------------------------------------

/// Tracks loaded up front from a YAML list.
#[derive(Debug, Default)]
pub struct PlaylistSource {
    tracks: VecDeque<Track>,
}

impl PlaylistSource {
    /// Build a source over an in-memory list.
    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            tracks: tracks.into_iter().collect(),
        }
    }

    /// Load a YAML sequence of tracks from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Io`] if the file cannot be read or
    /// [`HostError::Playlist`] if it is not a valid track list.
    pub fn from_file(path: &Path) -> Result<Self, HostError> {
        let contents = std::fs::read_to_string(path)?;
        let tracks: Vec<Track> =
            serde_yml::from_str(&contents).map_err(|source| HostError::Playlist {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), tracks = tracks.len(), "playlist loaded");
        Ok(Self::from_tracks(tracks))
    }

    /// Tracks not yet handed out.
    pub fn remaining(&self) -> usize {
        self.tracks.len()
    }
}

impl TrackSource for PlaylistSource {
    async fn next_track(&mut self) -> Result<Option<Track>, HostError> {
        Ok(self.tracks.pop_front())
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Pretends to stream the excerpt; finishes after its length elapses.
#[derive(Debug, Default)]
pub struct SimulatedPlayback {
    ends_at: Option<Instant>,
}

impl SimulatedPlayback {
    /// Create an idle player.
    pub const fn new() -> Self {
        Self { ends_at: None }
    }
}

impl PlaybackController for SimulatedPlayback {
    async fn play(&mut self, track: &Track, window: PlaybackWindow) -> Result<(), HostError> {
        let length = Duration::from_secs(window.len_seconds());
        self.ends_at = Some(Instant::now().checked_add(length).unwrap_or_else(Instant::now));
        info!(
            title = %track.title,
            start = window.start_second,
            end = window.end_second,
            "playing excerpt"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HostError> {
        if self.ends_at.take().is_some() {
            debug!("playback stopped");
        }
        Ok(())
    }

    async fn finished(&mut self) {
        match self.ends_at {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.ends_at = None;
            }
            None => future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Chat over text lines: each input line `name: guess` is one message and
/// every outgoing message is written as one line.
#[derive(Debug)]
pub struct LineChat<R, W> {
    lines: Lines<BufReader<R>>,
    out: W,
}

impl<R, W> LineChat<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap an input and an output stream.
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: BufReader::new(input).lines(),
            out,
        }
    }
}

impl<R, W> ChatTransport for LineChat<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn next_message(&mut self) -> Result<Option<ChatMessage>, HostError> {
        while let Some(line) = self.lines.next_line().await? {
            if let Some(message) = parse_line(&line, chrono::Utc::now().timestamp_millis()) {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    async fn send(&mut self, text: &str) -> Result<(), HostError> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Parse `name: text` into a message. Lines without a name are attributed
/// to [`ANONYMOUS`]; blank lines yield `None`.
pub fn parse_line(line: &str, timestamp_ms: i64) -> Option<ChatMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (name, text) = match line.split_once(':') {
        Some((name, text)) if !name.trim().is_empty() => (name.trim(), text.trim()),
        _ => (ANONYMOUS, line),
    };
    Some(ChatMessage {
        player_id: PlayerId::new(name.to_lowercase()),
        player_name: name.to_owned(),
        text: text.to_owned(),
        timestamp_ms,
    })
}
