//! Track metadata as yielded by a track source, and the clipped excerpt
//! the engine asks the player to stream.

use serde::{Deserialize, Serialize};

/// One credited artist on a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackArtist {
    /// Display name as listed by the catalog.
    pub name: String,
}

/// A track to be played for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Title as listed by the catalog, decorations included.
    pub title: String,
    /// Credited artists; the first entry is the primary artist.
    pub artists: Vec<TrackArtist>,
    /// Total track length in whole seconds.
    pub duration_seconds: u64,
}

impl Track {
    /// Artist names in credit order.
    pub fn artist_names(&self) -> Vec<String> {
        self.artists.iter().map(|a| a.name.clone()).collect()
    }
}

/// Excerpt of a track to stream, in whole seconds from the track start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackWindow {
    /// First second of the excerpt.
    pub start_second: u64,
    /// Second at which the excerpt stops (never past the track end).
    pub end_second: u64,
}

impl PlaybackWindow {
    /// Length of the excerpt in seconds.
    pub const fn len_seconds(&self) -> u64 {
        self.end_second.saturating_sub(self.start_second)
    }
}
