//! Outbound events produced by the guessing engine.
//!
//! The engine never talks to the chat platform or the audio player
//! itself. It emits these events and the host maps them to chat messages
//! and playback control (e.g. stopping the stream on [`GameEvent::RoundOver`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// Cumulative or per-round points keyed by player.
pub type Scoreboard = BTreeMap<PlayerId, u32>;

/// Something a guess can be scored against within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    /// The track title.
    Title,
    /// The artist at this credit index (0 is the primary artist).
    Artist(usize),
}

impl Target {
    /// Points awarded the first time a player is credited for this target.
    pub const fn points(self) -> u32 {
        match self {
            Self::Title | Self::Artist(0) => 2,
            Self::Artist(_) => 1,
        }
    }
}

impl core::fmt::Display for Target {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Title => f.write_str("title"),
            Self::Artist(i) => write!(f, "artist[{i}]"),
        }
    }
}

/// A round began; the track is now playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStart {
    /// Caller-assigned round number.
    pub round_number: u32,
    /// Track title.
    pub title: String,
    /// Track artists in credit order.
    pub artists: Vec<String>,
}

/// The title acceptance window closed; lists everyone credited for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleGuessed {
    /// Round the title belongs to.
    pub round_number: u32,
    /// Track title.
    pub title: String,
    /// Display names of credited players, in crediting order.
    pub scorers: Vec<String>,
}

/// An artist acceptance window closed; lists everyone credited for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistGuessed {
    /// Round the artist belongs to.
    pub round_number: u32,
    /// Credit index of the artist.
    pub artist_index: usize,
    /// Artist name.
    pub artist: String,
    /// Display names of credited players, in crediting order.
    pub scorers: Vec<String>,
}

/// The round closed. Authoritative signal to stop playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOver {
    /// Round that closed.
    pub round_number: u32,
    /// Track title.
    pub title: String,
    /// Track artists in credit order.
    pub artists: Vec<String>,
    /// Full cumulative scoreboard after this round.
    pub scoreboard: Scoreboard,
    /// Points earned during this round only.
    pub new_points_this_round: Scoreboard,
}

/// Round lifecycle event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    /// See [`RoundStart`].
    RoundStart(RoundStart),
    /// See [`TitleGuessed`].
    TitleGuessed(TitleGuessed),
    /// See [`ArtistGuessed`].
    ArtistGuessed(ArtistGuessed),
    /// See [`RoundOver`].
    RoundOver(RoundOver),
}

impl GameEvent {
    /// Round number the event refers to.
    pub const fn round_number(&self) -> u32 {
        match self {
            Self::RoundStart(e) => e.round_number,
            Self::TitleGuessed(e) => e.round_number,
            Self::ArtistGuessed(e) => e.round_number,
            Self::RoundOver(e) => e.round_number,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// Player id.
    pub player_id: PlayerId,
    /// Last display name seen for the player.
    pub name: String,
    /// Cumulative score.
    pub score: u32,
}
