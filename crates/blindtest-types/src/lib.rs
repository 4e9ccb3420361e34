//! Shared type definitions for the blind-test guessing game.
//!
//! Types defined here flow between the guessing engine and whatever host
//! drives it (a chat bot, the console orchestrator, tests).
//!
//! # Modules
//!
//! - [`ids`] -- Typed string keys for players and sessions
//! - [`track`] -- Track metadata and playback excerpt window
//! - [`events`] -- Outbound round lifecycle events and guess targets

pub mod events;
pub mod ids;
pub mod track;

pub use events::{
    ArtistGuessed, GameEvent, RoundOver, RoundStart, Scoreboard, Standing, Target, TitleGuessed,
};
pub use ids::{PlayerId, SessionId};
pub use track::{PlaybackWindow, Track, TrackArtist};
