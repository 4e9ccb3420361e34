//! Round-guessing engine for the blind-test game.
//!
//! Players hear an excerpt of a track and type guesses for its title and
//! artists. This crate tracks the active round, fuzzy-matches guesses,
//! scores them, and emits round lifecycle events. It does no chat or
//! audio I/O; the host renders the events and drives playback.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `blindtest-config.yaml`.
//! - [`matching`] -- Title/artist normalization and edit-distance similarity.
//! - [`round`] -- Per-round, per-target guessing state.
//! - [`game`] -- The synchronous [`Game`] state machine.
//! - [`sink`] -- [`EventSink`] trait and channel-backed implementation.
//! - [`timer`] -- Cancellable one-shot timers keyed by [`TimerKey`].
//! - [`session`] -- [`Session`], a locked game plus its live timers.
//! - [`registry`] -- [`SessionRegistry`], sessions keyed by id.
//!
//! [`Game`]: game::Game
//! [`EventSink`]: sink::EventSink
//! [`TimerKey`]: timer::TimerKey
//! [`Session`]: session::Session
//! [`SessionRegistry`]: registry::SessionRegistry

pub mod config;
pub mod game;
pub mod matching;
pub mod registry;
pub mod round;
pub mod session;
pub mod sink;
pub mod timer;
