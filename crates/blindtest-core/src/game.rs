//! The guessing game state machine.
//!
//! [`Game`] owns the round history, the scoreboard and the player
//! directory. It is synchronous and never sleeps: when a guess opens a
//! target's acceptance window, the returned [`GuessOutcome`] lists the
//! [`TimerKey`]s the caller must schedule, and the caller later calls
//! [`Game::fire_window`] to emit the batched announcement. Keys from an
//! older epoch or a closed round are ignored, so no event ever refers to
//! a round that has already been reported finished.
//!
//! # Lifecycle
//!
//! ```text
//! start -> start_round -> submit_guess* -> finish_round -> start_round ...
//! ```
//!
//! Only the most recently started round can be active. Starting a round
//! while another is active finishes the old one first.

use std::collections::BTreeMap;

use blindtest_types::{
    ArtistGuessed, GameEvent, PlaybackWindow, PlayerId, RoundOver, RoundStart, Scoreboard,
    Standing, Target, TitleGuessed,
};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, GameConfig};
use crate::round::{Round, TargetVerdict};
use crate::sink::EventSink;
use crate::timer::TimerKey;

/// Errors returned by game operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The operation requires a started game.
    #[error("game is not started")]
    NotStarted,

    /// A round was started without any artist.
    #[error("round {round_number} has no artists")]
    NoArtists {
        /// The rejected round number.
        round_number: u32,
    },

    /// The configuration passed to `start` is invalid.
    #[error("invalid game config: {source}")]
    InvalidConfig {
        /// The underlying validation error.
        #[from]
        source: ConfigError,
    },
}

/// Effect of one guess submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuessOutcome {
    /// The guess was evaluated (game started and a round active).
    pub evaluated: bool,
    /// Points awarded to the guesser by this guess.
    pub points_awarded: u32,
    /// Acceptance windows opened by this guess; schedule one timer each.
    pub opened: Vec<TimerKey>,
    /// Title and every artist have now been answered at least once.
    pub round_complete: bool,
}

/// One game session's state.
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    started: bool,
    epoch: u64,
    scoreboard: Scoreboard,
    players: BTreeMap<PlayerId, String>,
    rounds: Vec<Round>,
    current: Option<usize>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Create a game that has not been started, with default rules.
    pub fn new() -> Self {
        Self {
            config: GameConfig::default(),
            started: false,
            epoch: 0,
            scoreboard: Scoreboard::new(),
            players: BTreeMap::new(),
            rounds: Vec::new(),
            current: None,
        }
    }

    /// Start (or restart) the game with the given rules.
    ///
    /// Clears the scoreboard, player directory and round history. Any
    /// announcement still owed by a previous game is invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the rules fail validation;
    /// the game is left untouched in that case.
    pub fn start(&mut self, config: GameConfig) -> Result<(), GameError> {
        config.validate()?;
        self.config = config;
        self.started = true;
        self.epoch = self.epoch.saturating_add(1);
        self.scoreboard.clear();
        self.players.clear();
        self.rounds.clear();
        self.current = None;
        info!(
            epoch = self.epoch,
            rounds = self.config.rounds,
            threshold = self.config.guess_likeness_threshold,
            window_ms = self.config.guess_acceptance_window_ms,
            "game started"
        );
        Ok(())
    }

    /// Mark the game inactive. Scores and history stay readable.
    pub fn stop(&mut self) {
        if self.started {
            info!(epoch = self.epoch, rounds_played = self.rounds.len(), "game stopped");
        }
        self.started = false;
    }

    /// Whether the game accepts rounds and guesses.
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Current rules.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current epoch (incremented by each `start`).
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Cumulative scores.
    pub const fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Last display name seen for each player.
    pub const fn players(&self) -> &BTreeMap<PlayerId, String> {
        &self.players
    }

    /// Every round started since the last `start`, oldest first.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// The most recently started round, active or not.
    pub fn current_round(&self) -> Option<&Round> {
        self.current.and_then(|i| self.rounds.get(i))
    }

    /// The excerpt of a track of `total_seconds` to play.
    ///
    /// Starts at `floor(total * songStartPercent)` and lasts
    /// `songDuration` seconds, clamped to the end of the track.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn playback_window(&self, total_seconds: u64) -> PlaybackWindow {
        let start = (total_seconds as f64 * self.config.song_start_percent).floor();
        let start_second = (start.max(0.0) as u64).min(total_seconds);
        let end_second = start_second
            .saturating_add(self.config.song_duration)
            .min(total_seconds);
        PlaybackWindow {
            start_second,
            end_second,
        }
    }

    /// Start a new round and emit [`GameEvent::RoundStart`].
    ///
    /// If a round is still active it is finished first (its `RoundOver`
    /// is emitted before the new `RoundStart`); the announcement keys it
    /// dropped are returned so the caller can cancel their timers.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotStarted`] if the game is not started, or
    /// [`GameError::NoArtists`] if `artists` is empty.
    pub fn start_round(
        &mut self,
        round_number: u32,
        title: impl Into<String>,
        artists: Vec<String>,
        sink: &mut dyn EventSink,
    ) -> Result<Vec<TimerKey>, GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if artists.is_empty() {
            return Err(GameError::NoArtists { round_number });
        }

        let active = self
            .current_round()
            .filter(|round| round.is_active())
            .map(Round::number);
        let superseded = if let Some(previous) = active {
            warn!(
                previous,
                next = round_number,
                "starting a round while another is active, finishing it first"
            );
            self.finish_round(sink).unwrap_or_default()
        } else {
            Vec::new()
        };

        let round = Round::new(round_number, title.into(), artists);
        let event = GameEvent::RoundStart(RoundStart {
            round_number,
            title: round.title().to_owned(),
            artists: round.artists().to_vec(),
        });
        self.rounds.push(round);
        self.current = Some(self.rounds.len().saturating_sub(1));

        info!(round_number, epoch = self.epoch, "round started");
        sink.emit(event);
        Ok(superseded)
    }

    /// Finish the active round and emit [`GameEvent::RoundOver`].
    ///
    /// Returns `None` (and emits nothing) if there is no active round.
    /// Otherwise returns the keys of announcements that were still
    /// pending; they will never fire and their timers can be cancelled.
    pub fn finish_round(&mut self, sink: &mut dyn EventSink) -> Option<Vec<TimerKey>> {
        let index = self.current?;
        let epoch = self.epoch;
        let round = self.rounds.get_mut(index)?;
        if !round.is_active() {
            return None;
        }

        let dropped = round.close();
        let event = GameEvent::RoundOver(RoundOver {
            round_number: round.number(),
            title: round.title().to_owned(),
            artists: round.artists().to_vec(),
            scoreboard: self.scoreboard.clone(),
            new_points_this_round: round.new_points().clone(),
        });

        info!(
            round_number = round.number(),
            scorers = round.new_points().len(),
            cancelled_announcements = dropped.len(),
            "round finished"
        );
        sink.emit(event);

        Some(
            dropped
                .into_iter()
                .map(|target| TimerKey {
                    epoch,
                    round_index: index,
                    target,
                })
                .collect(),
        )
    }

    /// Evaluate one chat message as a guess.
    ///
    /// Ignored (no side effects, `evaluated == false`) unless the game is
    /// started and a round is active. Otherwise records the player's
    /// display name and scores the text against the title and every
    /// artist independently.
    pub fn submit_guess(
        &mut self,
        player: &PlayerId,
        player_name: &str,
        text: &str,
        timestamp: i64,
    ) -> GuessOutcome {
        if !self.started {
            return GuessOutcome::default();
        }
        let Some(index) = self.current else {
            return GuessOutcome::default();
        };
        let epoch = self.epoch;
        let window_ms = i64::try_from(self.config.guess_acceptance_window_ms).unwrap_or(i64::MAX);
        let threshold = self.config.guess_likeness_threshold;
        let Some(round) = self.rounds.get_mut(index) else {
            return GuessOutcome::default();
        };
        if !round.is_active() {
            return GuessOutcome::default();
        }

        self.players.insert(player.clone(), player_name.to_owned());

        let mut outcome = GuessOutcome {
            evaluated: true,
            ..GuessOutcome::default()
        };
        for target in round.targets() {
            let verdict = round.evaluate(target, player, text, timestamp, window_ms, threshold);
            if let TargetVerdict::Credited {
                points,
                opened_window,
            } = verdict
            {
                if opened_window {
                    outcome.opened.push(TimerKey {
                        epoch,
                        round_index: index,
                        target,
                    });
                }
                let score = self.scoreboard.entry(player.clone()).or_insert(0);
                *score = score.saturating_add(points);
                outcome.points_awarded = outcome.points_awarded.saturating_add(points);
                debug!(
                    round_number = round.number(),
                    player = %player,
                    %target,
                    points,
                    first = opened_window,
                    "guess credited"
                );
            }
        }
        outcome.round_complete = round.is_complete();
        outcome
    }

    /// Emit the batched announcement for `key` if it is still owed.
    ///
    /// Returns `false` without emitting if the key belongs to an older
    /// epoch, the round is closed, or the announcement already fired.
    pub fn fire_window(&mut self, key: TimerKey, sink: &mut dyn EventSink) -> bool {
        if key.epoch != self.epoch {
            return false;
        }
        let Some(round) = self.rounds.get_mut(key.round_index) else {
            return false;
        };
        if !round.take_announcement(key.target) {
            return false;
        }

        let scorers: Vec<String> = round
            .state(key.target)
            .map(|state| {
                state
                    .scorers()
                    .iter()
                    .map(|id| self.players.get(id).cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let text = round.target_text(key.target).unwrap_or_default().to_owned();

        let event = match key.target {
            Target::Title => GameEvent::TitleGuessed(TitleGuessed {
                round_number: round.number(),
                title: text,
                scorers,
            }),
            Target::Artist(artist_index) => GameEvent::ArtistGuessed(ArtistGuessed {
                round_number: round.number(),
                artist_index,
                artist: text,
                scorers,
            }),
        };
        debug!(round_number = round.number(), target = %key.target, "acceptance window closed");
        sink.emit(event);
        true
    }

    /// Standings sorted by score (highest first), then by player id.
    pub fn leaderboard(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .scoreboard
            .iter()
            .map(|(id, &score)| Standing {
                player_id: id.clone(),
                name: self.players.get(id).cloned().unwrap_or_default(),
                score,
            })
            .collect();
        standings.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        standings
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn started() -> Game {
        let mut game = Game::new();
        game.start(GameConfig::default()).unwrap();
        game
    }

    fn queen_round(game: &mut Game, events: &mut Vec<GameEvent>) {
        game.start_round(
            1,
            "Bohemian Rhapsody (Remastered 2011)",
            vec![String::from("Queen")],
            events,
        )
        .unwrap();
    }

    #[test]
    fn playback_window_examples() {
        let game = started();
        assert_eq!(
            game.playback_window(200),
            PlaybackWindow {
                start_second: 40,
                end_second: 60
            }
        );
        assert_eq!(
            game.playback_window(5),
            PlaybackWindow {
                start_second: 1,
                end_second: 5
            }
        );
        assert_eq!(
            game.playback_window(0),
            PlaybackWindow {
                start_second: 0,
                end_second: 0
            }
        );
    }

    #[test]
    fn start_round_requires_started_game() {
        let mut game = Game::new();
        let mut events: Vec<GameEvent> = Vec::new();
        let err = game.start_round(1, "T", vec![String::from("A")], &mut events);
        assert!(matches!(err, Err(GameError::NotStarted)));
        assert!(events.is_empty());
    }

    #[test]
    fn start_round_rejects_empty_artists() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        let err = game.start_round(4, "T", Vec::new(), &mut events);
        assert!(matches!(err, Err(GameError::NoArtists { round_number: 4 })));
        assert!(game.rounds().is_empty());
    }

    #[test]
    fn start_rejects_invalid_config() {
        let mut game = Game::new();
        let config = GameConfig {
            guess_likeness_threshold: 2.0,
            ..GameConfig::default()
        };
        assert!(matches!(game.start(config), Err(GameError::InvalidConfig { .. })));
        assert!(!game.is_started());
    }

    #[test]
    fn round_start_event_is_emitted() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        assert_eq!(
            events,
            vec![GameEvent::RoundStart(RoundStart {
                round_number: 1,
                title: String::from("Bohemian Rhapsody (Remastered 2011)"),
                artists: vec![String::from("Queen")],
            })]
        );
    }

    #[test]
    fn title_then_artist_completes_round() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        let p = PlayerId::from("p1");

        let first = game.submit_guess(&p, "Ann", "bohemian rhapsody", 0);
        assert!(first.evaluated);
        assert_eq!(first.points_awarded, 2);
        assert!(!first.round_complete);
        assert_eq!(first.opened.len(), 1);
        assert_eq!(game.scoreboard().get(&p), Some(&2));

        let second = game.submit_guess(&p, "Ann", "Queen", 10);
        assert_eq!(second.points_awarded, 2);
        assert!(second.round_complete);
        assert_eq!(game.scoreboard().get(&p), Some(&4));
    }

    #[test]
    fn repeated_correct_guesses_score_once() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        let p = PlayerId::from("p1");
        for t in 0..5 {
            game.submit_guess(&p, "Ann", "bohemian rhapsody", t * 100);
        }
        assert_eq!(game.scoreboard().get(&p), Some(&2));
    }

    #[test]
    fn guess_without_active_round_is_ignored() {
        let mut game = started();
        let p = PlayerId::from("p1");
        let outcome = game.submit_guess(&p, "Ann", "anything", 0);
        assert_eq!(outcome, GuessOutcome::default());
        assert!(game.players().is_empty());

        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        game.finish_round(&mut events);
        let outcome = game.submit_guess(&p, "Ann", "bohemian rhapsody", 0);
        assert!(!outcome.evaluated);
        assert!(game.scoreboard().is_empty());
    }

    #[test]
    fn guess_on_stopped_game_is_ignored() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        game.stop();
        let outcome = game.submit_guess(&PlayerId::from("p"), "P", "bohemian rhapsody", 0);
        assert!(!outcome.evaluated);
    }

    #[test]
    fn last_seen_name_wins() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        let p = PlayerId::from("p1");
        game.submit_guess(&p, "Ann", "nope", 0);
        game.submit_guess(&p, "Annie", "nope", 1);
        assert_eq!(game.players().get(&p).map(String::as_str), Some("Annie"));
    }

    #[test]
    fn fire_window_lists_scorers_in_order() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        let first = game.submit_guess(&PlayerId::from("a"), "Ann", "bohemian rhapsody", 0);
        game.submit_guess(&PlayerId::from("b"), "Bob", "Bohemian Rhapsody", 900);
        events.clear();

        let key = first.opened.first().copied().unwrap();
        assert!(game.fire_window(key, &mut events));
        assert_eq!(
            events,
            vec![GameEvent::TitleGuessed(TitleGuessed {
                round_number: 1,
                title: String::from("Bohemian Rhapsody (Remastered 2011)"),
                scorers: vec![String::from("Ann"), String::from("Bob")],
            })]
        );
        assert!(!game.fire_window(key, &mut events));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn fire_window_after_finish_is_silent() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        let outcome = game.submit_guess(&PlayerId::from("a"), "Ann", "Queen", 0);
        let key = outcome.opened.first().copied().unwrap();
        assert_eq!(key.target, Target::Artist(0));

        let dropped = game.finish_round(&mut events).unwrap();
        assert_eq!(dropped, vec![key]);
        events.clear();
        assert!(!game.fire_window(key, &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn fire_window_from_previous_epoch_is_silent() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        let outcome = game.submit_guess(&PlayerId::from("a"), "Ann", "Queen", 0);
        let key = outcome.opened.first().copied().unwrap();

        game.start(GameConfig::default()).unwrap();
        queen_round(&mut game, &mut events);
        game.submit_guess(&PlayerId::from("a"), "Ann", "Queen", 0);
        events.clear();
        assert!(!game.fire_window(key, &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn finish_round_emits_once_with_round_delta() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        game.submit_guess(&PlayerId::from("a"), "Ann", "bohemian rhapsody", 0);
        game.finish_round(&mut events);

        game.start_round(2, "Under Pressure", vec![String::from("Queen")], &mut events)
            .unwrap();
        game.submit_guess(&PlayerId::from("b"), "Bob", "Queen", 0);
        events.clear();

        assert!(game.finish_round(&mut events).is_some());
        assert!(game.finish_round(&mut events).is_none());
        assert_eq!(events.len(), 1);

        let Some(GameEvent::RoundOver(over)) = events.first() else {
            panic!("expected RoundOver, got {events:?}");
        };
        assert_eq!(over.round_number, 2);
        assert_eq!(over.scoreboard.get(&PlayerId::from("a")), Some(&2));
        assert_eq!(over.scoreboard.get(&PlayerId::from("b")), Some(&2));
        assert_eq!(over.new_points_this_round.len(), 1);
        assert_eq!(over.new_points_this_round.get(&PlayerId::from("b")), Some(&2));
    }

    #[test]
    fn finish_round_without_round_is_noop() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        assert!(game.finish_round(&mut events).is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn starting_a_round_supersedes_the_active_one() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        game.submit_guess(&PlayerId::from("a"), "Ann", "bohemian rhapsody", 0);
        events.clear();

        let superseded = game
            .start_round(2, "Under Pressure", vec![String::from("Queen")], &mut events)
            .unwrap();
        assert_eq!(superseded.len(), 1);
        assert!(matches!(events.first(), Some(GameEvent::RoundOver(o)) if o.round_number == 1));
        assert!(matches!(events.get(1), Some(GameEvent::RoundStart(s)) if s.round_number == 2));
        assert_eq!(game.current_round().map(Round::number), Some(2));
        assert_eq!(game.rounds().len(), 2);
    }

    #[test]
    fn stop_keeps_scores_and_start_clears_them() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        queen_round(&mut game, &mut events);
        game.submit_guess(&PlayerId::from("a"), "Ann", "bohemian rhapsody", 0);
        game.stop();
        assert_eq!(game.scoreboard().len(), 1);
        assert_eq!(game.rounds().len(), 1);

        game.start(GameConfig::default()).unwrap();
        assert!(game.scoreboard().is_empty());
        assert!(game.rounds().is_empty());
        assert!(game.current_round().is_none());
    }

    #[test]
    fn featured_artists_and_leaderboard() {
        let mut game = started();
        let mut events: Vec<GameEvent> = Vec::new();
        game.start_round(
            1,
            "Under Pressure",
            vec![String::from("Queen"), String::from("David Bowie")],
            &mut events,
        )
        .unwrap();
        game.submit_guess(&PlayerId::from("a"), "Ann", "david bowie", 0);
        game.submit_guess(&PlayerId::from("b"), "Bob", "under pressure", 0);
        game.submit_guess(&PlayerId::from("c"), "Cid", "queen", 0);

        let board = game.leaderboard();
        let rows: Vec<(&str, u32)> = board.iter().map(|s| (s.name.as_str(), s.score)).collect();
        assert_eq!(rows, vec![("Bob", 2), ("Cid", 2), ("Ann", 1)]);
    }
}
