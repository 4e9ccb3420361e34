//! Per-round guessing state.
//!
//! A round has one title target and one target per credited artist. Each
//! target remembers when it was first answered correctly, who has been
//! credited for it (in crediting order), and whether its batched
//! announcement is still waiting on the acceptance window.
//!
//! Scorer lists only grow while the round is open, and a player appears
//! at most once per target.

use blindtest_types::{PlayerId, Scoreboard, Target};

use crate::matching::NormalizedTargets;

/// Lifecycle of a round. There is no paused state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    /// Accepting guesses.
    Active,
    /// Finished. Terminal.
    Closed,
}

/// Guessing state for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetState {
    first_correct_at: Option<i64>,
    scorers: Vec<PlayerId>,
    announcement_pending: bool,
}

impl TargetState {
    /// Timestamp (ms) of the first correct guess, if any.
    pub const fn first_correct_at(&self) -> Option<i64> {
        self.first_correct_at
    }

    /// Players credited for this target, in crediting order.
    pub fn scorers(&self) -> &[PlayerId] {
        &self.scorers
    }

    /// Whether the batched announcement has not fired or been cancelled yet.
    pub const fn announcement_pending(&self) -> bool {
        self.announcement_pending
    }

    /// Whether a correct guess stamped `timestamp` may still score.
    ///
    /// Unanswered targets always accept. Answered targets accept while
    /// `timestamp` is within `window_ms` of the first correct guess.
    pub const fn accepts_at(&self, timestamp: i64, window_ms: i64) -> bool {
        match self.first_correct_at {
            None => true,
            Some(first) => timestamp.saturating_sub(first) <= window_ms,
        }
    }
}

/// Result of scoring one guess against one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetVerdict {
    /// The guess does not match, or the target no longer accepts guesses.
    Miss,
    /// The guess matches but the player was already credited.
    AlreadyCredited,
    /// The player was credited for the first time.
    Credited {
        /// Points awarded.
        points: u32,
        /// This was the first correct guess for the target; the caller
        /// must schedule its announcement.
        opened_window: bool,
    },
}

/// A single round: one track, one title, one or more artists.
#[derive(Debug, Clone)]
pub struct Round {
    number: u32,
    title: String,
    artists: Vec<String>,
    normalized: NormalizedTargets,
    title_state: TargetState,
    artist_states: Vec<TargetState>,
    new_points: Scoreboard,
    status: RoundStatus,
}

impl Round {
    /// Create an active round. `artists` must be non-empty; the game
    /// checks this before constructing.
    pub fn new(number: u32, title: String, artists: Vec<String>) -> Self {
        let normalized = NormalizedTargets::new(&title, &artists);
        let artist_states = vec![TargetState::default(); artists.len()];
        Self {
            number,
            title,
            artists,
            normalized,
            title_state: TargetState::default(),
            artist_states,
            new_points: Scoreboard::new(),
            status: RoundStatus::Active,
        }
    }

    /// Caller-assigned round number.
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Track title as given at round start.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Track artists as given at round start.
    pub fn artists(&self) -> &[String] {
        &self.artists
    }

    /// Current lifecycle status.
    pub const fn status(&self) -> RoundStatus {
        self.status
    }

    /// Whether the round still accepts guesses.
    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }

    /// Points earned during this round, per player.
    pub const fn new_points(&self) -> &Scoreboard {
        &self.new_points
    }

    /// All targets of the round: the title, then each artist in order.
    pub fn targets(&self) -> Vec<Target> {
        std::iter::once(Target::Title)
            .chain((0..self.artists.len()).map(Target::Artist))
            .collect()
    }

    /// State of one target.
    pub fn state(&self, target: Target) -> Option<&TargetState> {
        match target {
            Target::Title => Some(&self.title_state),
            Target::Artist(i) => self.artist_states.get(i),
        }
    }

    fn state_mut(&mut self, target: Target) -> Option<&mut TargetState> {
        match target {
            Target::Title => Some(&mut self.title_state),
            Target::Artist(i) => self.artist_states.get_mut(i),
        }
    }

    /// Display text of a target (the title or the artist name).
    pub fn target_text(&self, target: Target) -> Option<&str> {
        match target {
            Target::Title => Some(self.title.as_str()),
            Target::Artist(i) => self.artists.get(i).map(String::as_str),
        }
    }

    /// Score `guess` from `player` against one target.
    pub fn evaluate(
        &mut self,
        target: Target,
        player: &PlayerId,
        guess: &str,
        timestamp: i64,
        window_ms: i64,
        threshold: f64,
    ) -> TargetVerdict {
        let matches = match target {
            Target::Title => self.normalized.title_matches(guess, threshold),
            Target::Artist(i) => self.normalized.artist_matches(i, guess, threshold),
        };
        let Some(state) = self.state_mut(target) else {
            return TargetVerdict::Miss;
        };
        if !state.accepts_at(timestamp, window_ms) || !matches {
            return TargetVerdict::Miss;
        }

        let opened_window = state.first_correct_at.is_none();
        if opened_window {
            state.first_correct_at = Some(timestamp);
            state.announcement_pending = true;
        }

        if state.scorers.contains(player) {
            return TargetVerdict::AlreadyCredited;
        }
        state.scorers.push(player.clone());

        let points = target.points();
        let entry = self.new_points.entry(player.clone()).or_insert(0);
        *entry = entry.saturating_add(points);

        TargetVerdict::Credited {
            points,
            opened_window,
        }
    }

    /// Whether the title and every artist have been answered at least once.
    pub fn is_complete(&self) -> bool {
        self.title_state.first_correct_at.is_some()
            && self
                .artist_states
                .iter()
                .all(|s| s.first_correct_at.is_some())
    }

    /// Consume the pending announcement for `target`.
    ///
    /// Returns `false` if the round is closed or nothing is pending, so
    /// an announcement fires at most once.
    pub fn take_announcement(&mut self, target: Target) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state_mut(target)
            .is_some_and(|s| std::mem::take(&mut s.announcement_pending))
    }

    /// Close the round and drop any pending announcements.
    ///
    /// Returns the targets whose announcements were dropped.
    pub fn close(&mut self) -> Vec<Target> {
        self.status = RoundStatus::Closed;
        let mut dropped = Vec::new();
        for target in self.targets() {
            if let Some(state) = self.state_mut(target) {
                if std::mem::take(&mut state.announcement_pending) {
                    dropped.push(target);
                }
            }
        }
        dropped
    }
}
