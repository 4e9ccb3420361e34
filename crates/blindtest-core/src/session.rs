//! Thread-safe game session with real acceptance-window timers.
//!
//! [`Session`] wraps a [`Game`], its [`TimerSet`] and its [`EventSink`]
//! behind one mutex. Every inbound call holds the lock for its whole
//! duration, so guesses and round lifecycle calls never interleave for
//! the same session. Timer tasks take the same lock when they fire and
//! only hold a weak reference, so dropping the session drops its state.

use std::sync::{Arc, Weak};
use std::time::Duration;

use blindtest_types::{PlaybackWindow, PlayerId, Scoreboard, SessionId, Standing};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::GameConfig;
use crate::game::{Game, GameError};
use crate::sink::{EventReceiver, EventSink, event_channel};
use crate::timer::{TimerKey, TimerSet};

struct SessionState {
    game: Game,
    timers: TimerSet,
    sink: Box<dyn EventSink>,
}

/// One game session (e.g. one guild's voice channel).
pub struct Session {
    id: SessionId,
    state: Arc<Mutex<SessionState>>,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session (not yet started) emitting into `sink`.
    pub fn new(id: SessionId, sink: impl EventSink + 'static) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(SessionState {
                game: Game::new(),
                timers: TimerSet::new(),
                sink: Box::new(sink),
            })),
        }
    }

    /// Create a session emitting into a fresh channel; returns the receiver.
    pub fn with_channel(id: SessionId) -> (Self, EventReceiver) {
        let (tx, rx) = event_channel();
        (Self::new(id, tx), rx)
    }

    /// Session key.
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Start or restart the game, discarding previous rounds and scores.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if `config` fails validation.
    pub async fn start(&self, config: GameConfig) -> Result<(), GameError> {
        let mut state = self.state.lock().await;
        state.game.start(config)?;
        let cancelled = state.timers.cancel_all();
        debug!(session = %self.id, cancelled, "session started");
        Ok(())
    }

    /// Mark the game inactive; scores stay readable.
    pub async fn stop(&self) {
        self.state.lock().await.game.stop();
    }

    /// Whether the game is started.
    pub async fn is_started(&self) -> bool {
        self.state.lock().await.game.is_started()
    }

    /// Current rules.
    pub async fn config(&self) -> GameConfig {
        self.state.lock().await.game.config().clone()
    }

    /// Excerpt of a track of `total_seconds` to stream.
    pub async fn playback_window(&self, total_seconds: u64) -> PlaybackWindow {
        self.state.lock().await.game.playback_window(total_seconds)
    }

    /// Start a round; emits `roundStart`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotStarted`] or [`GameError::NoArtists`].
    pub async fn start_round(
        &self,
        round_number: u32,
        title: impl Into<String>,
        artists: Vec<String>,
    ) -> Result<(), GameError> {
        let mut guard = self.state.lock().await;
        let SessionState { game, timers, sink } = &mut *guard;
        let superseded = game.start_round(round_number, title, artists, sink.as_mut())?;
        for key in superseded {
            timers.cancel(key);
        }
        Ok(())
    }

    /// Finish the active round, cancelling its pending announcements, and
    /// emit `roundOver`. Returns `false` if there was nothing to finish.
    pub async fn finish_round(&self) -> bool {
        let mut guard = self.state.lock().await;
        let SessionState { game, timers, sink } = &mut *guard;
        let Some(dropped) = game.finish_round(sink.as_mut()) else {
            return false;
        };
        for key in dropped {
            timers.cancel(key);
        }
        true
    }

    /// Submit one chat message as a guess.
    ///
    /// Returns `true` once the title and every artist of the active round
    /// have been answered. Messages arriving with no active round are
    /// ignored and return `false`.
    pub async fn submit_guess(
        &self,
        player: &PlayerId,
        player_name: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> bool {
        let mut guard = self.state.lock().await;
        let SessionState { game, timers, .. } = &mut *guard;
        let outcome = game.submit_guess(player, player_name, text, timestamp_ms);
        let delay = Duration::from_millis(game.config().guess_acceptance_window_ms);
        for key in outcome.opened {
            schedule_announcement(timers, Arc::downgrade(&self.state), key, delay);
        }
        outcome.round_complete
    }

    /// Cumulative scores.
    pub async fn scoreboard(&self) -> Scoreboard {
        self.state.lock().await.game.scoreboard().clone()
    }

    /// Standings, highest score first.
    pub async fn leaderboard(&self) -> Vec<Standing> {
        self.state.lock().await.game.leaderboard()
    }

    /// Number of announcements still waiting on their window.
    pub async fn pending_announcements(&self) -> usize {
        self.state.lock().await.timers.len()
    }
}

fn schedule_announcement(
    timers: &mut TimerSet,
    state: Weak<Mutex<SessionState>>,
    key: TimerKey,
    delay: Duration,
) {
    timers.schedule(key, delay, async move {
        let Some(state) = state.upgrade() else {
            return;
        };
        let mut guard = state.lock().await;
        let SessionState { game, timers, sink } = &mut *guard;
        timers.complete(key);
        game.fire_window(key, sink.as_mut());
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use blindtest_types::GameEvent;

    use super::*;

    async fn started_session() -> (Session, EventReceiver) {
        let (session, rx) = Session::with_channel(SessionId::from("guild"));
        session.start(GameConfig::default()).await.unwrap();
        (session, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn announcement_fires_after_window() {
        let (session, mut rx) = started_session().await;
        session
            .start_round(1, "Under Pressure", vec![String::from("Queen")])
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(GameEvent::RoundStart(_))));

        session
            .submit_guess(&PlayerId::from("a"), "Ann", "under pressure", 0)
            .await;
        assert_eq!(session.pending_announcements().await, 1);

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(rx.try_recv().is_err());

        let event = rx.recv().await.unwrap();
        let GameEvent::TitleGuessed(guessed) = event else {
            panic!("expected TitleGuessed, got {event:?}");
        };
        assert_eq!(guessed.scorers, vec![String::from("Ann")]);
        assert_eq!(session.pending_announcements().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_round_cancels_pending_announcements() {
        let (session, mut rx) = started_session().await;
        session
            .start_round(1, "Under Pressure", vec![String::from("Queen")])
            .await
            .unwrap();
        session
            .submit_guess(&PlayerId::from("a"), "Ann", "Queen", 0)
            .await;
        assert!(session.finish_round().await);
        assert!(!session.finish_round().await);
        assert_eq!(session.pending_announcements().await, 0);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert!(matches!(events.get(1), Some(GameEvent::RoundOver(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_timers() {
        let (session, _rx) = started_session().await;
        session
            .start_round(1, "Under Pressure", vec![String::from("Queen")])
            .await
            .unwrap();
        session
            .submit_guess(&PlayerId::from("a"), "Ann", "under pressure", 0)
            .await;
        session.start(GameConfig::default()).await.unwrap();
        assert_eq!(session.pending_announcements().await, 0);
        assert!(session.scoreboard().await.is_empty());
    }

    #[tokio::test]
    async fn start_round_errors_propagate() {
        let (session, _rx) = Session::with_channel(SessionId::from("guild"));
        let err = session.start_round(1, "T", vec![String::from("A")]).await;
        assert!(matches!(err, Err(GameError::NotStarted)));

        session.start(GameConfig::default()).await.unwrap();
        let err = session.start_round(1, "T", Vec::new()).await;
        assert!(matches!(err, Err(GameError::NoArtists { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_round_timers_are_cancelled() {
        let (session, mut rx) = started_session().await;
        session
            .start_round(1, "Under Pressure", vec![String::from("Queen")])
            .await
            .unwrap();
        session
            .submit_guess(&PlayerId::from("a"), "Ann", "under pressure", 0)
            .await;
        session
            .start_round(2, "Radio Ga Ga", vec![String::from("Queen")])
            .await
            .unwrap();
        assert_eq!(session.pending_announcements().await, 0);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event {
                GameEvent::RoundStart(e) => ("start", e.round_number),
                GameEvent::RoundOver(e) => ("over", e.round_number),
                GameEvent::TitleGuessed(e) => ("title", e.round_number),
                GameEvent::ArtistGuessed(e) => ("artist", e.round_number),
            });
        }
        assert_eq!(kinds, vec![("start", 1), ("over", 1), ("start", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn each_target_gets_its_own_timer() {
        let (session, _rx) = started_session().await;
        session
            .start_round(
                1,
                "Under Pressure",
                vec![String::from("Queen"), String::from("David Bowie")],
            )
            .await
            .unwrap();
        session
            .submit_guess(&PlayerId::from("a"), "Ann", "Queen", 0)
            .await;
        session
            .submit_guess(&PlayerId::from("b"), "Bob", "david bowie", 10)
            .await;
        assert_eq!(session.pending_announcements().await, 2);
    }
}
