//! The game loop: feeds tracks to the session, forwards chat as guesses,
//! ends rounds and relays engine events back to chat.
//!
//! A round ends in one of three ways:
//!
//! 1. Everything was guessed and every pending announcement has fired.
//! 2. The excerpt finished playing.
//! 3. The chat channel closed, which also ends the game.

use std::sync::Arc;
use std::time::Duration;

use blindtest_core::config::GameConfig;
use blindtest_core::session::Session;
use blindtest_core::sink::EventReceiver;
use blindtest_types::{GameEvent, Standing};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::collaborators::{ChatMessage, ChatTransport, PlaybackController, TrackSource};
use crate::error::HostError;
use crate::render;

/// Result of a completed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    /// Rounds that were started and finished.
    pub rounds_played: u32,
    /// Final standings, highest score first.
    pub standings: Vec<Standing>,
}

/// How a round came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundEnd {
    AllGuessed,
    ExcerptEnded,
    ChatClosed,
}

/// Drives one [`Session`] with the given collaborators.
pub struct Orchestrator<S, P, C> {
    session: Arc<Session>,
    events: EventReceiver,
    tracks: S,
    playback: P,
    chat: C,
    between_rounds: Duration,
}

impl<S, P, C> Orchestrator<S, P, C>
where
    S: TrackSource,
    P: PlaybackController,
    C: ChatTransport,
{
    /// Wire a session and the receiver of its events to the collaborators.
    pub const fn new(
        session: Arc<Session>,
        events: EventReceiver,
        tracks: S,
        playback: P,
        chat: C,
        between_rounds: Duration,
    ) -> Self {
        Self {
            session,
            events,
            tracks,
            playback,
            chat,
            between_rounds,
        }
    }

    /// Play until the track source runs dry, `config.rounds` rounds have
    /// been played, or chat closes. The session is stopped on return.
    pub async fn run(&mut self, config: GameConfig) -> Result<GameSummary, HostError> {
        let rounds = config.rounds;
        self.session.start(config).await?;
        info!(session = %self.session.id(), rounds, "game started");

        let mut rounds_played: u32 = 0;
        let mut chat_open = true;
        while chat_open && rounds_played < rounds {
            let Some(track) = self.tracks.next_track().await? else {
                info!("playlist exhausted");
                break;
            };
            if track.artists.is_empty() {
                warn!(title = %track.title, "skipping track without artists");
                continue;
            }
            if rounds_played > 0 && !self.pause().await? {
                break;
            }

            let round_number = rounds_played.saturating_add(1);
            let excerpt = self.session.playback_window(track.duration_seconds).await;
            self.playback.play(&track, excerpt).await?;
            self.session
                .start_round(round_number, track.title.clone(), track.artist_names())
                .await?;

            let end = self.play_round().await?;
            self.session.finish_round().await;
            self.playback.stop().await?;
            self.relay_pending().await?;
            rounds_played = round_number;
            info!(round = round_number, ?end, "round finished");

            let standings = self.session.leaderboard().await;
            self.chat.send(&render::leaderboard("Scores", &standings)).await?;

            chat_open = end != RoundEnd::ChatClosed;
        }

        self.session.stop().await;
        let standings = self.session.leaderboard().await;
        self.chat
            .send(&render::leaderboard("Final standings", &standings))
            .await?;
        info!(session = %self.session.id(), rounds_played, "game over");
        Ok(GameSummary {
            rounds_played,
            standings,
        })
    }

    /// Forward chat to the active round until it ends.
    async fn play_round(&mut self) -> Result<RoundEnd, HostError> {
        let mut complete = false;
        loop {
            tokio::select! {
                () = self.playback.finished() => return Ok(RoundEnd::ExcerptEnded),
                Some(event) = self.events.recv() => {
                    self.relay(&event).await?;
                    if complete && self.session.pending_announcements().await == 0 {
                        return Ok(RoundEnd::AllGuessed);
                    }
                }
                message = self.chat.next_message() => {
                    let Some(message) = message? else {
                        return Ok(RoundEnd::ChatClosed);
                    };
                    if self.guess(&message).await && !complete {
                        complete = true;
                        debug!("everything guessed, waiting for announcements");
                        if self.session.pending_announcements().await == 0 {
                            return Ok(RoundEnd::AllGuessed);
                        }
                    }
                }
            }
        }
    }

    /// Sit out the gap between rounds. Chat arriving meanwhile reaches the
    /// session with no active round and is ignored. Returns `false` if chat
    /// closed.
    async fn pause(&mut self) -> Result<bool, HostError> {
        let until = Instant::now()
            .checked_add(self.between_rounds)
            .unwrap_or_else(Instant::now);
        loop {
            tokio::select! {
                () = sleep_until(until) => return Ok(true),
                Some(event) = self.events.recv() => self.relay(&event).await?,
                message = self.chat.next_message() => {
                    let Some(message) = message? else {
                        return Ok(false);
                    };
                    self.guess(&message).await;
                }
            }
        }
    }

    async fn guess(&self, message: &ChatMessage) -> bool {
        self.session
            .submit_guess(
                &message.player_id,
                &message.player_name,
                &message.text,
                message.timestamp_ms,
            )
            .await
    }

    async fn relay(&mut self, event: &GameEvent) -> Result<(), HostError> {
        debug!(round = event.round_number(), "relaying event");
        self.chat.send(&render::event(event)).await
    }

    async fn relay_pending(&mut self) -> Result<(), HostError> {
        while let Ok(event) = self.events.try_recv() {
            self.relay(&event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::VecDeque;

    use blindtest_core::sink::event_channel;
    use blindtest_types::{PlayerId, SessionId, Track, TrackArtist};

    use super::*;
    use crate::console::{PlaylistSource, SimulatedPlayback};

    /// Delivers each message at its scheduled offset from creation, then
    /// either closes or goes quiet.
    struct ScriptedChat {
        origin: Instant,
        script: VecDeque<(u64, &'static str, &'static str)>,
        close_when_done: bool,
        sent: Vec<String>,
    }

    impl ScriptedChat {
        fn new(script: &[(u64, &'static str, &'static str)], close_when_done: bool) -> Self {
            Self {
                origin: Instant::now(),
                script: script.iter().copied().collect(),
                close_when_done,
                sent: Vec::new(),
            }
        }
    }

    impl ChatTransport for ScriptedChat {
        async fn next_message(&mut self) -> Result<Option<ChatMessage>, HostError> {
            let Some(&(at_ms, name, text)) = self.script.front() else {
                if self.close_when_done {
                    return Ok(None);
                }
                return std::future::pending().await;
            };
            sleep_until(self.origin + Duration::from_millis(at_ms)).await;
            self.script.pop_front();
            Ok(Some(ChatMessage {
                player_id: PlayerId::new(name.to_lowercase()),
                player_name: name.to_owned(),
                text: text.to_owned(),
                timestamp_ms: i64::try_from(at_ms).unwrap(),
            }))
        }

        async fn send(&mut self, text: &str) -> Result<(), HostError> {
            self.sent.push(text.to_owned());
            Ok(())
        }
    }

    fn track(title: &str, artists: &[&str], seconds: u64) -> Track {
        Track {
            title: title.to_owned(),
            artists: artists
                .iter()
                .map(|name| TrackArtist {
                    name: (*name).to_owned(),
                })
                .collect(),
            duration_seconds: seconds,
        }
    }

    fn orchestrator(
        tracks: Vec<Track>,
        chat: ScriptedChat,
    ) -> Orchestrator<PlaylistSource, SimulatedPlayback, ScriptedChat> {
        let (tx, rx) = event_channel();
        let session = Arc::new(Session::new(SessionId::from("test"), tx));
        Orchestrator::new(
            session,
            rx,
            PlaylistSource::from_tracks(tracks),
            SimulatedPlayback::new(),
            chat,
            Duration::from_secs(3),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn round_ends_after_everything_is_guessed_and_announced() {
        let chat = ScriptedChat::new(
            &[(100, "Ann", "bohemian rhapsody"), (200, "Bob", "Queen")],
            false,
        );
        let mut host = orchestrator(vec![track("Bohemian Rhapsody", &["Queen"], 200)], chat);
        let started = Instant::now();

        let summary = host.run(GameConfig::default()).await.unwrap();

        assert_eq!(summary.rounds_played, 1);
        // Last announcement fires one window after Bob's guess, well
        // before the 20 s excerpt would end.
        assert!(started.elapsed() < Duration::from_secs(2));
        let sent = &host.chat.sent;
        assert_eq!(sent[0], "Round 1: guess the title and the 1 artist(s)!");
        assert_eq!(sent[1], "Title \"Bohemian Rhapsody\" found by Ann");
        assert_eq!(sent[2], "Artist \"Queen\" found by Bob");
        assert!(sent[3].starts_with("Round 1 over!"));
        assert_eq!(
            summary.standings.iter().map(|s| s.score).collect::<Vec<_>>(),
            vec![2, 2]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silent_rounds_end_with_the_excerpt() {
        let chat = ScriptedChat::new(&[], false);
        let tracks = vec![
            track("Wonderwall", &["Oasis"], 200),
            track("Creep", &["Radiohead"], 200),
        ];
        let mut host = orchestrator(tracks, chat);
        let started = Instant::now();

        let summary = host.run(GameConfig::default()).await.unwrap();

        assert_eq!(summary.rounds_played, 2);
        assert!(summary.standings.is_empty());
        // Two 20 s excerpts and one 3 s pause.
        assert_eq!(started.elapsed(), Duration::from_secs(43));
        let sent = &host.chat.sent;
        assert!(sent.iter().any(|line| line.contains("\"Creep\" by Radiohead. Nobody scored.")));
        assert_eq!(sent.last().unwrap(), "Final standings: no points yet");
    }

    #[tokio::test(start_paused = true)]
    async fn round_cap_limits_tracks_played() {
        let chat = ScriptedChat::new(&[], false);
        let tracks = vec![
            track("Wonderwall", &["Oasis"], 200),
            track("Creep", &["Radiohead"], 200),
        ];
        let mut host = orchestrator(tracks, chat);
        let config = GameConfig {
            rounds: 1,
            ..GameConfig::default()
        };

        let summary = host.run(config).await.unwrap();
        assert_eq!(summary.rounds_played, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_chat_ends_the_game() {
        let chat = ScriptedChat::new(&[(500, "Ann", "wonderwall")], true);
        let tracks = vec![
            track("Wonderwall", &["Oasis"], 200),
            track("Creep", &["Radiohead"], 200),
        ];
        let mut host = orchestrator(tracks, chat);

        let summary = host.run(GameConfig::default()).await.unwrap();

        assert_eq!(summary.rounds_played, 1);
        assert_eq!(summary.standings.len(), 1);
        assert_eq!(summary.standings[0].score, 2);
        // Title announcement was still pending when chat closed.
        let sent = &host.chat.sent;
        assert!(!sent.iter().any(|line| line.starts_with("Title")));
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_without_artists_are_skipped() {
        let chat = ScriptedChat::new(&[], false);
        let tracks = vec![track("Untitled", &[], 200), track("Creep", &["Radiohead"], 200)];
        let mut host = orchestrator(tracks, chat);

        let summary = host.run(GameConfig::default()).await.unwrap();

        assert_eq!(summary.rounds_played, 1);
        let sent = &host.chat.sent;
        assert!(sent.iter().any(|line| line.contains("\"Creep\"")));
    }
}
