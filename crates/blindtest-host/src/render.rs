//! Chat text for engine events and standings.

use blindtest_types::{GameEvent, Scoreboard, Standing};

/// Render one event as a chat line. `roundStart` never reveals the track.
pub fn event(event: &GameEvent) -> String {
    match event {
        GameEvent::RoundStart(e) => format!(
            "Round {}: guess the title and the {} artist(s)!",
            e.round_number,
            e.artists.len()
        ),
        GameEvent::TitleGuessed(e) => {
            format!("Title \"{}\" found by {}", e.title, e.scorers.join(", "))
        }
        GameEvent::ArtistGuessed(e) => {
            format!("Artist \"{}\" found by {}", e.artist, e.scorers.join(", "))
        }
        GameEvent::RoundOver(e) => {
            let mut line = format!(
                "Round {} over! It was \"{}\" by {}.",
                e.round_number,
                e.title,
                e.artists.join(", ")
            );
            line.push_str(&round_points(&e.new_points_this_round));
            line
        }
    }
}

fn round_points(points: &Scoreboard) -> String {
    if points.is_empty() {
        return String::from(" Nobody scored.");
    }
    let parts: Vec<String> = points
        .iter()
        .map(|(player, pts)| format!("{player} +{pts}"))
        .collect();
    format!(" Points: {}", parts.join(", "))
}

/// Render standings as a numbered list under `heading`.
pub fn leaderboard(heading: &str, standings: &[Standing]) -> String {
    if standings.is_empty() {
        return format!("{heading}: no points yet");
    }
    let mut out = format!("{heading}:");
    for (rank, row) in (1_usize..).zip(standings) {
        out.push_str(&format!("\n{rank}. {} ({} pts)", row.name, row.score));
    }
    out
}
