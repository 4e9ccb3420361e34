//! Guess normalization and fuzzy matching.
//!
//! Titles and artists are normalized before comparison so that catalog
//! decorations ("(Remastered 2011)", "feat. X", "- Radio Edit") and
//! trivial punctuation do not count against a guess. Similarity is the
//! Levenshtein distance scaled by the longer string's length:
//!
//! ```text
//! similarity = 1 - levenshtein(a, b) / max(len(a), len(b))
//! ```
//!
//! Two empty strings are identical (similarity 1.0). Lengths are counted
//! in Unicode scalar values.

use std::sync::LazyLock;

use regex::Regex;

/// Compile a pattern that is a string literal in this module.
#[allow(clippy::expect_used)]
fn literal(pattern: &str) -> Regex {
    Regex::new(pattern).expect("literal pattern compiles")
}

static LEADING_THE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)^\s*the\s+"));
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| literal(r"\s*\([^)]*\)\s*"));
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| literal(r"\s*\[[^\]]*\]\s*"));
static FEATURING: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)feat\.?\s+[^\-+,&]+"));
static FT: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)ft\.?\s+[^\-+,&]+"));
static DASH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| literal(r"[—\-].*"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| literal(r"[\-+,_]"));

/// Normalize a track title (or a guess compared against one).
///
/// Drops a leading "the", parenthesized and bracketed segments, and
/// "feat."/"ft." credits; turns `&` into "and"; cuts everything from the
/// first dash on; turns remaining separators into spaces; trims and
/// lowercases.
pub fn normalize_title(title: &str) -> String {
    let s = LEADING_THE.replace(title, "");
    let s = PARENTHESIZED.replace_all(&s, "");
    let s = BRACKETED.replace_all(&s, "");
    let s = FEATURING.replace_all(&s, "");
    let s = FT.replace_all(&s, "");
    let s = s.replace('&', "and");
    let s = DASH_SUFFIX.replace_all(&s, "");
    let s = SEPARATORS.replace_all(&s, " ");
    s.trim().to_lowercase()
}

/// Normalize an artist name.
///
/// Lighter than [`normalize_title`]: drops a leading "the", turns `&`
/// into "and", turns separators into spaces, trims and lowercases.
pub fn normalize_artist(artist: &str) -> String {
    let s = LEADING_THE.replace(artist, "");
    let s = s.replace('&', "and");
    let s = SEPARATORS.replace_all(&s, " ");
    s.trim().to_lowercase()
}

/// Length-normalized edit similarity in `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    1.0 - (distance as f64 / longest as f64)
}

/// Whether `guess` is close enough to `target` to count as correct.
pub fn is_match(guess: &str, target: &str, threshold: f64) -> bool {
    similarity(guess, target) >= threshold
}

/// Targets of one round, pre-normalized once at round start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTargets {
    /// Normalized title.
    pub title: String,
    /// Normalized artists, in credit order.
    pub artists: Vec<String>,
}

impl NormalizedTargets {
    /// Normalize a title and its artists.
    pub fn new(title: &str, artists: &[String]) -> Self {
        Self {
            title: normalize_title(title),
            artists: artists.iter().map(|a| normalize_artist(a)).collect(),
        }
    }

    /// Whether the guess matches the title. The guess is title-normalized.
    pub fn title_matches(&self, guess: &str, threshold: f64) -> bool {
        is_match(&normalize_title(guess), &self.title, threshold)
    }

    /// Whether the guess matches the artist at `index`.
    ///
    /// The guess is compared as typed, without normalization.
    pub fn artist_matches(&self, index: usize, guess: &str, threshold: f64) -> bool {
        self.artists
            .get(index)
            .is_some_and(|artist| is_match(guess, artist, threshold))
    }
}
