use crate::listing::TicketListing;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Minimum event name similarity used when none is specified.
pub const DEFAULT_EVENT_NAME_SIMILARITY: f64 = 0.9;

/// Cost of a query word with no counterpart, or an extra word in the target.
const GAP_PENALTY: f64 = 1.0;

static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_ALPHANUMERIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]").unwrap());

/// Canonicalises an event name for comparison.
///
/// Accents are stripped, case folded, a leading "the" removed, `&` spelled out
/// and everything outside `[a-z0-9]` turned into single spaces.
///
/// Letters without a decomposition (ł, ø, Æ) are dropped, not transliterated.
pub fn normalize_event_name(name: &str) -> String {
    let name = name.trim();
    let name: String = name.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect();
    let name = name.to_lowercase();
    let name = strip_leading_article(&name);
    let name = name.replace('&', " and ");
    let name = NON_ALPHANUMERIC_REGEX.replace_all(&name, " ");
    let name = SPACE_REGEX.replace_all(&name, " ");
    // Punctuation can expose a new leading article ("the-the"), strip again
    strip_leading_article(name.trim()).to_string()
}

fn strip_leading_article(mut name: &str) -> &str {
    while let Some(rest) = name.strip_prefix("the ") {
        name = rest.trim_start();
    }
    name
}

/// Similarity between a desired event name and the name on a listing, between 0 and 1.
///
/// Both are normalised and padded so a word can't match inside a longer word.
pub fn event_name_similarity(query: &str, target: &str) -> f64 {
    let query = format!(" {} ", normalize_event_name(query));
    let target = format!(" {} ", normalize_event_name(target));
    substring_similarity(&query, &target)
}

/// Scores how well `sub_string` appears within `target_string`, between 0 and 1.
///
/// Words are aligned with a Smith-Waterman local alignment, scoring each word pair
/// with normalised Damerau-Levenshtein similarity. The best score over every target
/// end position (with all query words consumed) is averaged over the query words, so
/// "taylor swift" matches "taylor swift the eras tour" but not the other way round.
pub fn substring_similarity(sub_string: &str, target_string: &str) -> f64 {
    let sub_words: Vec<&str> = sub_string.split_whitespace().collect();
    let target_words: Vec<&str> = target_string.split_whitespace().collect();

    match (sub_words.is_empty(), target_words.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let rows = sub_words.len() + 1;
    let cols = target_words.len() + 1;
    let mut matrix = vec![vec![0.0_f64; cols]; rows];

    for i in 1..rows {
        for j in 1..cols {
            let similarity =
                strsim::normalized_damerau_levenshtein(sub_words[i - 1], target_words[j - 1]);

            let match_score = matrix[i - 1][j - 1] + similarity;
            let delete_score = matrix[i - 1][j] - GAP_PENALTY;
            let insert_score = matrix[i][j - 1] - GAP_PENALTY;

            matrix[i][j] = 0.0_f64.max(match_score).max(delete_score).max(insert_score);
        }
    }

    let max_score = matrix[rows - 1].iter().copied().fold(0.0_f64, f64::max);
    max_score / sub_words.len() as f64
}

/// Clamps a requested similarity into `(0, 1]`, using the default when unset or <= 0.
pub fn resolve_similarity(similarity: Option<f64>) -> f64 {
    match similarity {
        Some(s) if s > 1.0 => 1.0,
        Some(s) if s > 0.0 => s,
        _ => DEFAULT_EVENT_NAME_SIMILARITY,
    }
}

pub struct EventMatcher {
    similarity_threshold: f64,
}

impl Default for EventMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_NAME_SIMILARITY)
    }
}

impl EventMatcher {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold: resolve_similarity(Some(similarity_threshold)),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn is_match(&self, query: &str, event_name: &str) -> bool {
        event_name_similarity(query, event_name) >= self.similarity_threshold
    }

    /// Listings whose event name matches the query, best match first.
    pub fn rank_listings<'a>(
        &self,
        query: &str,
        listings: &'a [TicketListing],
    ) -> Vec<(&'a TicketListing, f64)> {
        let mut matches: Vec<(&TicketListing, f64)> = listings
            .iter()
            .map(|listing| (listing, event_name_similarity(query, &listing.event.name)))
            .filter(|(_, similarity)| *similarity >= self.similarity_threshold)
            .collect();

        // Stable sort keeps feed order (newest first) between equal scores
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        matches
    }

    pub fn find_best_match<'a>(
        &self,
        query: &str,
        listings: &'a [TicketListing],
    ) -> Option<(&'a TicketListing, f64)> {
        self.rank_listings(query, listings).into_iter().next()
    }
}
