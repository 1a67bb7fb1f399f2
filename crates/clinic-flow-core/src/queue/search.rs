//! Fuzzy ranking for queue search.

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::models::WaitingRoomEntry;

/// Minimum score for an entry to be returned.
pub const MIN_SEARCH_SCORE: f64 = 0.75;

/// Candidate rows fetched before ranking.
pub(crate) const SEARCH_CANDIDATE_LIMIT: usize = 50;

/// An entry with its search relevance.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: WaitingRoomEntry,
    pub score: f64,
}

/// Score an entry against a search term.
///
/// The best-matching word of the pet name, reason for visit or notes
/// decides. A term contained verbatim in the text scores at least 0.9.
pub fn relevance(term: &str, entry: &WaitingRoomEntry, pet_name: Option<&str>) -> f64 {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return 0.0;
    }

    [pet_name, entry.reason_for_visit.as_deref(), entry.notes.as_deref()]
        .into_iter()
        .flatten()
        .map(|text| text_score(&term, &text.to_lowercase()))
        .fold(0.0, f64::max)
}

fn text_score(term: &str, text: &str) -> f64 {
    let best_word = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|word| fuzzy_match(term, word))
        .fold(0.0, f64::max);

    if text.contains(term) {
        best_word.max(0.9)
    } else {
        best_word
    }
}

fn fuzzy_match(a: &str, b: &str) -> f64 {
    // Jaro-Winkler favours shared prefixes, Levenshtein overall similarity
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}
