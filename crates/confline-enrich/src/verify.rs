//! Title-search candidate verification
//!
//! A search hit is accepted when its normalized title equals ours, or when
//! both author lists have the same length and at least half of the
//! positional name pairs are similar enough.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Minimum similarity (0-100) for two author names to count as a match
pub const NAME_THRESHOLD: f64 = 75.0;

/// NFD, drop combining marks, lower-case, collapse whitespace
pub fn normalize(s: &str) -> String {
    let folded: String = s
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize`] without trailing periods ("Foo Bar." == "foo bar")
pub fn normalize_title(s: &str) -> String {
    normalize(s).trim_end_matches('.').trim_end().to_string()
}

/// Normalized Levenshtein similarity of the normalized strings, 0-100
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize(a), &normalize(b)) * 100.0
}

/// Same length and at least half of the positional pairs reach [`NAME_THRESHOLD`].
///
/// Two empty lists never match: a title mismatch without any author
/// evidence rejects the candidate.
pub fn authors_match(ours: &[&str], theirs: &[&str]) -> bool {
    let n = ours.len();
    if n == 0 || n != theirs.len() {
        return false;
    }
    let similar = ours
        .iter()
        .zip(theirs)
        .filter(|(a, b)| similarity(a, b) >= NAME_THRESHOLD)
        .count();
    similar * 2 >= n
}

pub fn is_same_paper(title: &str, authors: &[&str], cand_title: &str, cand_authors: &[&str]) -> bool {
    normalize_title(title) == normalize_title(cand_title) || authors_match(authors, cand_authors)
}
