//! Term tokenization and fuzzy term matching.
//!
//! Terms are matched against free-text queries without going through the
//! TF-IDF vocabulary, so a term mentioned in a query is found even when the
//! vectorizer never saw it:
//!
//! - a term matches when it occurs verbatim inside the query, or
//! - when at least half of the term's tokens also occur among the query's tokens.
//!
//! A token is a run of word characters or CJK ideographs. CJK runs are not
//! split further, so `打开文件` is one token.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;

/// Minimum fraction of a term's tokens that must appear in the query.
pub const TERM_OVERLAP_RATIO: f64 = 0.5;

fn term_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w\x{4e00}-\x{9fff}]+").expect("term token pattern"))
}

fn word_char_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w").expect("word char pattern"))
}

/// True when `text` has at least one word-like character.
pub fn has_word_char(text: &str) -> bool {
    word_char_re().is_match(text)
}

/// Distinct tokens of `text`, case preserved.
pub fn term_tokens(text: &str) -> HashSet<&str> {
    term_token_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// Whether `term` fuzzily matches a query whose tokens are `query_tokens`.
pub fn term_matches(term: &str, query: &str, query_tokens: &HashSet<&str>) -> bool {
    if query.contains(term) {
        return true;
    }
    let tokens = term_tokens(term);
    if tokens.is_empty() {
        return false;
    }
    let shared = tokens.iter().filter(|t| query_tokens.contains(*t)).count();
    shared as f64 / tokens.len() as f64 >= TERM_OVERLAP_RATIO
}

/// Select the terms from `terms` that fuzzily match `query`.
pub fn fuzzy_term_match<'a, I>(terms: I, query: &str) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let query_tokens = term_tokens(query);
    terms
        .into_iter()
        .filter(|term| term_matches(term, query, &query_tokens))
        .cloned()
        .collect()
}
