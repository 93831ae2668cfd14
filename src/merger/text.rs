// src/merger/text.rs — Section, sentence and term helpers for the merge strategies

use std::collections::BTreeSet;

/// Blank line separates sections.
pub const SECTION_DELIMITER: &str = "\n\n";

/// Sentences carrying one of these are treated as salient.
const SALIENCE_MARKERS: &[&str] = &[
    "important",
    "significant",
    "key",
    "crucial",
    "essential",
    "research shows",
    "study found",
];

/// Contrast and addition signals that make a sentence worth folding in.
const SIGNAL_WORDS: &[&str] = &[
    "however",
    "furthermore",
    "additionally",
    "moreover",
    "research indicates",
];

/// Minimum normalized Levenshtein similarity for two sentences to count as the same.
pub const NEAR_DUPLICATE_SIMILARITY: f64 = 0.85;

/// Terms shorter than this many characters are ignored.
const MIN_TERM_CHARS: usize = 5;

pub fn split_sections(content: &str) -> Vec<&str> {
    content.split(SECTION_DELIMITER).collect()
}

/// Split prose into trimmed sentences, keeping terminal punctuation.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace or end of text,
/// so decimals like "3.5" stay intact.
pub fn split_sentences(content: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        out.push(collapsed);
    }
}

/// Up to `limit` salient sentences, in document order.
pub fn key_sentences(content: &str, limit: usize) -> Vec<String> {
    split_sentences(content)
        .into_iter()
        .filter(|s| {
            let lower = s.to_lowercase();
            SALIENCE_MARKERS.iter().any(|m| lower.contains(m))
        })
        .take(limit)
        .collect()
}

pub fn has_signal(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    SIGNAL_WORDS.iter().any(|w| lower.contains(w))
}

/// Lowercased alphanumeric words longer than four characters, in order, with repeats.
pub fn terms(content: &str) -> Vec<String> {
    content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Distinct terms of one document.
pub fn term_set(content: &str) -> BTreeSet<String> {
    terms(content).into_iter().collect()
}

/// Whether `sentence` repeats (or nearly repeats) any of `existing`.
pub fn is_near_duplicate(sentence: &str, existing: &[String]) -> bool {
    let candidate = normalize(sentence);
    existing.iter().any(|e| {
        let other = normalize(e);
        other == candidate
            || strsim::normalized_levenshtein(&candidate, &other) >= NEAR_DUPLICATE_SIMILARITY
    })
}

fn normalize(sentence: &str) -> String {
    sentence
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase()
}
