//! Sentence-boundary text chunker.
//!
//! Splits a normalized [`Document`] into [`Chunk`]s that respect a
//! `max_chars` budget. Splitting only happens between sentences, so a
//! sentence is never cut in half; a single sentence longer than the budget
//! becomes its own oversized chunk.
//!
//! Each chunk carries a SHA-256 hash of its text, which doubles as its key in
//! the summary cache.

use crate::models::{Chunk, Document};
use crate::normalize::content_digest;

/// Characters that may trail sentence punctuation (`."`, `?)`, `!’`).
const CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '\u{201D}', '\u{2019}', '\u{00BB}'];

/// Characters that may lead a word (`"Well`, `(see`).
const OPENERS: &[char] = &['"', '\'', '(', '[', '{', '\u{201C}', '\u{2018}', '\u{00AB}'];

/// Lowercased abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "mme", "mlle", "dr", "prof", "rev", "sr", "jr", "st", "mt", "ft", "gen",
    "capt", "col", "lt", "sgt", "gov", "hon", "vs", "no", "nos", "fig", "figs", "ch", "chap",
    "vol", "vols", "pp", "ed", "eds", "cf", "approx", "dept", "est", "jan", "feb", "mar", "apr",
    "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec", "e.g", "i.e",
];

/// Split normalized text into sentences.
///
/// A space is a boundary when the word before it ends in `.`, `!`, `?` or
/// `…` (optionally followed by closing quotes or brackets), the word after
/// it does not start in lowercase, and the period is not part of a known
/// abbreviation or a single-letter initial other than `I`. Dotted forms
/// such as `U.S.` end a sentence when a capitalized word follows, except
/// `e.g.` and `i.e.`. Joining the result with single
/// spaces gives back the input.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;

    for (i, _) in text.match_indices(' ') {
        if i < start {
            continue;
        }
        let prev_word = text[start..i].rsplit(' ').next().unwrap_or("");
        let next_word = text[i + 1..].split(' ').next().unwrap_or("");
        if is_boundary(prev_word, next_word) {
            let sentence = &text[start..i];
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i + 1;
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

fn is_boundary(prev_word: &str, next_word: &str) -> bool {
    let core = prev_word.trim_end_matches(CLOSERS);
    let last = match core.chars().last() {
        Some(c) => c,
        None => return false,
    };
    if !matches!(last, '.' | '!' | '?' | '\u{2026}') {
        return false;
    }

    match next_word.trim_start_matches(OPENERS).chars().next() {
        Some(c) if c.is_lowercase() => return false,
        Some(_) => {}
        None => return false,
    }

    !(last == '.' && is_abbreviation(core))
}

fn is_abbreviation(word_with_period: &str) -> bool {
    let word = word_with_period
        .trim_start_matches(OPENERS)
        .trim_end_matches('.');
    if word.is_empty() {
        return false;
    }
    // Initials ("J."); the pronoun "I." ends sentences.
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_alphabetic() && c != 'I';
    }
    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

/// Split a document into sentence-aligned chunks of at most `max_chars`
/// characters. Returns chunks with contiguous indices starting at 0; empty
/// input yields no chunks.
pub fn chunk_document(document: &Document, max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current_buf = String::new();
    let mut current_len = 0usize;
    let mut chunk_index: i64 = 0;

    for sentence in split_sentences(&document.text) {
        let sentence_len = sentence.chars().count();

        // +1 for the joining space
        let would_be = if current_buf.is_empty() {
            sentence_len
        } else {
            current_len + 1 + sentence_len
        };

        if would_be > max_chars && !current_buf.is_empty() {
            chunks.push(make_chunk(&document.id, chunk_index, &current_buf));
            chunk_index += 1;
            current_buf.clear();
            current_len = 0;
        }

        if !current_buf.is_empty() {
            current_buf.push(' ');
            current_len += 1;
        }
        current_buf.push_str(sentence);
        current_len += sentence_len;
    }

    if !current_buf.is_empty() {
        chunks.push(make_chunk(&document.id, chunk_index, &current_buf));
    }

    chunks
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    Chunk {
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash: content_digest(text),
    }
}
