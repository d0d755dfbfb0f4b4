//! Whitespace normalization and content addressing.
//!
//! Every maximal run of whitespace collapses to a single space and the ends
//! are trimmed. The normalized text is hashed with SHA-256; the hex digest is
//! the document's identity and the summary cache key.

use sha2::{Digest, Sha256};

use crate::models::Document;

/// Normalize raw extracted text into a [`Document`].
pub fn normalize(text: &str) -> Document {
    let text = collapse_whitespace(text);
    Document {
        id: content_digest(&text),
        text,
    }
}

/// Collapse whitespace runs to one space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Lowercase hex SHA-256 of the exact bytes of `text`.
pub fn content_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        let doc = normalize("  A man\t\tlives\n\n alone.\r\n");
        assert_eq!(doc.text, "A man lives alone.");
    }

    #[test]
    fn empty_and_blank_input() {
        assert_eq!(normalize("").text, "");
        assert_eq!(normalize(" \n\t ").text, "");
        assert_eq!(normalize("").id, normalize("   ").id);
    }

    #[test]
    fn unicode_whitespace_collapses() {
        let doc = normalize("Gregor\u{00A0}\u{2003}Samsa\u{2028}woke.");
        assert_eq!(doc.text, "Gregor Samsa woke.");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "",
            "plain",
            "  lead and trail  ",
            "a\n\nb\tc   d",
            "\u{3000}wide\u{3000}space\u{3000}",
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(&once.text);
            assert_eq!(once, twice, "input {:?}", input);
        }
    }

    #[test]
    fn never_two_spaces_or_padding() {
        let inputs = ["x  y", " x", "x ", "\n\n\nx\n\n\ny\n\n\n", "a \t \n b"];
        for input in inputs {
            let doc = normalize(input);
            assert!(!doc.text.contains("  "), "{:?}", doc.text);
            assert!(!doc.text.starts_with(' '));
            assert!(!doc.text.ends_with(' '));
        }
    }

    #[test]
    fn digest_is_sensitive_to_single_character() {
        let a = normalize("A creature is abandoned.");
        let b = normalize("A creature is abandoned!");
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
    }

    #[test]
    fn digest_matches_known_value() {
        assert_eq!(
            content_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
