//! Core data models used throughout litreport.
//!
//! These types represent the documents, chunks, paragraphs, and reports that
//! flow through the ingestion and generation pipeline. Everything here is an
//! immutable value once built; the only mutable state in a run is the
//! [`SummaryCache`](crate::cache::SummaryCache).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::extract::ExtractError;

/// Container format of a source book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Structured markup export (`content:encoded` items).
    Xml,
    /// Page-oriented document.
    Pdf,
    /// Packaged e-book.
    Epub,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Xml => "xml",
            SourceFormat::Pdf => "pdf",
            SourceFormat::Epub => "epub",
        }
    }

    /// Infer the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for SourceFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(SourceFormat::Xml),
            "pdf" => Ok(SourceFormat::Pdf),
            "epub" => Ok(SourceFormat::Epub),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized text of one ingested book, identified by its SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters, the unit chunk budgets are measured in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A sentence-aligned slice of a document's text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// Structural position of a paragraph in the report.
///
/// Roles advance strictly in order; [`ParagraphRole::next`] returns `None`
/// once the conclusion is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParagraphRole {
    Introduction,
    BodyBook1,
    BodyBook2,
    BodyBook3,
    Conclusion,
}

impl ParagraphRole {
    pub const ALL: [ParagraphRole; 5] = [
        ParagraphRole::Introduction,
        ParagraphRole::BodyBook1,
        ParagraphRole::BodyBook2,
        ParagraphRole::BodyBook3,
        ParagraphRole::Conclusion,
    ];

    /// 1-based position in the report.
    pub fn ordinal(&self) -> usize {
        match self {
            ParagraphRole::Introduction => 1,
            ParagraphRole::BodyBook1 => 2,
            ParagraphRole::BodyBook2 => 3,
            ParagraphRole::BodyBook3 => 4,
            ParagraphRole::Conclusion => 5,
        }
    }

    pub fn next(&self) -> Option<ParagraphRole> {
        match self {
            ParagraphRole::Introduction => Some(ParagraphRole::BodyBook1),
            ParagraphRole::BodyBook1 => Some(ParagraphRole::BodyBook2),
            ParagraphRole::BodyBook2 => Some(ParagraphRole::BodyBook3),
            ParagraphRole::BodyBook3 => Some(ParagraphRole::Conclusion),
            ParagraphRole::Conclusion => None,
        }
    }

    /// Zero-based book index for body roles.
    pub fn book_index(&self) -> Option<usize> {
        match self {
            ParagraphRole::BodyBook1 => Some(0),
            ParagraphRole::BodyBook2 => Some(1),
            ParagraphRole::BodyBook3 => Some(2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParagraphRole::Introduction => "introduction",
            ParagraphRole::BodyBook1 => "body-1",
            ParagraphRole::BodyBook2 => "body-2",
            ParagraphRole::BodyBook3 => "body-3",
            ParagraphRole::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for ParagraphRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The inputs each role is allowed to see.
#[derive(Debug, Clone, Copy)]
pub enum ParagraphBrief<'a> {
    Introduction { thesis: &'a str },
    BodyBook1 { thesis: &'a str, summary: &'a str },
    BodyBook2 { thesis: &'a str, summary: &'a str },
    BodyBook3 { thesis: &'a str, summary: &'a str },
    Conclusion { thesis: &'a str, analysis: &'a str },
}

impl<'a> ParagraphBrief<'a> {
    /// Build the brief for `role` from the precomputed stage outputs.
    pub fn for_role(
        role: ParagraphRole,
        thesis: &'a str,
        summaries: &'a [String; 3],
        analysis: &'a str,
    ) -> Self {
        let summary = role
            .book_index()
            .map(|index| summaries[index].as_str())
            .unwrap_or_default();
        match role {
            ParagraphRole::Introduction => ParagraphBrief::Introduction { thesis },
            ParagraphRole::BodyBook1 => ParagraphBrief::BodyBook1 { thesis, summary },
            ParagraphRole::BodyBook2 => ParagraphBrief::BodyBook2 { thesis, summary },
            ParagraphRole::BodyBook3 => ParagraphBrief::BodyBook3 { thesis, summary },
            ParagraphRole::Conclusion => ParagraphBrief::Conclusion { thesis, analysis },
        }
    }

    pub fn role(&self) -> ParagraphRole {
        match self {
            ParagraphBrief::Introduction { .. } => ParagraphRole::Introduction,
            ParagraphBrief::BodyBook1 { .. } => ParagraphRole::BodyBook1,
            ParagraphBrief::BodyBook2 { .. } => ParagraphRole::BodyBook2,
            ParagraphBrief::BodyBook3 { .. } => ParagraphRole::BodyBook3,
            ParagraphBrief::Conclusion { .. } => ParagraphRole::Conclusion,
        }
    }
}

/// One generated paragraph, tagged with its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportParagraph {
    pub role: ParagraphRole,
    pub text: String,
}

/// Title plus the five paragraphs, in role order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub paragraphs: [ReportParagraph; 5],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_advance_in_order_and_stop_at_conclusion() {
        let mut role = ParagraphRole::Introduction;
        let mut seen = vec![role];
        while let Some(next) = role.next() {
            assert_eq!(next.ordinal(), role.ordinal() + 1);
            seen.push(next);
            role = next;
        }
        assert_eq!(seen, ParagraphRole::ALL.to_vec());
        assert_eq!(role, ParagraphRole::Conclusion);
    }

    #[test]
    fn brief_carries_the_matching_summary() {
        let summaries = ["one".to_string(), "two".to_string(), "three".to_string()];
        let brief = ParagraphBrief::for_role(ParagraphRole::BodyBook2, "t", &summaries, "a");
        match brief {
            ParagraphBrief::BodyBook2 { summary, thesis } => {
                assert_eq!(summary, "two");
                assert_eq!(thesis, "t");
            }
            other => panic!("unexpected brief {:?}", other),
        }
        assert_eq!(brief.role(), ParagraphRole::BodyBook2);
    }

    #[test]
    fn each_body_brief_uses_its_book_index() {
        let summaries = ["one".to_string(), "two".to_string(), "three".to_string()];
        for role in ParagraphRole::ALL {
            let brief = ParagraphBrief::for_role(role, "t", &summaries, "a");
            let summary = match brief {
                ParagraphBrief::BodyBook1 { summary, .. }
                | ParagraphBrief::BodyBook2 { summary, .. }
                | ParagraphBrief::BodyBook3 { summary, .. } => Some(summary),
                _ => None,
            };
            assert_eq!(summary, role.book_index().map(|i| summaries[i].as_str()));
            assert_eq!(brief.role(), role);
        }
    }

    #[test]
    fn source_format_parsing() {
        assert_eq!("EPUB".parse::<SourceFormat>().unwrap(), SourceFormat::Epub);
        assert!(matches!(
            "mobi".parse::<SourceFormat>(),
            Err(ExtractError::UnsupportedFormat(_))
        ));
        assert_eq!(
            SourceFormat::from_path(Path::new("books/the_stranger.pdf")).unwrap(),
            SourceFormat::Pdf
        );
    }
}
