//! Report assembly: title, blank line, then five indented paragraphs.

use crate::models::ReportParagraph;

/// Build the final report text.
///
/// Layout: the title line, one blank line, then each paragraph prefixed
/// with `indent`, paragraphs separated by exactly one blank line. No
/// trailing newline. Pure and deterministic.
pub fn assemble(title: &str, paragraphs: &[ReportParagraph; 5], indent: &str) -> String {
    let body = paragraphs
        .iter()
        .map(|p| format!("{}{}", indent, p.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n\n{}", title, body)
}

/// Split an assembled report into its title line and the body after the
/// first blank line. A report with no blank line is all title.
pub fn split_title(report: &str) -> (&str, &str) {
    match report.split_once("\n\n") {
        Some((title, body)) => (title.trim_end(), body),
        None => (report.trim_end(), ""),
    }
}

/// Body paragraphs with their leading indent removed. Blank blocks are
/// dropped; blocks without the indent are kept as written.
pub fn body_paragraphs<'a>(body: &'a str, indent: &str) -> Vec<&'a str> {
    body.split("\n\n")
        .map(|block| block.trim_matches('\n'))
        .filter(|block| !block.trim().is_empty())
        .map(|block| block.strip_prefix(indent).unwrap_or(block))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParagraphRole;

    fn paragraphs() -> [ReportParagraph; 5] {
        ParagraphRole::ALL.map(|role| ReportParagraph {
            role,
            text: format!("P{}.", role.ordinal()),
        })
    }

    #[test]
    fn layout_is_exact() {
        let out = assemble("T", &paragraphs(), "    ");
        assert_eq!(out, "T\n\n    P1.\n\n    P2.\n\n    P3.\n\n    P4.\n\n    P5.");
    }

    #[test]
    fn assembly_is_deterministic() {
        let a = assemble("Title", &paragraphs(), "    ");
        let b = assemble("Title", &paragraphs(), "    ");
        assert_eq!(a, b);
        assert!(!a.contains("\n\n\n"));
        assert!(!a.ends_with('\n'));
    }

    #[test]
    fn split_recovers_title_and_paragraphs() {
        let out = assemble("Solitary Lives", &paragraphs(), "    ");
        let (title, body) = split_title(&out);
        assert_eq!(title, "Solitary Lives");
        assert_eq!(
            body_paragraphs(body, "    "),
            vec!["P1.", "P2.", "P3.", "P4.", "P5."]
        );
    }

    #[test]
    fn split_tolerates_loose_input() {
        let (title, body) = split_title("Just a title\n");
        assert_eq!(title, "Just a title");
        assert!(body.is_empty());

        let body = "  two-space\n\n\n\n    four-space\n";
        assert_eq!(body_paragraphs(body, "    "), vec!["  two-space", "four-space"]);
    }
}
