//! Prompt templates for every generation stage.
//!
//! Templates use `{theme}`, `{text}`, `{summaries}`, `{analysis}` and
//! `{thesis}` placeholders, filled in by [`fill`].

/// Constraint appended to every paragraph prompt.
pub const PARAGRAPH_CONSTRAINT: &str = "Ensure your response is exactly 4-5 sentences long. \
Also, use double quotes (\") around publication titles instead of asterisks (*).";

pub const SUMMARY_SYSTEM: &str =
    "You are a helpful assistant that summarizes text with emphasis on {theme}.";

pub const SUMMARY_PROMPT: &str =
    "Focus on the theme of {theme}. Summarize the following text:\n\n{text}\n\n\
Make sure to wrap the name of the book in quotation marks.";

pub const SUMMARY_CITATION_RULE: &str = " Include at least one direct quotation from the text, \
copied word for word and enclosed in double quotation marks.";

pub const REDUCE_PROMPT: &str = "The following are summaries of consecutive passages of one book. \
Combine them into a single summary of the whole book that focuses on the theme of {theme}. \
Keep any direct quotations exactly as they appear.\n\nPassage summaries:\n{summaries}\n\n\
Make sure to wrap the name of the book in quotation marks.";

pub const COMPARISON_SYSTEM: &str =
    "You are a helpful assistant that compares summaries with emphasis on {theme}.";

pub const COMPARISON_PROMPT: &str = "Compare these book summaries in terms of how they address {theme}. \
Make sure to wrap the name of the book in quotation marks. \
Preserve any direct quotations from the summaries exactly as written.\n\
Summaries:\n{summaries}\n\nComparison:";

pub const THESIS_SYSTEM: &str = "You are an expert literary critic.";

pub const THESIS_PROMPT: &str = "Based on the following book summaries and comparative analysis, \
generate a clear thesis statement that discusses how the novels address {theme}. \
Name every novel and wrap the name of each book in quotation marks.\n\n\
Book Summaries:\n{summaries}\n\nComparative Analysis:\n{analysis}\n\nThesis Statement:";

pub const TITLE_SYSTEM: &str = "You are a creative editor who writes short, memorable titles.";

pub const TITLE_PROMPT: &str = "Write a creative title of about five words for a literary report \
built on the following thesis. Respond with the title only.\n\nThesis: {thesis}";

pub const PARAGRAPH_SYSTEM: &str = "You are a skilled writer who creates detailed book reports.";

pub const INTRODUCTION_PROMPT: &str = "Generate an introductory paragraph about how three novels \
address {theme}. Introduce the topic and end the paragraph with the following thesis statement: {thesis}";

pub const BODY_PROMPT: &str = "Generate a body paragraph that discusses details from the {ordinal} \
novel in support of the following thesis: {thesis}\n\nUse the following summary for reference: {text}";

pub const CONCLUSION_PROMPT: &str = "Generate a concluding paragraph that presents a rebuttal to a \
counterargument against the following thesis and summarizes the overall analysis: {thesis}\n\n\
Use the following comparative analysis as a reference: {analysis}";

/// Substitute `{name}` placeholders in `template` in a single pass, so text
/// inserted for one placeholder is never rescanned for another.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Join texts with a blank line between each, the separator used wherever
/// several summaries go into one prompt.
pub fn join_blocks(blocks: &[String]) -> String {
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_replaces_every_occurrence() {
        let out = fill("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x then y");
    }

    #[test]
    fn fill_leaves_unknown_placeholders() {
        assert_eq!(fill("{theme} {other}", &[("theme", "t")]), "t {other}");
    }

    #[test]
    fn inserted_text_is_not_rescanned() {
        let out = fill("{thesis} / {text}", &[("thesis", "{text}"), ("text", "body")]);
        assert_eq!(out, "{text} / body");
    }

    #[test]
    fn blocks_are_blank_line_separated() {
        let out = join_blocks(&["one".to_string(), "two".to_string()]);
        assert_eq!(out, "one\n\ntwo");
    }
}
