//! Stage instructions for the content pipeline.

pub const RESEARCH_SYSTEM: &str = "\
You are a research assistant. Collect the key facts, figures, and insights \
needed to answer the user's question. Use the web-search tool when you need \
current information, then summarize what you found with sources where possible. \
If nothing relevant can be found, say so plainly.";

const WRITER_SYSTEM: &str = "\
You are a technical writer. Turn the research you are given into a clear, \
well-organized answer in Markdown:
- start with a one-paragraph summary
- use `##` headings for the main sections
- use bullet lists for enumerations and tables for comparisons
- keep every claim grounded in the research; do not invent facts";

pub const REVIEWER_SYSTEM: &str = "\
You are a senior reviewer. Improve the clarity, correctness, and flow of the \
draft you are given. Preserve its Markdown structure. Return only the improved \
draft, with no preamble, notes, or commentary about your changes.";

/// Writer instruction, with optional reader-specific guidance appended.
pub fn writer_system(personalization: Option<&str>) -> String {
    match personalization.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => format!("{WRITER_SYSTEM}\n\nTailor the answer to this reader:\n{p}"),
        None => WRITER_SYSTEM.to_string(),
    }
}

pub fn research_for_writer(research: &str) -> String {
    format!("Here is the research:\n{research}")
}

pub fn draft_for_reviewer(draft: &str) -> String {
    format!("Here is the draft:\n{draft}")
}

/// User-facing text when research came back empty.
pub fn no_results(query: &str) -> String {
    format!(
        "I couldn't find any reliable sources for \"{query}\". \
         Try rephrasing the question or making it more specific."
    )
}
