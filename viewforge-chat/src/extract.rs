//! Harvesting SQL from finished transcripts.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use viewforge_core::{parse_view_definition, split_statements};

use crate::Transcript;

fn fenced_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```[^\n`]*\n(.*?)```").expect("fenced block pattern is a valid regex")
    })
}

/// Bodies of the fenced markdown code blocks in `text`, in order.
pub fn code_blocks(text: &str) -> Vec<String> {
    fenced_block_pattern()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|body| body.as_str().trim_end().to_string())
        .filter(|body| !body.trim().is_empty())
        .collect()
}

/// Code blocks from every turn that mention `VIEW` (any case): creations,
/// replacements and drops alike.
pub fn view_code(transcript: &Transcript) -> Vec<String> {
    transcript
        .iter()
        .flat_map(|turn| code_blocks(&turn.content))
        .filter(|block| block.to_uppercase().contains("VIEW"))
        .collect()
}

/// Names of the views created in `code`, one statement at a time,
/// deduplicated in first-seen order.
pub fn view_names<'a>(code: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    code.into_iter()
        .flat_map(split_statements)
        .filter_map(parse_view_definition)
        .map(|parsed| parsed.name)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
