use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreatePhrasing {
    /// `CREATE VIEW name AS ...`
    Plain,
    /// `CREATE VIEW IF NOT EXISTS name AS ...`
    IfNotExists,
    /// `CREATE OR REPLACE VIEW name AS ...`
    OrReplace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedViewDefinition {
    /// Canonical view identifier: unquoted, trimmed and lower-cased.
    pub name: String,
    pub phrasing: CreatePhrasing,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ViewStatementError {
    #[error("No view name found in the definition. Expected CREATE VIEW <name> AS ...")]
    NotAViewDefinition,
    #[error("Expected a single CREATE VIEW statement, found {0} statements")]
    MultipleStatements(usize),
}

// The view name is a single unqualified identifier, bare or quoted with
// "double quotes", `backticks` or [brackets].
fn create_view_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?is)\bcreate\s+(or\s+replace\s+)?view\s+(if\s+not\s+exists\s+)?("(?:[^"]|"")+"|`(?:[^`]|``)+`|\[[^\]]+\]|[\p{L}_][\p{L}\p{N}_$]*)(?:\s*\([^)]*\))?\s+as\b"#,
        )
        .expect("create view pattern is a valid regex")
    })
}

/// Finds the first `CREATE VIEW` statement in `text` and returns the view it
/// defines. Returns `None` when no accepted phrasing matches.
pub fn parse_view_definition(text: &str) -> Option<ParsedViewDefinition> {
    parse_from(text, false)
}

/// Accepts `text` only when it holds exactly one statement and that statement
/// is a `CREATE VIEW`. Comments and a trailing semicolon are allowed.
pub fn parse_view_statement(text: &str) -> Result<ParsedViewDefinition, ViewStatementError> {
    match split_statements(text).as_slice() {
        [statement] => parse_from(strip_leading_comments(statement), true)
            .ok_or(ViewStatementError::NotAViewDefinition),
        [] => Err(ViewStatementError::NotAViewDefinition),
        statements => Err(ViewStatementError::MultipleStatements(statements.len())),
    }
}

fn parse_from(text: &str, anchored: bool) -> Option<ParsedViewDefinition> {
    let captures = create_view_pattern().captures(text)?;
    if anchored && captures.get(0)?.start() != 0 {
        return None;
    }
    let name = unquote_identifier(captures.get(3)?.as_str())
        .trim()
        .to_lowercase();
    if name.is_empty() {
        return None;
    }

    let phrasing = if captures.get(1).is_some() {
        CreatePhrasing::OrReplace
    } else if captures.get(2).is_some() {
        CreatePhrasing::IfNotExists
    } else {
        CreatePhrasing::Plain
    };

    Some(ParsedViewDefinition { name, phrasing })
}

fn unquote_identifier(raw: &str) -> String {
    if let Some(inner) = raw.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        inner.replace("\"\"", "\"")
    } else if let Some(inner) = raw.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')) {
        inner.replace("``", "`")
    } else if let Some(inner) = raw.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        inner.to_string()
    } else {
        raw.to_string()
    }
}

/// Wraps `name` in double quotes, doubling any embedded quote.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Splits `text` on semicolons that sit outside quotes, brackets and
/// comments. Pieces holding nothing but whitespace and comments are left out.
pub fn split_statements(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        i = match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => skip_quoted(bytes, i + 1, quote),
            b'[' => skip_past(bytes, i + 1, b"]"),
            b'-' if bytes.get(i + 1) == Some(&b'-') => skip_past(bytes, i + 2, b"\n"),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_past(bytes, i + 2, b"*/"),
            b';' => {
                pieces.push(&text[start..i]);
                start = i + 1;
                i + 1
            }
            _ => i + 1,
        };
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !strip_leading_comments(piece).is_empty())
        .collect()
}

fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_past(bytes: &[u8], from: usize, terminator: &[u8]) -> usize {
    bytes[from..]
        .windows(terminator.len())
        .position(|window| window == terminator)
        .map_or(bytes.len(), |offset| from + offset + terminator.len())
}

fn strip_leading_comments(mut text: &str) -> &str {
    loop {
        let trimmed = text.trim_start();
        if let Some(rest) = trimmed.strip_prefix("--") {
            text = rest.find('\n').map_or("", |end| &rest[end + 1..]);
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            text = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            return trimmed;
        }
    }
}
