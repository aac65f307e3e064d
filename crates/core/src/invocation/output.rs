//! Best-effort interpretation of successful output.
//!
//! Parsing never turns a successful invocation into a failure: when the
//! text does not have the expected shape the caller gets it back raw.

use serde::Serialize;

/// A success payload after an optional caller-supplied transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Parsed<T> {
    Structured(T),
    Raw(String),
}

impl<T> Parsed<T> {
    /// Apply `transform` to `text`, keeping the text when it yields `None`.
    pub fn from_text(text: &str, transform: impl FnOnce(&str) -> Option<T>) -> Self {
        match transform(text) {
            Some(value) => Self::Structured(value),
            None => Self::Raw(text.to_string()),
        }
    }

    pub fn structured(&self) -> Option<&T> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// Interpret printed text as a list of strings.
///
/// Accepts a JSON array of strings or a Python-style list literal such as
/// `['a', "b"]`. The whole trimmed text is tried first, then its last
/// non-empty line, since CLIs often print banners before the result.
pub fn parse_list(text: &str) -> Option<Vec<String>> {
    let trimmed = text.trim();
    if let Some(items) = parse_list_literal(trimmed) {
        return Some(items);
    }
    let last = trimmed.lines().rev().map(str::trim).find(|l| !l.is_empty())?;
    if last.len() == trimmed.len() {
        return None;
    }
    parse_list_literal(last)
}

fn parse_list_literal(text: &str) -> Option<Vec<String>> {
    if let Ok(items) = serde_json::from_str::<Vec<String>>(text) {
        return Some(items);
    }

    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        skip_whitespace(&mut chars);
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return None;
        }

        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => match chars.next()? {
                    'n' => item.push('\n'),
                    't' => item.push('\t'),
                    other => item.push(other),
                },
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);

        skip_whitespace(&mut chars);
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(items)
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
