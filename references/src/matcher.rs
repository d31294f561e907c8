//! Scanning chat text for `@`-tokens.
//!
//! A token is `@`, an optional `file:`, `folder:` or `link:` tag, and a run
//! of non-whitespace characters. Offsets are byte offsets into the scanned
//! text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::reference::ReferenceKind;

#[allow(clippy::expect_used)]
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?:(file|folder|link)?:)?(\S*)").expect("token pattern is valid")
});

#[allow(clippy::expect_used)]
static TRAILING_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?:(file|folder|link)?:)?(\S*)$").expect("trailing token pattern is valid")
});

/// An `@`-token found in text, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Offset of the `@`.
    pub start: usize,

    /// Offset just past the token.
    pub end: usize,

    /// Payload after the optional tag.
    pub raw_value: String,

    /// The explicit tag, if one was typed.
    pub declared_kind: Option<ReferenceKind>,
}

/// The token the user is typing, ending at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToken {
    /// Offset of the `@`.
    pub start: usize,

    /// Offset of the cursor the token ends at.
    pub end: usize,

    /// The explicit tag, if one was typed.
    pub declared_kind: Option<ReferenceKind>,

    /// Text typed after the tag. May be empty.
    pub prefix: String,
}

fn declared_kind(caps: &Captures<'_>) -> Option<ReferenceKind> {
    caps.get(1).and_then(|tag| tag.as_str().parse().ok())
}

/// Find every `@`-token in `text`, left to right.
///
/// Tokens with an empty value (`@`, `@:`, `@file:`) are skipped.
pub fn find_matches(text: &str) -> impl Iterator<Item = Match> + '_ {
    TOKEN.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let value = caps.get(2)?.as_str();
        if value.is_empty() {
            return None;
        }

        Some(Match {
            start: whole.start(),
            end: whole.end(),
            raw_value: value.to_string(),
            declared_kind: declared_kind(&caps),
        })
    })
}

/// Extract the token that ends exactly at `cursor`.
///
/// Returns `None` when there is no `@` before the cursor or when whitespace
/// separates it from the cursor. A cursor past the end is clamped and one
/// inside a multi-byte character moves back to its start.
pub fn partial_token(text: &str, cursor: usize) -> Option<PartialToken> {
    let mut end = cursor.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let caps = TRAILING_TOKEN.captures(&text[..end])?;
    let whole = caps.get(0)?;

    Some(PartialToken {
        start: whole.start(),
        end,
        declared_kind: declared_kind(&caps),
        prefix: caps.get(2).map_or("", |m| m.as_str()).to_string(),
    })
}

/// Heuristic for text that could be a web address.
pub fn looks_like_link(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || text.contains('.')
}
