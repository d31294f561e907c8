//! Minimal HTML extraction used by the HTTP browser.
//!
//! Selectors are plain tag names. Nested elements with the same tag end at
//! the first closing tag.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::browser::{ExtractionPlan, PageSummary};
use crate::error::{LinkError, Result};

#[allow(clippy::expect_used)]
static NON_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style|noscript)\b[^>]*>.*?</(?:script|style|noscript)\s*>")
        .expect("non-content pattern is valid")
});

#[allow(clippy::expect_used)]
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

#[allow(clippy::expect_used)]
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[allow(clippy::expect_used)]
static META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta pattern is valid"));

#[allow(clippy::expect_used)]
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("link pattern is valid"));

#[allow(clippy::expect_used)]
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9_:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute pattern is valid")
});

fn element_pattern(tag: &str) -> Result<Regex> {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*?)</{tag}\s*>"))
        .map_err(|e| LinkError::Evaluation(format!("bad selector {tag:?}: {e}")))
}

/// Inner HTML of every `tag` element with its byte offset.
pub(crate) fn elements<'a>(html: &'a str, tag: &str) -> Result<Vec<(usize, &'a str)>> {
    let pattern = element_pattern(tag)?;
    Ok(pattern
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), caps.get(1)?.as_str()))
        })
        .collect())
}

/// Inner HTML of the first `tag` element.
pub(crate) fn first_element<'a>(html: &'a str, tag: &str) -> Result<Option<&'a str>> {
    let pattern = element_pattern(tag)?;
    Ok(pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str()))
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Visible text of a fragment with whitespace collapsed.
pub(crate) fn text_content(fragment: &str) -> String {
    let without_code = NON_CONTENT.replace_all(fragment, " ");
    let without_comments = COMMENT.replace_all(&without_code, " ");
    let without_tags = TAG.replace_all(&without_comments, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Text of a fragment with whitespace preserved, as for `<pre>` blocks.
fn raw_text(fragment: &str) -> String {
    decode_entities(&TAG.replace_all(fragment, ""))
}

/// Attributes of a single start tag, with lowercased names.
pub(crate) fn attributes(tag: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some((name, decode_entities(value)))
        })
        .collect()
}

/// `content` of the first `<meta name=...>` with the given name.
pub(crate) fn meta_content(html: &str, name: &str) -> Option<String> {
    META.find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let matches = attrs
            .get("name")
            .or_else(|| attrs.get("property"))
            .is_some_and(|n| n.eq_ignore_ascii_case(name));
        if matches {
            attrs.get("content").cloned()
        } else {
            None
        }
    })
}

/// Inline style sheets, plus `@import` rules for linked ones.
pub(crate) fn stylesheets(html: &str) -> Result<Vec<String>> {
    let mut sheets: Vec<(usize, String)> = elements(html, "style")?
        .into_iter()
        .map(|(start, css)| (start, css.trim().to_string()))
        .collect();

    for tag in LINK.find_iter(html) {
        let attrs = attributes(tag.as_str());
        let is_stylesheet = attrs
            .get("rel")
            .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
        if let (true, Some(href)) = (is_stylesheet, attrs.get("href")) {
            sheets.push((tag.start(), format!("@import url(\"{href}\");")));
        }
    }

    sheets.sort_by_key(|(start, _)| *start);
    Ok(sheets.into_iter().map(|(_, css)| css).collect())
}

/// Evaluate an extraction plan against a document.
pub(crate) fn summarize(html: &str, plan: &ExtractionPlan) -> Result<PageSummary> {
    let mut title = String::new();
    for selector in &plan.title_selectors {
        if let Some(inner) = first_element(html, selector)? {
            title = text_content(inner);
            break;
        }
    }

    let description = meta_content(html, &plan.description_meta).unwrap_or_default();

    let mut region = None;
    for selector in &plan.content_regions {
        region = first_element(html, selector)?;
        if region.is_some() {
            break;
        }
    }
    let region = match region {
        Some(region) => region,
        None => first_element(html, &plan.fallback_region)?.unwrap_or(html),
    };

    let text = Some(text_content(region)).filter(|t| !t.is_empty());

    let mut blocks = Vec::new();
    for selector in &plan.code_selectors {
        blocks.extend(elements(region, selector)?);
    }
    blocks.sort_by_key(|(start, _)| *start);
    let code = blocks
        .into_iter()
        .map(|(_, inner)| raw_text(inner))
        .filter(|block| !block.trim().is_empty())
        .collect();

    Ok(PageSummary {
        title,
        description,
        text,
        code,
    })
}
