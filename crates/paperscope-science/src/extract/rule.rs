use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static BY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*by\s+").expect("valid regex"));

/// One way of reading a value out of a document.
///
/// Selector-based rules take CSS selectors; an invalid selector makes the rule
/// yield nothing.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// `content` of the first matching element with a non-empty value.
    Meta(&'static str),
    /// `content` of every matching element, joined with `", "` in document order.
    MetaAll(&'static str),
    /// Text of the first matching element with non-empty text.
    Text(&'static str),
    /// Text of every matching element, joined with `", "`.
    TextAll(&'static str),
    /// Element text with a leading "By " removed.
    Byline(&'static str),
    /// Meta `content` with a leading "By " removed.
    BylineMeta(&'static str),
    /// Attribute value of the first matching element.
    Attr(&'static str, &'static str),
    /// Fixed value.
    Const(&'static str),
    /// Anything selectors cannot express, e.g. JSON embedded in a script.
    Custom(fn(&Html) -> Option<String>),
}

impl Rule {
    pub fn evaluate(&self, document: &Html) -> Option<String> {
        let value = match *self {
            Rule::Meta(sel) => select(document, sel)
                .into_iter()
                .filter_map(|el| el.value().attr("content"))
                .map(collapse_whitespace)
                .find(|v| !v.is_empty()),
            Rule::MetaAll(sel) => join_non_empty(
                select(document, sel)
                    .into_iter()
                    .filter_map(|el| el.value().attr("content"))
                    .map(collapse_whitespace),
            ),
            Rule::Text(sel) => select(document, sel)
                .into_iter()
                .map(|el| element_text(&el))
                .find(|v| !v.is_empty()),
            Rule::TextAll(sel) => join_non_empty(
                select(document, sel).into_iter().map(|el| element_text(&el)),
            ),
            Rule::Byline(sel) => select(document, sel)
                .into_iter()
                .map(|el| strip_by_prefix(&element_text(&el)))
                .find(|v| !v.is_empty()),
            Rule::BylineMeta(sel) => select(document, sel)
                .into_iter()
                .filter_map(|el| el.value().attr("content"))
                .map(|v| strip_by_prefix(&collapse_whitespace(v)))
                .find(|v| !v.is_empty()),
            Rule::Attr(sel, attr) => select(document, sel)
                .into_iter()
                .filter_map(|el| el.value().attr(attr))
                .map(collapse_whitespace)
                .find(|v| !v.is_empty()),
            Rule::Const(v) => Some(v.to_string()),
            Rule::Custom(f) => f(document).map(|v| collapse_whitespace(&v)),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Elements matching `selector`, or none if it does not parse.
pub fn select<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(sel) => document.select(&sel).collect(),
        Err(e) => {
            debug!("invalid selector {selector}: {e}");
            Vec::new()
        }
    }
}

pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn strip_by_prefix(input: &str) -> String {
    BY_PREFIX.replace(input, "").trim().to_string()
}

fn join_non_empty(values: impl Iterator<Item = String>) -> Option<String> {
    let parts: Vec<String> = values.filter(|v| !v.is_empty()).collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}
