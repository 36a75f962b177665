use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

use crate::extract::rule::select;
use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"ieeexplore\.ieee\.org/(?:abstract/)?document/(\d+)",
        r"ieeexplore\.ieee\.org/stamp/stamp\.jsp\?(?:[^#]*&)?arnumber=(\d+)",
    ])
});

static METADATA_ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"xplGlobal\.document\.metadata\s*=\s*").expect("valid regex"));

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [
                Rule::Meta("meta[name='citation_title']"),
                Rule::Custom(embedded_title),
                Rule::Text("h1.document-title span"),
            ],
        )
        .with(
            Field::Authors,
            [
                Rule::MetaAll("meta[name='citation_author']"),
                Rule::Custom(embedded_authors),
                Rule::TextAll(".authors-info .blue-tooltip a span"),
            ],
        )
        .with(
            Field::Description,
            [
                Rule::Meta("meta[name='citation_abstract']"),
                Rule::Custom(embedded_abstract),
                Rule::Text("div.abstract-text div"),
            ],
        )
        .with(
            Field::PublishedDate,
            [
                Rule::Meta("meta[name='citation_publication_date']"),
                Rule::Custom(embedded_date),
            ],
        )
        .with(
            Field::Doi,
            [Rule::Meta("meta[name='citation_doi']"), Rule::Custom(embedded_doi)],
        )
        .with(
            Field::JournalName,
            [
                Rule::Meta("meta[name='citation_journal_title']"),
                Rule::Meta("meta[name='citation_conference_title']"),
                Rule::Custom(embedded_publication),
            ],
        )
        .with(
            Field::Tags,
            [
                Rule::MetaAll("meta[name='citation_keywords']"),
                Rule::Custom(embedded_keywords),
            ],
        )
        .split_tags_on(&[',', ';'])
});

/// The `xplGlobal.document.metadata = {...};` object the document page
/// assigns in an inline script.
fn embedded_metadata(document: &Html) -> Option<Value> {
    select(document, "script").into_iter().find_map(|script| {
        let text: String = script.text().collect();
        let start = METADATA_ASSIGNMENT.find(&text)?.end();
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()?
            .ok()
    })
}

fn embedded_str(document: &Html, key: &str) -> Option<String> {
    embedded_metadata(document)?
        .get(key)?
        .as_str()
        .map(ToOwned::to_owned)
}

fn embedded_title(document: &Html) -> Option<String> {
    embedded_str(document, "title")
}

fn embedded_abstract(document: &Html) -> Option<String> {
    embedded_str(document, "abstract")
}

fn embedded_date(document: &Html) -> Option<String> {
    embedded_str(document, "publicationDate")
}

fn embedded_doi(document: &Html) -> Option<String> {
    embedded_str(document, "doi")
}

fn embedded_publication(document: &Html) -> Option<String> {
    embedded_str(document, "publicationTitle")
}

fn embedded_authors(document: &Html) -> Option<String> {
    let metadata = embedded_metadata(document)?;
    let names: Vec<&str> = metadata
        .get("authors")?
        .as_array()?
        .iter()
        .filter_map(|a| a.get("name").and_then(Value::as_str))
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}

/// Keywords arrive grouped by vocabulary (IEEE, INSPEC, author); all groups
/// are flattened in page order.
fn embedded_keywords(document: &Html) -> Option<String> {
    let metadata = embedded_metadata(document)?;
    let keywords: Vec<&str> = metadata
        .get("keywords")?
        .as_array()?
        .iter()
        .filter_map(|group| group.get("kwd").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    (!keywords.is_empty()).then(|| keywords.join(", "))
}

/// IEEE Xplore document pages.
pub struct IeeeIntegration;

impl SourceIntegration for IeeeIntegration {
    fn id(&self) -> &'static str {
        "ieee"
    }

    fn name(&self) -> &'static str {
        "IEEE Xplore"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &[
            "*://ieeexplore.ieee.org/document/*",
            "*://ieeexplore.ieee.org/abstract/document/*",
            "*://ieeexplore.ieee.org/stamp/stamp.jsp*",
        ]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }
}
