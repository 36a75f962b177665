use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"dl\.acm\.org/doi/(?:abs/|full/|fullHtml/|pdf/|epdf/|book/)?(10\.\d{4,9}/[^?#\s]+)",
    ])
});

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [
                Rule::Meta("meta[name='dc.Title'], meta[name='dc.title']"),
                Rule::Text("h1.citation__title"),
            ],
        )
        .with(
            Field::Authors,
            [
                Rule::MetaAll("meta[name='dc.Creator'], meta[name='dc.creator']"),
                Rule::TextAll(".loa__author-name span"),
            ],
        )
        .with(
            Field::Description,
            [
                Rule::Meta("meta[name='dc.Description'], meta[name='dc.description']"),
                Rule::Text("div.abstractSection"),
            ],
        )
        .with(
            Field::PublishedDate,
            [Rule::Meta("meta[name='dc.Date'], meta[name='dc.date']")],
        )
        .with(
            Field::Doi,
            [Rule::Meta("meta[name='dc.Identifier'][scheme='doi']")],
        )
        .with(
            Field::JournalName,
            [
                Rule::Meta("meta[name='citation_journal_title']"),
                Rule::Text(".issue-item__detail a"),
            ],
        )
        .with(
            Field::Tags,
            [Rule::Meta("meta[name='keywords']"), Rule::TextAll("ol.rlist.organizational-chart a")],
        )
        .split_tags_on(&[',', ';'])
});

/// ACM Digital Library.
pub struct AcmIntegration;

impl SourceIntegration for AcmIntegration {
    fn id(&self) -> &'static str {
        "acm"
    }

    fn name(&self) -> &'static str {
        "ACM Digital Library"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &["*://dl.acm.org/doi/*"]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }
}
