use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| patterns(&[r"nature\.com/articles/([A-Za-z0-9\-._]+?)(?:\.pdf)?(?:[?#/]|$)"]));

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [
                Rule::Meta("meta[name='citation_title']"),
                Rule::Meta("meta[name='dc.title']"),
            ],
        )
        .with(
            Field::Authors,
            [
                Rule::MetaAll("meta[name='citation_author']"),
                Rule::MetaAll("meta[name='dc.creator']"),
            ],
        )
        .with(
            Field::Description,
            [
                Rule::Meta("meta[name='dc.description']"),
                Rule::Text("#Abs1-content"),
            ],
        )
        .with(
            Field::PublishedDate,
            [
                Rule::Meta("meta[name='citation_publication_date']"),
                Rule::Meta("meta[name='dc.date']"),
            ],
        )
        .with(
            Field::JournalName,
            [
                Rule::Meta("meta[name='citation_journal_title']"),
                Rule::Meta("meta[name='prism.publicationName']"),
            ],
        )
        .with(
            Field::Tags,
            [
                Rule::MetaAll("meta[name='dc.subject']"),
                Rule::Meta("meta[name='citation_keywords']"),
            ],
        )
});

/// nature.com and its sister journals.
pub struct NatureIntegration;

impl SourceIntegration for NatureIntegration {
    fn id(&self) -> &'static str {
        "nature"
    }

    fn name(&self) -> &'static str {
        "Nature"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &["*://www.nature.com/articles/*"]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }
}
