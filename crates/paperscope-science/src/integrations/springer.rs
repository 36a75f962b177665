use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"link\.springer\.com/(?:article|chapter|referenceworkentry)/(10\.\d{4,9}/[^?#\s]+)",
        r"link\.springer\.com/content/pdf/(10\.\d{4,9}/[^?#\s]+?)\.pdf",
    ])
});

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [
                Rule::Meta("meta[name='citation_title']"),
                Rule::Text("h1.c-article-title"),
            ],
        )
        .with(
            Field::Authors,
            [
                Rule::MetaAll("meta[name='citation_author']"),
                Rule::TextAll("li.c-article-author-list__item a[data-test='author-name']"),
            ],
        )
        .with(
            Field::Description,
            [
                Rule::Text("#Abs1-content"),
                Rule::Meta("meta[name='dc.description']"),
            ],
        )
        .with(
            Field::PublishedDate,
            [
                Rule::Meta("meta[name='citation_publication_date']"),
                Rule::Meta("meta[name='citation_online_date']"),
            ],
        )
        .with(
            Field::JournalName,
            [
                Rule::Meta("meta[name='citation_journal_title']"),
                Rule::Meta("meta[name='citation_inbook_title']"),
            ],
        )
        .with(
            Field::Tags,
            [
                Rule::Meta("meta[name='citation_keywords']"),
                Rule::TextAll("li.c-article-subject-list__subject"),
            ],
        )
        .split_tags_on(&[',', ';'])
});

/// SpringerLink articles and book chapters.
pub struct SpringerIntegration;

impl SourceIntegration for SpringerIntegration {
    fn id(&self) -> &'static str {
        "springer"
    }

    fn name(&self) -> &'static str {
        "Springer"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &[
            "*://link.springer.com/article/*",
            "*://link.springer.com/chapter/*",
            "*://link.springer.com/content/pdf/*",
        ]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }
}
