use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"aclanthology\.org/(\d{4}\.[a-z0-9\-]+\.\d+|[A-Z]\d{2}-\d{4})(?:\.pdf)?",
        r"aclweb\.org/anthology/(\d{4}\.[a-z0-9\-]+\.\d+|[A-Z]\d{2}-\d{4})(?:\.pdf)?",
    ])
});

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [Rule::Meta("meta[name='citation_title']"), Rule::Text("h2#title")],
        )
        .with(Field::Authors, [Rule::MetaAll("meta[name='citation_author']")])
        .with(Field::Description, [Rule::Text("div.acl-abstract span")])
        .with(
            Field::JournalName,
            [
                Rule::Meta("meta[name='citation_conference_title']"),
                Rule::Meta("meta[name='citation_journal_title']"),
            ],
        )
});

/// ACL Anthology: new-style ids (`2020.acl-main.1`) and legacy ones (`P19-1001`).
pub struct AclAnthologyIntegration;

impl SourceIntegration for AclAnthologyIntegration {
    fn id(&self) -> &'static str {
        "aclanthology"
    }

    fn name(&self) -> &'static str {
        "ACL Anthology"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &["*://aclanthology.org/*", "*://www.aclweb.org/anthology/*"]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }
}
