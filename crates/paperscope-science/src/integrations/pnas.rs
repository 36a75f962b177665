use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[r"pnas\.org/doi/(?:abs/|full/|pdf/|epdf/|reader/)?(10\.\d{4,9}/[^?#\s]+)"])
});

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [Rule::Meta("meta[name='dc.Title'], meta[name='dc.title']")],
        )
        .with(
            Field::Authors,
            [Rule::MetaAll("meta[name='dc.Creator'], meta[name='dc.creator']")],
        )
        .with(
            Field::Description,
            [
                Rule::Meta("meta[name='dc.Description'], meta[name='dc.description']"),
                Rule::Text("#abstract div[role='paragraph']"),
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
        .with(Field::JournalName, [Rule::Const("PNAS")])
        .with(
            Field::Tags,
            [Rule::MetaAll("meta[name='dc.Subject'], meta[name='dc.subject']")],
        )
        .split_tags_on(&[',', ';'])
});

/// Proceedings of the National Academy of Sciences.
pub struct PnasIntegration;

impl SourceIntegration for PnasIntegration {
    fn id(&self) -> &'static str {
        "pnas"
    }

    fn name(&self) -> &'static str {
        "PNAS"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &["*://www.pnas.org/doi/*"]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::test_support::run;

    #[test]
    fn paper_id_is_doi() {
        let p = PnasIntegration;
        for url in [
            "https://www.pnas.org/doi/10.1073/pnas.2218523120",
            "https://www.pnas.org/doi/abs/10.1073/pnas.2218523120",
            "https://www.pnas.org/doi/pdf/10.1073/pnas.2218523120?download=true",
            "https://www.pnas.org/doi/full/10.1073/pnas.2218523120/",
        ] {
            assert_eq!(
                p.extract_paper_id(url).as_deref(),
                Some("10.1073/pnas.2218523120"),
                "{url}"
            );
        }
    }

    #[test]
    fn dublin_core_page() {
        let html = r#"<head>
            <meta name="dc.Title" content="Emergent abilities">
            <meta name="dc.Creator" content="A. Smith">
            <meta name="dc.Creator" content="B. Lee">
            <meta name="dc.Date" content="2023-05-01">
            <meta name="dc.Identifier" scheme="doi" content="10.1073/pnas.2218523120">
            <meta name="dc.Subject" content="language models; scaling">
            <meta property="og:site_name" content="Proceedings of the National Academy of Sciences">
        </head>"#;
        let meta = run(&PnasIntegration, "https://www.pnas.org/doi/10.1073/pnas.2218523120", html);
        assert_eq!(meta.title, "Emergent abilities");
        assert_eq!(meta.authors, "A. Smith, B. Lee");
        assert_eq!(meta.published_date, "2023-05-01");
        assert_eq!(meta.doi, "10.1073/pnas.2218523120");
        assert_eq!(meta.journal_name, "PNAS");
        assert_eq!(meta.tags, vec!["language models", "scaling"]);
    }
}
