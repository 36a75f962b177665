use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"arxiv\.org/(?:abs|pdf|html)/(\d{4}\.\d{4,5})(?:v\d+)?",
        r"arxiv\.org/(?:abs|pdf)/([a-z\-]+(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?",
    ])
});

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [Rule::Meta("meta[name='citation_title']"), Rule::Text("h1.title")],
        )
        .with(
            Field::Authors,
            [
                Rule::MetaAll("meta[name='citation_author']"),
                Rule::TextAll("div.authors a"),
            ],
        )
        .with(
            Field::Description,
            [
                Rule::Text("blockquote.abstract"),
                Rule::Meta("meta[name='citation_abstract']"),
            ],
        )
        .with(
            Field::PublishedDate,
            [
                Rule::Meta("meta[name='citation_date']"),
                Rule::Meta("meta[name='citation_online_date']"),
            ],
        )
        .with(
            Field::Doi,
            [Rule::Meta("meta[name='citation_doi']"), Rule::Text(".arxivdoi a")],
        )
        .with(Field::JournalName, [Rule::Const("arXiv")])
        .with(Field::Tags, [Rule::Text("td.subjects")])
        .split_tags_on(&[';'])
});

/// arXiv abstract, PDF and HTML pages.
pub struct ArxivIntegration;

impl SourceIntegration for ArxivIntegration {
    fn id(&self) -> &'static str {
        "arxiv"
    }

    fn name(&self) -> &'static str {
        "arXiv"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &["*://arxiv.org/abs/*", "*://arxiv.org/pdf/*", "*://arxiv.org/html/*"]
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
    fn paper_ids() {
        let a = ArxivIntegration;
        assert_eq!(
            a.extract_paper_id("https://arxiv.org/abs/2301.04567v2").as_deref(),
            Some("2301.04567")
        );
        assert_eq!(
            a.extract_paper_id("https://arxiv.org/pdf/1706.03762").as_deref(),
            Some("1706.03762")
        );
        assert_eq!(
            a.extract_paper_id("https://arxiv.org/abs/hep-th/9901001v1").as_deref(),
            Some("hep-th/9901001")
        );
        assert!(!a.can_handle_url("https://example.com/abs/2301.04567"));
    }

    #[test]
    fn abstract_page() {
        let html = r#"<html><head>
            <meta name="citation_title" content="Attention Is All You Need">
            <meta name="citation_author" content="Vaswani, Ashish">
            <meta name="citation_author" content="Shazeer, Noam">
            <meta name="citation_date" content="2017/06/12">
            <meta name="citation_doi" content="10.48550/arXiv.1706.03762">
        </head><body>
            <blockquote class="abstract">Abstract: The dominant sequence transduction models...</blockquote>
            <table><tr><td class="subjects">Computation and Language (cs.CL); Machine Learning (cs.LG)</td></tr></table>
        </body></html>"#;
        let meta = run(&ArxivIntegration, "https://arxiv.org/abs/1706.03762", html);
        assert_eq!(meta.source_id, "arxiv");
        assert_eq!(meta.paper_id, "1706.03762");
        assert_eq!(meta.title, "Attention Is All You Need");
        assert_eq!(meta.authors, "Vaswani, Ashish, Shazeer, Noam");
        assert_eq!(meta.description, "The dominant sequence transduction models...");
        assert_eq!(meta.published_date, "2017-06-12");
        assert_eq!(meta.doi, "10.48550/arxiv.1706.03762");
        assert_eq!(meta.journal_name, "arXiv");
        assert_eq!(
            meta.tags,
            vec!["Computation and Language (cs.CL)", "Machine Learning (cs.LG)"]
        );
    }

    #[test]
    fn dom_fallbacks() {
        let html = r#"<body>
            <h1 class="title">Title: Sparse Transformers</h1>
            <div class="authors"><a>Rewon Child</a>, <a>Scott Gray</a></div>
        </body>"#;
        let meta = run(&ArxivIntegration, "https://arxiv.org/abs/1904.10509", html);
        assert_eq!(meta.title, "Sparse Transformers");
        assert_eq!(meta.authors, "Rewon Child, Scott Gray");
    }
}
