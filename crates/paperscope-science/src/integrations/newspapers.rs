use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{Field, Rule, RuleSet};
use crate::identifiers::url_hash;
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[concat!(
        r"(?i)^https?://(?:[a-z0-9\-]+\.)*",
        r"(?:nytimes\.com|washingtonpost\.com|theguardian\.com|bbc\.co\.uk|bbc\.com|wsj\.com",
        r"|reuters\.com|apnews\.com|theatlantic\.com|newyorker\.com|economist\.com|ft\.com",
        r"|bloomberg\.com|wired\.com|npr\.org|latimes\.com)",
        r"(?::\d+)?/[^?#\s]+",
    )])
});

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [Rule::Meta("meta[name='hdl']"), Rule::Text("h1[data-testid='headline']")],
        )
        .with(
            Field::Authors,
            [
                Rule::BylineMeta("meta[name='byl']"),
                Rule::Byline("[data-testid='byline']"),
                Rule::Byline(".byline"),
                Rule::Byline("[rel='author']"),
                Rule::MetaAll("meta[name='author']"),
            ],
        )
        .with(
            Field::Description,
            [Rule::Meta("meta[name='description']")],
        )
        .with(
            Field::PublishedDate,
            [
                Rule::Meta("meta[name='pdate']"),
                Rule::Meta("meta[property='article:published_time']"),
                Rule::Attr("time[datetime]", "datetime"),
            ],
        )
        .with(
            Field::Tags,
            [
                Rule::Meta("meta[name='news_keywords']"),
                Rule::Meta("meta[name='keywords']"),
            ],
        )
        .split_tags_on(&[',', ';'])
});

/// Major news outlets. Articles carry no structural id, so the paper id is a
/// hash of the normalized URL.
pub struct NewspaperIntegration;

impl SourceIntegration for NewspaperIntegration {
    fn id(&self) -> &'static str {
        "newspapers"
    }

    fn name(&self) -> &'static str {
        "Newspapers"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &[
            "*://*.nytimes.com/*",
            "*://*.washingtonpost.com/*",
            "*://*.theguardian.com/*",
            "*://*.bbc.co.uk/*",
            "*://*.bbc.com/*",
            "*://*.wsj.com/*",
            "*://*.reuters.com/*",
            "*://*.apnews.com/*",
            "*://*.theatlantic.com/*",
            "*://*.newyorker.com/*",
            "*://*.economist.com/*",
            "*://*.ft.com/*",
            "*://*.bloomberg.com/*",
            "*://*.wired.com/*",
            "*://*.npr.org/*",
            "*://*.latimes.com/*",
        ]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }

    fn extract_paper_id(&self, url: &str) -> Option<String> {
        self.can_handle_url(url).then(|| url_hash(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::test_support::run;

    const NYT: &str = "https://www.nytimes.com/2023/05/01/tech/ai.html";

    #[test]
    fn hash_id_is_stable_under_noise() {
        let n = NewspaperIntegration;
        let id = n.extract_paper_id(NYT).unwrap();
        assert_eq!(id.len(), 16);
        assert_eq!(n.extract_paper_id(NYT).unwrap(), id);
        assert_eq!(
            n.extract_paper_id("https://nytimes.com/2023/05/01/tech/ai.html/?utm_source=tw#top").unwrap(),
            id
        );
        assert_ne!(
            n.extract_paper_id("https://www.nytimes.com/2023/05/02/tech/ai.html").unwrap(),
            id
        );
    }

    #[test]
    fn host_matching() {
        let n = NewspaperIntegration;
        assert!(n.can_handle_url("https://www.theguardian.com/science/2023/may/01/x"));
        assert!(n.can_handle_url("https://edition.bbc.co.uk/news/technology-1"));
        assert!(!n.can_handle_url("https://www.nytimes.com/"));
        assert!(!n.can_handle_url("https://notnytimes.com.evil.example/article"));
        assert_eq!(n.extract_paper_id("https://example.com/2023/story"), None);
    }

    #[test]
    fn byline_meta_first() {
        let html = r#"<head>
            <meta property="og:title" content="A.I. Is Getting Better">
            <meta name="byl" content="By Cade Metz and Karen Weise">
            <meta name="pdate" content="20230501">
            <meta name="news_keywords" content="Artificial Intelligence;Google Inc,Artificial intelligence">
        </head><body><p class="byline">By Someone Else</p></body>"#;
        let meta = run(&NewspaperIntegration, NYT, html);
        assert_eq!(meta.source_id, "newspapers");
        assert_eq!(meta.paper_id.len(), 16);
        assert_eq!(meta.title, "A.I. Is Getting Better");
        assert_eq!(meta.authors, "Cade Metz and Karen Weise");
        assert_eq!(meta.published_date, "2023-05-01");
        assert_eq!(meta.tags, vec!["Artificial Intelligence", "Google Inc"]);
    }

    #[test]
    fn byline_element_then_author_meta() {
        let html = r#"<body><div class="byline">  by   Jane Doe </div></body>"#;
        assert_eq!(run(&NewspaperIntegration, NYT, html).authors, "Jane Doe");

        let html = r#"<head><meta name="author" content="John Roe"></head>"#;
        assert_eq!(run(&NewspaperIntegration, NYT, html).authors, "John Roe");
    }
}
