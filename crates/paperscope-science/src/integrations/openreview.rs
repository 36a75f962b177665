use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

use crate::extract::rule::select;
use crate::extract::{Field, Rule, RuleSet};
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[r"openreview\.net/(?:forum|pdf)\?(?:[^#]*&)?id=([A-Za-z0-9_\-]+)"])
});

static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new()
        .with(
            Field::Title,
            [Rule::Meta("meta[name='citation_title']"), Rule::Custom(note_title)],
        )
        .with(
            Field::Authors,
            [
                Rule::MetaAll("meta[name='citation_author']"),
                Rule::Custom(note_authors),
            ],
        )
        .with(
            Field::Description,
            [
                Rule::Meta("meta[name='citation_abstract']"),
                Rule::Custom(note_abstract),
            ],
        )
        .with(
            Field::PublishedDate,
            [
                Rule::Meta("meta[name='citation_online_date']"),
                Rule::Meta("meta[name='citation_publication_date']"),
            ],
        )
        .with(
            Field::JournalName,
            [
                Rule::Meta("meta[name='citation_conference_title']"),
                Rule::Custom(note_venue),
                Rule::Const("OpenReview"),
            ],
        )
        .with(Field::Tags, [Rule::Custom(note_keywords)])
});

/// Field of the forum note in the page's `__NEXT_DATA__` payload. Newer notes
/// wrap every value as `{"value": ...}`.
fn note_field(document: &Html, key: &str) -> Option<String> {
    let script = select(document, "script#__NEXT_DATA__").into_iter().next()?;
    let payload: Value = serde_json::from_str(&script.text().collect::<String>()).ok()?;
    let field = payload.pointer(&format!("/props/pageProps/forumNote/content/{key}"))?;
    let field = field.get("value").unwrap_or(field);
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn note_title(document: &Html) -> Option<String> {
    note_field(document, "title")
}

fn note_authors(document: &Html) -> Option<String> {
    note_field(document, "authors")
}

fn note_abstract(document: &Html) -> Option<String> {
    note_field(document, "abstract")
}

fn note_venue(document: &Html) -> Option<String> {
    note_field(document, "venue")
}

fn note_keywords(document: &Html) -> Option<String> {
    note_field(document, "keywords")
}

pub struct OpenReviewIntegration;

impl SourceIntegration for OpenReviewIntegration {
    fn id(&self) -> &'static str {
        "openreview"
    }

    fn name(&self) -> &'static str {
        "OpenReview"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &["*://openreview.net/forum*", "*://openreview.net/pdf*"]
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
        let o = OpenReviewIntegration;
        assert_eq!(
            o.extract_paper_id("https://openreview.net/forum?id=YicbFdNTTy").as_deref(),
            Some("YicbFdNTTy")
        );
        assert_eq!(
            o.extract_paper_id("https://openreview.net/pdf?noteId=x&id=rJ4km2R5t7").as_deref(),
            Some("rJ4km2R5t7")
        );
        assert!(!o.can_handle_url("https://openreview.net/group?id=ICLR.cc"));
    }

    #[test]
    fn meta_tags_first() {
        let html = r#"<head>
            <meta name="citation_title" content="An Image is Worth 16x16 Words">
            <meta name="citation_author" content="Alexey Dosovitskiy">
            <meta name="citation_author" content="Lucas Beyer">
            <meta name="citation_online_date" content="2020/10/02">
        </head>"#;
        let meta = run(&OpenReviewIntegration, "https://openreview.net/forum?id=YicbFdNTTy", html);
        assert_eq!(meta.title, "An Image is Worth 16x16 Words");
        assert_eq!(meta.authors, "Alexey Dosovitskiy, Lucas Beyer");
        assert_eq!(meta.published_date, "2020-10-02");
        assert_eq!(meta.journal_name, "OpenReview");
    }

    #[test]
    fn embedded_note_payload() {
        let html = r#"<body><script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"forumNote":{"content":{
                "title":{"value":"Decoupled Weight Decay"},
                "authors":{"value":["Ilya Loshchilov","Frank Hutter"]},
                "abstract":"L2 regularization and weight decay...",
                "venue":{"value":"ICLR 2019"},
                "keywords":{"value":["optimization","adam"]}
            }}}}}
        </script></body>"#;
        let meta = run(&OpenReviewIntegration, "https://openreview.net/forum?id=Bkg6RiCqY7", html);
        assert_eq!(meta.title, "Decoupled Weight Decay");
        assert_eq!(meta.authors, "Ilya Loshchilov, Frank Hutter");
        assert_eq!(meta.description, "L2 regularization and weight decay...");
        assert_eq!(meta.journal_name, "ICLR 2019");
        assert_eq!(meta.tags, vec!["optimization", "adam"]);
    }
}
