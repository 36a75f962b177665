//! Field-level metadata extraction.
//!
//! Every field is read through one ordered chain: the source's own rules
//! (from its [`RuleSet`]), then the OpenGraph tier, then the base tier. The
//! first rule whose value survives the field's cleanup wins. A field that
//! finds nothing is left empty; extraction itself never fails.

pub mod date;
pub mod rule;
mod tiers;

use std::collections::{HashMap, HashSet};

use paperscope_core::PaperMetadata;
use scraper::Html;
use tracing::trace;

use crate::identifiers::Doi;

pub use date::normalize_date;
pub use rule::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Authors,
    Description,
    PublishedDate,
    Doi,
    JournalName,
    Tags,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Title,
        Field::Authors,
        Field::Description,
        Field::PublishedDate,
        Field::Doi,
        Field::JournalName,
        Field::Tags,
    ];
}

const DEFAULT_TAG_DELIMITERS: &[char] = &[','];

/// Per-source overrides: field → rules tried before the shared tiers.
#[derive(Debug, Clone)]
pub struct RuleSet {
    overrides: HashMap<Field, Vec<Rule>>,
    tag_delimiters: &'static [char],
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            tag_delimiters: DEFAULT_TAG_DELIMITERS,
        }
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.overrides.entry(field).or_default().extend(rules);
        self
    }

    pub fn split_tags_on(mut self, delimiters: &'static [char]) -> Self {
        self.tag_delimiters = delimiters;
        self
    }

    pub fn overrides(&self, field: Field) -> &[Rule] {
        self.overrides.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Full evaluation order for `field`.
    pub fn chain(&self, field: Field) -> impl Iterator<Item = &Rule> {
        self.overrides(field)
            .iter()
            .chain(tiers::opengraph(field))
            .chain(tiers::base(field))
    }

    pub fn tag_delimiters(&self) -> &[char] {
        self.tag_delimiters
    }
}

/// Extractor bound to one parsed document and one source's rules.
pub struct MetadataExtractor<'a> {
    source_id: &'a str,
    document: &'a Html,
    rules: &'a RuleSet,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(source_id: &'a str, document: &'a Html, rules: &'a RuleSet) -> Self {
        Self {
            source_id,
            document,
            rules,
        }
    }

    /// First cleaned, non-empty value along `field`'s chain.
    pub fn extract_field(&self, field: Field) -> Option<String> {
        self.rules.chain(field).enumerate().find_map(|(i, rule)| {
            let value = rule.evaluate(self.document)?;
            let cleaned = clean(field, &value)?;
            trace!(source = self.source_id, ?field, rule = i, "field matched");
            Some(cleaned)
        })
    }

    pub fn extract_title(&self) -> String {
        self.extract_field(Field::Title).unwrap_or_default()
    }

    pub fn extract_authors(&self) -> String {
        self.extract_field(Field::Authors).unwrap_or_default()
    }

    pub fn extract_description(&self) -> String {
        self.extract_field(Field::Description).unwrap_or_default()
    }

    pub fn extract_published_date(&self) -> String {
        self.extract_field(Field::PublishedDate).unwrap_or_default()
    }

    pub fn extract_doi(&self) -> String {
        self.extract_field(Field::Doi).unwrap_or_default()
    }

    pub fn extract_journal_name(&self) -> String {
        self.extract_field(Field::JournalName).unwrap_or_default()
    }

    pub fn extract_tags(&self) -> Vec<String> {
        self.extract_field(Field::Tags)
            .map(|raw| split_tags(&raw, self.rules.tag_delimiters()))
            .unwrap_or_default()
    }

    /// All fields. `paper_id` and `url` are left for the caller, which knows
    /// the page address.
    pub fn extract(&self) -> PaperMetadata {
        PaperMetadata {
            source_id: self.source_id.to_string(),
            title: self.extract_title(),
            authors: self.extract_authors(),
            description: self.extract_description(),
            published_date: self.extract_published_date(),
            doi: self.extract_doi(),
            journal_name: self.extract_journal_name(),
            tags: self.extract_tags(),
            ..PaperMetadata::default()
        }
    }
}

/// Field-specific cleanup; `None` sends the chain on to the next rule.
fn clean(field: Field, value: &str) -> Option<String> {
    let value = value.trim();
    let cleaned = match field {
        Field::Title => strip_label(value, "title"),
        Field::Description => strip_label(value, "abstract"),
        Field::Authors => {
            // article:author often carries profile URLs instead of names.
            if value.starts_with("http://") || value.starts_with("https://") {
                return None;
            }
            rule::strip_by_prefix(value)
        }
        Field::PublishedDate => normalize_date(value),
        Field::Doi => Doi::find_in_text(value)?.normalized,
        Field::JournalName | Field::Tags => value.to_string(),
    };
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Drop a leading `Label:` descriptor, as on arXiv abstract pages.
fn strip_label(value: &str, label: &str) -> String {
    let head = value.get(..label.len());
    if head.is_some_and(|h| h.eq_ignore_ascii_case(label)) {
        if let Some(rest) = value[label.len()..].trim_start().strip_prefix(':') {
            return rest.trim().to_string();
        }
    }
    value.to_string()
}

/// Split on any of `delimiters`, trim, drop empties and repeats.
pub fn split_tags(raw: &str, delimiters: &[char]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(|c| delimiters.contains(&c))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor_for<'a>(doc: &'a Html, rules: &'a RuleSet) -> MetadataExtractor<'a> {
        MetadataExtractor::new("test", doc, rules)
    }

    #[test]
    fn source_rule_beats_opengraph_and_base() {
        let doc = Html::parse_document(
            r#"<head>
                <title>Base title</title>
                <meta property="og:title" content="OG title">
                <meta name="citation_title" content="Citation title">
            </head>"#,
        );
        let rules = RuleSet::new().with(Field::Title, [Rule::Meta("meta[name='citation_title']")]);
        assert_eq!(extractor_for(&doc, &rules).extract_title(), "Citation title");

        // Without the override, OpenGraph outranks the base tier.
        let plain = RuleSet::new();
        assert_eq!(extractor_for(&doc, &plain).extract_title(), "OG title");
    }

    #[test]
    fn base_rule_is_last_resort() {
        let doc = Html::parse_document("<head><title>  Only a title </title></head>");
        let rules = RuleSet::new().with(Field::Title, [Rule::Meta("meta[name='citation_title']")]);
        assert_eq!(extractor_for(&doc, &rules).extract_title(), "Only a title");
    }

    #[test]
    fn empty_document_degrades_to_defaults() {
        let doc = Html::parse_document("");
        let rules = RuleSet::new();
        let meta = extractor_for(&doc, &rules).extract();
        assert_eq!(meta.source_id, "test");
        assert!(meta.title.is_empty());
        assert!(meta.authors.is_empty());
        assert!(meta.tags.is_empty());
        assert!(meta.doi.is_empty());
    }

    #[test]
    fn invalid_doi_falls_through() {
        let doc = Html::parse_document(
            r#"<head>
                <meta name="citation_doi" content="n/a">
                <meta name="dc.identifier" content="doi:10.1145/3313831.3376166">
            </head>"#,
        );
        let rules = RuleSet::new();
        assert_eq!(extractor_for(&doc, &rules).extract_doi(), "10.1145/3313831.3376166");
    }

    #[test]
    fn doi_from_resolver_link() {
        let doc = Html::parse_document(
            r#"<body><a href="https://doi.org/10.1038/nature14539">doi</a></body>"#,
        );
        let rules = RuleSet::new();
        assert_eq!(extractor_for(&doc, &rules).extract_doi(), "10.1038/nature14539");
    }

    #[test]
    fn author_urls_are_skipped() {
        let doc = Html::parse_document(
            r#"<head>
                <meta property="article:author" content="https://www.theguardian.com/profile/jane">
                <meta name="author" content="Jane Doe">
            </head>"#,
        );
        let rules = RuleSet::new();
        assert_eq!(extractor_for(&doc, &rules).extract_authors(), "Jane Doe");
    }

    #[test]
    fn author_meta_byline_prefix_stripped() {
        let doc = Html::parse_document(r#"<head><meta name="author" content="By Jane Doe"></head>"#);
        let rules = RuleSet::new().with(Field::Authors, [Rule::MetaAll("meta[name='author']")]);
        assert_eq!(extractor_for(&doc, &rules).extract_authors(), "Jane Doe");

        // Names that merely start with the letters are untouched.
        let doc = Html::parse_document(r#"<head><meta name="author" content="Byron Lee"></head>"#);
        assert_eq!(extractor_for(&doc, &RuleSet::new()).extract_authors(), "Byron Lee");
    }

    #[test]
    fn tags_split_per_source_delimiters() {
        let doc = Html::parse_document(
            r#"<head><meta name="keywords" content="deep learning; vision, ,robotics;vision"></head>"#,
        );
        let comma = RuleSet::new();
        assert_eq!(
            extractor_for(&doc, &comma).extract_tags(),
            vec!["deep learning; vision", "robotics;vision"]
        );

        let both = RuleSet::new().split_tags_on(&[',', ';']);
        assert_eq!(
            extractor_for(&doc, &both).extract_tags(),
            vec!["deep learning", "vision", "robotics"]
        );
    }

    #[test]
    fn labels_are_stripped() {
        assert_eq!(strip_label("Abstract: We study X.", "abstract"), "We study X.");
        assert_eq!(strip_label("Title:Attention", "title"), "Attention");
        assert_eq!(strip_label("Abstraction layers", "abstract"), "Abstraction layers");
    }

    #[test]
    fn published_date_is_normalized() {
        let doc = Html::parse_document(
            r#"<head><meta name="citation_publication_date" content="2017/06/12"></head>"#,
        );
        let rules = RuleSet::new();
        assert_eq!(extractor_for(&doc, &rules).extract_published_date(), "2017-06-12");
    }

    #[test]
    fn chain_order_is_overrides_then_tiers() {
        let rules = RuleSet::new().with(Field::JournalName, [Rule::Const("arXiv")]);
        let chain: Vec<_> = rules.chain(Field::JournalName).collect();
        assert!(matches!(chain[0], Rule::Const("arXiv")));
        assert!(matches!(chain[1], Rule::Meta("meta[property='og:site_name']")));
        assert_eq!(chain.len(), 1 + tiers::opengraph(Field::JournalName).len() + tiers::base(Field::JournalName).len());
    }
}
