//! Shared rule tiers evaluated after the source-specific overrides:
//! OpenGraph/social meta first, then generic conventions any page may carry.

use scraper::Html;

use crate::extract::Field;
use crate::extract::rule::{Rule, select};
use crate::identifiers::Doi;

pub(crate) fn opengraph(field: Field) -> &'static [Rule] {
    match field {
        Field::Title => &[
            Rule::Meta("meta[property='og:title']"),
            Rule::Meta("meta[name='twitter:title']"),
        ],
        Field::Authors => &[Rule::MetaAll("meta[property='article:author']")],
        Field::Description => &[
            Rule::Meta("meta[property='og:description']"),
            Rule::Meta("meta[name='twitter:description']"),
        ],
        Field::PublishedDate => &[
            Rule::Meta("meta[property='article:published_time']"),
            Rule::Meta("meta[property='og:published_time']"),
        ],
        Field::Doi => &[],
        Field::JournalName => &[Rule::Meta("meta[property='og:site_name']")],
        Field::Tags => &[Rule::MetaAll("meta[property='article:tag']")],
    }
}

const BASE_DOI: &[Rule] = &[
    Rule::Meta("meta[name='citation_doi']"),
    Rule::Meta("meta[name='dc.identifier'], meta[name='DC.identifier']"),
    Rule::Custom(doi_from_links),
];

pub(crate) fn base(field: Field) -> &'static [Rule] {
    match field {
        Field::Title => &[
            Rule::Meta("meta[name='citation_title']"),
            Rule::Meta("meta[name='dc.title'], meta[name='DC.title']"),
            Rule::Text("title"),
            Rule::Text("h1"),
        ],
        Field::Authors => &[
            Rule::MetaAll("meta[name='citation_author']"),
            Rule::MetaAll("meta[name='dc.creator'], meta[name='DC.creator']"),
            Rule::MetaAll("meta[name='author']"),
        ],
        Field::Description => &[
            Rule::Meta("meta[name='citation_abstract']"),
            Rule::Meta("meta[name='dc.description'], meta[name='DC.description']"),
            Rule::Meta("meta[name='description']"),
        ],
        Field::PublishedDate => &[
            Rule::Meta("meta[name='citation_publication_date']"),
            Rule::Meta("meta[name='citation_date']"),
            Rule::Meta("meta[name='dc.date'], meta[name='DC.date']"),
            Rule::Meta("meta[itemprop='datePublished']"),
            Rule::Attr("time[datetime]", "datetime"),
        ],
        Field::Doi => BASE_DOI,
        Field::JournalName => &[
            Rule::Meta("meta[name='citation_journal_title']"),
            Rule::Meta("meta[name='citation_conference_title']"),
            Rule::Meta("meta[name='citation_publisher']"),
        ],
        Field::Tags => &[
            Rule::MetaAll("meta[name='citation_keywords']"),
            Rule::Meta("meta[name='keywords']"),
        ],
    }
}

/// First DOI found in a resolver link.
fn doi_from_links(document: &Html) -> Option<String> {
    select(document, "a[href*='doi.org/10.']")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .find_map(Doi::find_in_text)
        .map(|doi| doi.normalized)
}
