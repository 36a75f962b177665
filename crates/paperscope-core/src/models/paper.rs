use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::keys;

/// User verdict on a paper, as sent by the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Thumbsup,
    Thumbsdown,
    Novote,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thumbsup => write!(f, "thumbsup"),
            Self::Thumbsdown => write!(f, "thumbsdown"),
            Self::Novote => write!(f, "novote"),
        }
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbsup" => Ok(Self::Thumbsup),
            "thumbsdown" => Ok(Self::Thumbsdown),
            "novote" => Ok(Self::Novote),
            _ => Err(format!("Invalid rating: {s}")),
        }
    }
}

/// `(source_id, paper_id)`, the identity of a paper across sessions and storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperIdentity {
    pub source_id: String,
    pub paper_id: String,
}

impl PaperIdentity {
    pub fn new(source_id: impl Into<String>, paper_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            paper_id: paper_id.into(),
        }
    }

    /// Storage key of the primary record: `paper:<source>.<paper>`.
    pub fn paper_key(&self) -> String {
        keys::paper_key(&self.source_id, &self.paper_id)
    }
}

impl fmt::Display for PaperIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source_id, self.paper_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperMetadata {
    pub source_id: String,
    pub paper_id: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub title: String,

    /// Authors joined with `", "` in document order.
    #[serde(default)]
    pub authors: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub published_date: String,

    #[serde(default)]
    pub doi: String,

    #[serde(default)]
    pub journal_name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub rating: Option<Rating>,

    #[serde(default)]
    pub manually_read: Option<NaiveDate>,
}

impl PaperMetadata {
    pub fn new(source_id: impl Into<String>, paper_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            paper_id: paper_id.into(),
            ..Self::default()
        }
    }

    pub fn identity(&self) -> PaperIdentity {
        PaperIdentity::new(self.source_id.clone(), self.paper_id.clone())
    }

    pub fn paper_key(&self) -> String {
        keys::paper_key(&self.source_id, &self.paper_id)
    }

    pub fn author_list(&self) -> Vec<String> {
        self.authors
            .split(", ")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Merge a freshly extracted record into a persisted one.
    ///
    /// Bibliographic fields take the incoming value when it is non-empty.
    /// `rating` and `manually_read` are only filled when unset here, since
    /// they are usually written out-of-band. Returns whether anything changed.
    pub fn merge_from(&mut self, incoming: &PaperMetadata) -> bool {
        let before = self.clone();

        merge_text(&mut self.url, &incoming.url);
        merge_text(&mut self.title, &incoming.title);
        merge_text(&mut self.authors, &incoming.authors);
        merge_text(&mut self.description, &incoming.description);
        merge_text(&mut self.published_date, &incoming.published_date);
        merge_text(&mut self.doi, &incoming.doi);
        merge_text(&mut self.journal_name, &incoming.journal_name);
        if !incoming.tags.is_empty() {
            self.tags = incoming.tags.clone();
        }
        if self.rating.is_none() {
            self.rating = incoming.rating;
        }
        if self.manually_read.is_none() {
            self.manually_read = incoming.manually_read;
        }

        *self != before
    }
}

fn merge_text(target: &mut String, incoming: &str) {
    let incoming = incoming.trim();
    if !incoming.is_empty() && target != incoming {
        *target = incoming.to_string();
    }
}
