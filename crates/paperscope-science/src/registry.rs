//! Ordered routing of page URLs to integrations.

use std::collections::HashSet;

use paperscope_core::{PaperIdentity, PaperMetadata};
use scraper::Html;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ScienceError};
use crate::integrations::{
    AclAnthologyIntegration, AcmIntegration, ArxivIntegration, IeeeIntegration, MiscIntegration,
    NatureIntegration, NewspaperIntegration, OpenReviewIntegration, PnasIntegration,
    SourceIntegration, SpringerIntegration, extract_metadata,
};

/// Result of running the full extraction flow over one page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPaper {
    pub integration_id: String,
    pub metadata: PaperMetadata,
}

/// Integrations in registration order. The catch-all is held apart so it is
/// always consulted last; overlapping URL spaces resolve to whichever was
/// registered first.
pub struct SourceRegistry {
    integrations: Vec<Box<dyn SourceIntegration>>,
    catch_all: Box<dyn SourceIntegration>,
}

impl SourceRegistry {
    pub fn new(catch_all: Box<dyn SourceIntegration>) -> Self {
        Self {
            integrations: Vec::new(),
            catch_all,
        }
    }

    /// Every built-in site family, most specific first, with `misc` as the
    /// catch-all.
    pub fn with_defaults() -> Self {
        let defaults: Vec<Box<dyn SourceIntegration>> = vec![
            Box::new(ArxivIntegration),
            Box::new(OpenReviewIntegration),
            Box::new(NatureIntegration),
            Box::new(PnasIntegration),
            Box::new(IeeeIntegration),
            Box::new(AcmIntegration),
            Box::new(SpringerIntegration),
            Box::new(AclAnthologyIntegration),
            Box::new(NewspaperIntegration),
        ];
        Self {
            integrations: defaults,
            catch_all: Box::new(MiscIntegration),
        }
    }

    /// Append `integration` ahead of the catch-all.
    pub fn register(&mut self, integration: Box<dyn SourceIntegration>) -> Result<()> {
        let id = integration.id();
        if self.get(id).is_some() {
            return Err(ScienceError::DuplicateIntegration(id.to_string()));
        }
        self.integrations.push(integration);
        Ok(())
    }

    /// First integration whose patterns match, else the catch-all.
    pub fn resolve(&self, url: &str) -> &dyn SourceIntegration {
        let found = self
            .integrations
            .iter()
            .find(|i| i.can_handle_url(url))
            .map(|i| i.as_ref())
            .unwrap_or(self.catch_all.as_ref());
        debug!(url, integration = found.id(), "resolved");
        found
    }

    pub fn get(&self, id: &str) -> Option<&dyn SourceIntegration> {
        self.iter().find(|i| i.id() == id)
    }

    /// Ids in consultation order, catch-all last.
    pub fn ids(&self) -> Vec<&'static str> {
        self.iter().map(|i| i.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SourceIntegration> {
        self.integrations
            .iter()
            .map(|i| i.as_ref())
            .chain(std::iter::once(self.catch_all.as_ref()))
    }

    /// De-duplicated union of every integration's match globs, in
    /// registration order.
    pub fn content_script_matches(&self) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        self.iter()
            .flat_map(|i| i.content_script_matches().iter().copied())
            .filter(|m| seen.insert(*m))
            .collect()
    }

    /// Identity the page at `url` would be recorded under. The catch-all
    /// guarantees one for every URL.
    pub fn resolve_identity(&self, url: &str) -> PaperIdentity {
        let integration = self.resolve(url);
        PaperIdentity::new(integration.id(), self.paper_id_for(integration, url))
    }

    fn paper_id_for(&self, integration: &dyn SourceIntegration, url: &str) -> String {
        integration
            .extract_paper_id(url)
            .or_else(|| self.catch_all.extract_paper_id(url))
            .unwrap_or_default()
    }

    /// Resolve, parse and extract. Never fails: missing fields stay empty.
    pub fn extract(&self, url: &str, html: &str) -> ExtractedPaper {
        let integration = self.resolve(url);
        let document = Html::parse_document(html);
        let paper_id = self.paper_id_for(integration, url);
        ExtractedPaper {
            integration_id: integration.id().to_string(),
            metadata: extract_metadata(integration, url, paper_id, &document),
        }
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
