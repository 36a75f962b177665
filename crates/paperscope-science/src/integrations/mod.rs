//! Per-site integrations: URL matching, paper-id derivation and the rule
//! overrides used to read each site's metadata.

use paperscope_core::PaperMetadata;
use regex::Regex;
use scraper::Html;

use crate::extract::{MetadataExtractor, RuleSet};

pub mod acl;
pub mod acm;
pub mod arxiv;
pub mod ieee;
pub mod misc;
pub mod nature;
pub mod newspapers;
pub mod openreview;
pub mod pnas;
pub mod springer;

pub use acl::AclAnthologyIntegration;
pub use acm::AcmIntegration;
pub use arxiv::ArxivIntegration;
pub use ieee::IeeeIntegration;
pub use misc::MiscIntegration;
pub use nature::NatureIntegration;
pub use newspapers::NewspaperIntegration;
pub use openreview::OpenReviewIntegration;
pub use pnas::PnasIntegration;
pub use springer::SpringerIntegration;

pub trait SourceIntegration: Send + Sync {
    /// Unique id, used as `source_id` on every record this integration produces.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    /// Patterns tried in order when deriving a paper id; any match routes
    /// the URL here.
    fn url_patterns(&self) -> &[Regex];

    /// Browser match globs for the page script.
    fn content_script_matches(&self) -> &'static [&'static str];

    fn rules(&self) -> &RuleSet;

    fn can_handle_url(&self, url: &str) -> bool {
        self.url_patterns().iter().any(|p| p.is_match(url))
    }

    /// Capture group 1 of the first matching pattern.
    fn extract_paper_id(&self, url: &str) -> Option<String> {
        self.url_patterns()
            .iter()
            .find_map(|p| p.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('/').to_string())
            .filter(|id| !id.is_empty())
    }

    fn create_metadata_extractor<'a>(&'a self, document: &'a Html) -> MetadataExtractor<'a> {
        MetadataExtractor::new(self.id(), document, self.rules())
    }
}

/// Run `integration` over a parsed page. `paper_id` is supplied by the caller.
pub fn extract_metadata(
    integration: &dyn SourceIntegration,
    url: &str,
    paper_id: String,
    document: &Html,
) -> PaperMetadata {
    let mut metadata = integration.create_metadata_extractor(document).extract();
    metadata.paper_id = paper_id;
    metadata.url = url.to_string();
    metadata
}

/// Compile a pattern list; panics only on a malformed literal.
pub(crate) fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("valid regex"))
        .collect()
}
