use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::RuleSet;
use crate::identifiers::url_hash;
use crate::integrations::{SourceIntegration, patterns};

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| patterns(&[r"(?i)^https?://[^\s/?#]+"]));

static RULES: Lazy<RuleSet> = Lazy::new(RuleSet::new);

/// Catch-all for any web page: OpenGraph and generic markers only, paper id
/// from the URL hash.
pub struct MiscIntegration;

impl SourceIntegration for MiscIntegration {
    fn id(&self) -> &'static str {
        "misc"
    }

    fn name(&self) -> &'static str {
        "Web page"
    }

    fn url_patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn content_script_matches(&self) -> &'static [&'static str] {
        &[]
    }

    fn rules(&self) -> &RuleSet {
        &RULES
    }

    /// Always yields an id; unparseable input is hashed as-is.
    fn extract_paper_id(&self, url: &str) -> Option<String> {
        Some(url_hash(url))
    }
}
