//! Paperscope Science: page extraction and site integrations.

pub mod error;
pub mod extract;
pub mod http;
pub mod identifiers;
pub mod integrations;
pub mod registry;

pub use error::{Result, ScienceError};
pub use extract::{Field, MetadataExtractor, Rule, RuleSet};
pub use http::PageFetcher;
pub use identifiers::{Doi, normalize_url, url_hash};
pub use integrations::SourceIntegration;
pub use registry::{ExtractedPaper, SourceRegistry};
