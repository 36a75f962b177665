//! Object key conventions for the store.
//!
//! Primary records live under `paper:<id>` or `paper.<id>`; the matching
//! interaction log swaps the prefix for `interactions` and keeps the delimiter.

use crate::error::{PaperscopeError, Result};

pub const PAPER_PREFIX: &str = "paper";
pub const INTERACTIONS_PREFIX: &str = "interactions";

pub fn paper_key(source_id: &str, paper_id: &str) -> String {
    format!("{PAPER_PREFIX}:{source_id}.{paper_id}")
}

/// Interaction-log key for a primary paper key, or `None` if the key does not
/// follow either delimiter convention.
pub fn interaction_key_for(paper_key: &str) -> Option<String> {
    [':', '.'].into_iter().find_map(|delim| {
        paper_key
            .strip_prefix(PAPER_PREFIX)
            .and_then(|rest| rest.strip_prefix(delim))
            .filter(|id| !id.is_empty())
            .map(|id| format!("{INTERACTIONS_PREFIX}{delim}{id}"))
    })
}

pub fn validate_paper_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(PaperscopeError::InvalidKey("paper key must not be empty".into()));
    }
    Ok(key)
}
