//! Checks applied to frontend-originated writes before anything touches the
//! store.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use url::Url;

use crate::error::{Result, ServerError};

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Origins allowed to mutate stored papers: the repository's GitHub Pages
/// site and local development hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    pages: Option<(String, String)>,
    local_hosts: Vec<String>,
}

impl TrustPolicy {
    pub fn new(local_hosts: Vec<String>) -> Self {
        Self {
            pages: None,
            local_hosts: local_hosts
                .into_iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Trust `https://<owner>.github.io/<repo>`.
    pub fn with_pages_site(mut self, owner: &str, repo: &str) -> Self {
        self.pages = Some((
            format!("{}.github.io", owner.trim().to_ascii_lowercase()),
            format!("/{}", repo.trim().trim_matches('/').to_ascii_lowercase()),
        ));
        self
    }

    pub fn is_trusted(&self, sender_url: &str) -> bool {
        let Ok(url) = Url::parse(sender_url) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        if self.local_hosts.iter().any(|h| *h == host) {
            return true;
        }

        match &self.pages {
            Some((pages_host, repo_path)) if url.scheme() == "https" && host == *pages_host => {
                let path = url.path().to_ascii_lowercase();
                path == *repo_path
                    || path
                        .strip_prefix(repo_path.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            _ => false,
        }
    }

    /// Rejects a missing or untrusted sender.
    pub fn check(&self, sender_url: Option<&str>) -> Result<()> {
        match sender_url {
            Some(url) if self.is_trusted(url) => Ok(()),
            other => {
                warn!(origin = other.unwrap_or("<none>"), "rejected frontend write");
                Err(ServerError::UntrustedOrigin)
            }
        }
    }
}

/// `None` clears the date; anything else must be a real `YYYY-MM-DD` date.
pub fn parse_manually_read(value: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if !ISO_DATE.is_match(value) {
        return Err(ServerError::InvalidDate);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ServerError::InvalidDate)
}
