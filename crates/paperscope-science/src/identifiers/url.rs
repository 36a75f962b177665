//! URL normalization and hash-derived paper ids for pages without a
//! structural identifier.

use reqwest::Url;
use sha2::{Digest, Sha256};

/// Hex digits kept from the SHA-256 digest (64 bits).
const HASH_LEN: usize = 16;

const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "smid", "smtyp", "ref", "ref_src",
    "cmpid", "icid", "partner", "ito", "taid",
];

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name.as_str())
}

/// Canonical form used for hashing: `host[:port]/path[?sorted-query]`.
///
/// Scheme, a leading `www.`, the fragment, tracking parameters and a trailing
/// slash are dropped. Unparseable input is trimmed and lowercased instead.
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    let Ok(url) = Url::parse(input) else {
        return input.trim_end_matches('/').to_lowercase();
    };

    let host = url.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let mut out = host.to_string();
    if let Some(port) = url.port() {
        out.push_str(&format!(":{port}"));
    }
    out.push_str(url.path().trim_end_matches('/'));

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !query.is_empty() {
        query.sort();
        let joined = query
            .iter()
            .map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{k}={v}") })
            .collect::<Vec<_>>()
            .join("&");
        out.push('?');
        out.push_str(&joined);
    }
    out
}

/// Deterministic id for `url`: the first 16 hex chars of SHA-256 over the
/// normalized URL.
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(normalize_url(url).as_bytes());
    digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(HASH_LEN)
        .collect()
}
