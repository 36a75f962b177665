pub mod doi;
pub mod url;

pub use doi::Doi;
pub use url::{normalize_url, url_hash};
