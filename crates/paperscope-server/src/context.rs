use std::sync::Arc;

use paperscope_core::{AppConfig, FileStore, ObjectStore, PaperManager, StoreCredentials};
use tracing::info;

use crate::trust::TrustPolicy;

/// Builds the store for a set of credentials.
pub type StoreFactory = Box<dyn Fn(&StoreCredentials) -> Arc<dyn ObjectStore> + Send + Sync>;

/// File-backed store per owner/repo under the configured data dir.
pub fn file_store_factory(config: &AppConfig) -> StoreFactory {
    let config = config.clone();
    Box::new(move |credentials: &StoreCredentials| -> Arc<dyn ObjectStore> {
        let dir = config.store_dir(credentials);
        info!(path = %dir.display(), "opening file store");
        Arc::new(FileStore::new(dir))
    })
}

/// Everything tied to one set of store credentials. Replaced as a whole when
/// credentials change; handlers hold an `Arc` to the context they started
/// with.
pub struct StoreContext {
    credentials: StoreCredentials,
    papers: PaperManager,
    trust: TrustPolicy,
}

impl StoreContext {
    pub fn new(credentials: StoreCredentials, store: Arc<dyn ObjectStore>, local_hosts: &[String]) -> Self {
        let trust = TrustPolicy::new(local_hosts.to_vec())
            .with_pages_site(&credentials.owner, &credentials.repo);
        Self {
            papers: PaperManager::new(store),
            credentials,
            trust,
        }
    }

    pub fn credentials(&self) -> &StoreCredentials {
        &self.credentials
    }

    pub fn papers(&self) -> &PaperManager {
        &self.papers
    }

    pub fn trust(&self) -> &TrustPolicy {
        &self.trust
    }
}
