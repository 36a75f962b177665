//! Long-lived process state and the handler for every incoming message.
//!
//! In-memory state sits behind `std::sync::Mutex` and is only touched between
//! suspension points. A handler that awaits the store re-checks the active
//! session afterwards before attaching anything to it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use paperscope_core::{
    AppConfig, EndReason, PaperIdentity, PaperMetadata, PaperscopeError, Rating, SessionState,
    SessionSummary, SessionTracker, StoreCredentials, validate_paper_key,
};
use paperscope_science::SourceRegistry;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::context::{StoreContext, StoreFactory, file_store_factory};
use crate::error::{Result, ServerError};
use crate::messages::{BrowserEvent, Envelope, MessageSender, Reply, Request, Response};
use crate::trust::{TrustPolicy, parse_manually_read};

pub struct Background {
    config: AppConfig,
    registry: SourceRegistry,
    tracker: Mutex<SessionTracker>,
    context: Mutex<Option<Arc<StoreContext>>>,
    open_store: StoreFactory,
    started_at: DateTime<Utc>,
}

impl Background {
    pub fn new(config: AppConfig, registry: SourceRegistry, open_store: StoreFactory) -> Self {
        let credentials = config.credentials();
        let background = Self {
            config,
            registry,
            tracker: Mutex::new(SessionTracker::new()),
            context: Mutex::new(None),
            open_store,
            started_at: Utc::now(),
        };
        background.set_credentials(credentials);
        background
    }

    /// Default registry over file-backed stores.
    pub fn from_config(config: AppConfig) -> Self {
        let factory = file_store_factory(&config);
        Self::new(config, SourceRegistry::with_defaults(), factory)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn session_state(&self) -> SessionState {
        self.tracker().state().clone()
    }

    fn tracker(&self) -> MutexGuard<'_, SessionTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context(&self) -> Option<Arc<StoreContext>> {
        self.context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the store context wholesale. Requests already holding the old
    /// context finish against it.
    pub fn set_credentials(&self, credentials: Option<StoreCredentials>) {
        let next = credentials.map(|credentials| {
            let store = (self.open_store)(&credentials);
            Arc::new(StoreContext::new(
                credentials,
                store,
                &self.config.frontend.local_hosts,
            ))
        });
        match &next {
            Some(ctx) => info!(
                owner = %ctx.credentials().owner,
                repo = %ctx.credentials().repo,
                "store context rebuilt"
            ),
            None => info!("store context cleared"),
        }
        *self.context.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    // ─── Entry points ───────────────────────────────────────────────────────

    /// One line of `serve` input. Messages always produce a reply; events
    /// produce none.
    pub async fn handle_line(&self, line: &str) -> Option<Reply> {
        match serde_json::from_str::<Envelope>(line) {
            Ok(envelope) => self.handle_envelope(envelope).await,
            Err(e) => Some(Reply {
                id: None,
                response: Response::err(ServerError::InvalidMessage(e.to_string()).to_string()),
            }),
        }
    }

    pub async fn handle_envelope(&self, envelope: Envelope) -> Option<Reply> {
        match envelope {
            Envelope::Message {
                message,
                sender,
                id,
            } => Some(Reply {
                id,
                response: self.handle(message, &sender).await,
            }),
            Envelope::Event { event } => {
                self.handle_event(event).await;
                None
            }
        }
    }

    pub async fn handle(&self, message: Value, sender: &MessageSender) -> Response {
        let request = match serde_json::from_value::<Request>(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("rejected message: {e}");
                return Response::err(ServerError::InvalidMessage(e.to_string()).to_string());
            }
        };
        let kind = request.kind();
        match self.dispatch(request, sender).await {
            Ok(data) => {
                debug!(kind, "handled");
                Response::ok(data)
            }
            Err(e) => {
                warn!(kind, "request failed: {e}");
                Response::err(e.to_string())
            }
        }
    }

    pub async fn dispatch(&self, request: Request, sender: &MessageSender) -> Result<Value> {
        let now = Utc::now();
        match request {
            Request::PaperMetadata { metadata } | Request::ManualPaperLog { metadata } => {
                let stored = self.persist_metadata(metadata).await?;
                Ok(serde_json::to_value(stored)?)
            }
            Request::GetCurrentPaper => {
                let current = self.tracker().current_paper().cloned();
                Ok(serde_json::to_value(current)?)
            }
            Request::UpdateRating { rating, metadata } => {
                let paper = self.update_rating(rating, metadata).await?;
                Ok(serde_json::to_value(paper)?)
            }
            Request::StartSession {
                source_id,
                paper_id,
            } => {
                self.start_session(PaperIdentity::new(source_id, paper_id), sender.tab_id, now)
                    .await
            }
            Request::SessionHeartbeat => {
                let active = self.tracker().record_heartbeat(now);
                Ok(json!({ "active": active }))
            }
            Request::EndSession { reason } => {
                let summary = self
                    .end_session(EndReason::from(reason.unwrap_or_default()), now)
                    .await;
                Ok(serde_json::to_value(summary)?)
            }
            Request::FrontendUpdateManualReadStatus {
                paper_key,
                manually_read,
            } => {
                let manually_read = manually_read.as_ref().map(|v| v.as_deref());
                self.update_manual_read(&paper_key, manually_read, sender)
                    .await
            }
            Request::FrontendDeletePaper { paper_key } => {
                self.delete_paper(&paper_key, sender).await
            }
            Request::GetDiagnostics => Ok(self.diagnostics(now)),
            Request::ExtractPage { url, html } => {
                let extracted = self.registry.extract(&url, &html);
                let stored = self.persist_metadata(extracted.metadata).await?;
                Ok(json!({
                    "integrationId": extracted.integration_id,
                    "metadata": stored,
                }))
            }
        }
    }

    pub async fn handle_event(&self, event: BrowserEvent) {
        let now = Utc::now();
        match event {
            BrowserEvent::Navigated { tab_id, url } => self.on_navigated(tab_id, &url, now).await,
            BrowserEvent::TabClosed { tab_id } => {
                let summary = self.tracker().end_for_tab(tab_id, now);
                if let Some(summary) = summary {
                    self.log_summary(&summary).await;
                }
            }
            BrowserEvent::CredentialsChanged { token, owner, repo } => {
                self.set_credentials(StoreCredentials::from_parts(token, owner, repo));
            }
        }
    }

    /// End the active session if its last heartbeat is older than the
    /// configured idle timeout.
    pub async fn sweep_idle(&self, now: DateTime<Utc>) -> Option<SessionSummary> {
        let summary = self.tracker().sweep_idle(now, self.config.idle_timeout());
        if let Some(summary) = &summary {
            self.log_summary(summary).await;
        }
        summary
    }

    /// End whatever session is running before the process exits.
    pub async fn shutdown(&self) -> Option<SessionSummary> {
        self.end_session(EndReason::Explicit, Utc::now()).await
    }

    // ─── Handlers ───────────────────────────────────────────────────────────

    async fn persist_metadata(&self, metadata: PaperMetadata) -> Result<PaperMetadata> {
        let identity = metadata.identity();
        self.check_identity(&identity)?;
        self.tracker().cache_metadata(metadata.clone());

        let ctx = self.require_context()?;
        let stored = ctx.papers().get_or_create_paper(&metadata).await?;
        self.attach_if_current(&identity, &stored);
        Ok(stored)
    }

    /// The active session decides which record is rated; the payload's
    /// metadata only seeds a record that does not exist yet.
    async fn update_rating(
        &self,
        rating: Rating,
        metadata: Option<PaperMetadata>,
    ) -> Result<PaperMetadata> {
        let (identity, seed) = {
            let tracker = self.tracker();
            let identity = match tracker.active_identity() {
                Some(active) => active.clone(),
                None => {
                    let identity = metadata
                        .as_ref()
                        .map(PaperMetadata::identity)
                        .ok_or(ServerError::NoActiveSession)?;
                    self.check_identity(&identity)?;
                    identity
                }
            };
            let seed = metadata
                .filter(|m| m.identity() == identity)
                .or_else(|| tracker.cached(&identity).cloned());
            (identity, seed)
        };

        let ctx = self.require_context()?;
        let paper = ctx
            .papers()
            .update_rating(&identity, rating, seed.as_ref())
            .await?;
        self.attach_if_current(&identity, &paper);
        Ok(paper)
    }

    async fn start_session(
        &self,
        identity: PaperIdentity,
        tab_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Value> {
        self.check_identity(&identity)?;
        let started = self.tracker().start_session(identity, tab_id, now);
        if let Some(previous) = &started.replaced {
            self.log_summary(previous).await;
        }
        Ok(json!({
            "sessionId": started.session_id,
            "replaced": started.replaced,
        }))
    }

    async fn end_session(&self, reason: EndReason, now: DateTime<Utc>) -> Option<SessionSummary> {
        let summary = self.tracker().end_session(reason, now);
        if let Some(summary) = &summary {
            self.log_summary(summary).await;
        }
        summary
    }

    async fn update_manual_read(
        &self,
        paper_key: &str,
        manually_read: Option<Option<&str>>,
        sender: &MessageSender,
    ) -> Result<Value> {
        let ctx = self.context();
        self.trust_policy(ctx.as_deref()).check(sender.url.as_deref())?;
        let key = validate_paper_key(paper_key)?;
        // The field must be present: a date, or an explicit null to clear it.
        let date = parse_manually_read(manually_read.ok_or(ServerError::InvalidDate)?)?;

        let ctx = ctx.ok_or(PaperscopeError::NotConfigured)?;
        let paper = ctx.papers().set_manually_read(key, date).await?;
        self.attach_if_current(&paper.identity(), &paper);
        Ok(serde_json::to_value(paper)?)
    }

    async fn delete_paper(&self, paper_key: &str, sender: &MessageSender) -> Result<Value> {
        let ctx = self.context();
        self.trust_policy(ctx.as_deref()).check(sender.url.as_deref())?;
        let key = validate_paper_key(paper_key)?;

        let ctx = ctx.ok_or(PaperscopeError::NotConfigured)?;
        let outcome = ctx.papers().delete_paper(key).await?;
        Ok(json!({
            "paperKey": outcome.paper_key,
            "interactionsKey": outcome.interactions_key,
            "interactionsArchived": outcome.interactions_archived,
        }))
    }

    fn diagnostics(&self, now: DateTime<Utc>) -> Value {
        let ctx = self.context();
        let tracker = self.tracker();
        let state = match tracker.state() {
            SessionState::NoSession => "noSession",
            SessionState::Active(_) => "active",
            SessionState::Ended(_) => "ended",
        };
        json!({
            "sessionState": state,
            "activeSession": tracker.active(),
            "cachedPapers": tracker.cached_count(),
            "recentSessions": tracker.recent_sessions().collect::<Vec<_>>(),
            "store": ctx.as_ref().map(|c| json!({
                "owner": c.credentials().owner,
                "repo": c.credentials().repo,
            })),
            "integrations": self.registry.ids(),
            "contentScriptMatches": self.registry.content_script_matches(),
            "uptimeSeconds": (now - self.started_at).num_seconds(),
        })
    }

    async fn on_navigated(&self, tab_id: u64, url: &str, now: DateTime<Utc>) {
        let destination = self.registry.resolve_identity(url);
        let summary = {
            let mut tracker = self.tracker();
            let leaving = tracker.active().is_some_and(|session| {
                session.tab_id.is_none_or(|t| t == tab_id) && session.identity != destination
            });
            if leaving {
                tracker.end_session(EndReason::Navigation, now)
            } else {
                None
            }
        };
        if let Some(summary) = summary {
            self.log_summary(&summary).await;
        }
    }

    // ─── Helpers ────────────────────────────────────────────────────────────

    /// Both ids present, and the source is one the registry knows.
    fn check_identity(&self, identity: &PaperIdentity) -> Result<()> {
        if identity.source_id.trim().is_empty() || identity.paper_id.trim().is_empty() {
            return Err(ServerError::Validation(
                "sourceId and paperId are required".into(),
            ));
        }
        if self.registry.get(&identity.source_id).is_none() {
            return Err(ServerError::Validation(format!(
                "unknown sourceId: {}",
                identity.source_id
            )));
        }
        Ok(())
    }

    fn require_context(&self) -> Result<Arc<StoreContext>> {
        self.context()
            .ok_or(ServerError::Core(PaperscopeError::NotConfigured))
    }

    /// Without store credentials only local development hosts are trusted.
    fn trust_policy(&self, ctx: Option<&StoreContext>) -> TrustPolicy {
        match ctx {
            Some(ctx) => ctx.trust().clone(),
            None => TrustPolicy::new(self.config.frontend.local_hosts.clone()),
        }
    }

    fn attach_if_current(&self, identity: &PaperIdentity, paper: &PaperMetadata) {
        let mut tracker = self.tracker();
        if tracker.is_active_for(identity) {
            tracker.cache_metadata(paper.clone());
        } else {
            debug!(paper = %identity, "session moved on, not attaching stored record");
        }
    }

    async fn log_summary(&self, summary: &SessionSummary) {
        if summary.duration_seconds < self.config.session.min_log_seconds {
            debug!(
                paper = %summary.identity,
                seconds = summary.duration_seconds,
                "session too short to log"
            );
            return;
        }
        let Some(ctx) = self.context() else {
            debug!("store not configured, reading session not logged");
            return;
        };
        if let Err(e) = ctx.papers().log_reading_session(summary).await {
            warn!(paper = %summary.identity, "failed to log reading session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use async_trait::async_trait;
    use paperscope_core::{InteractionKind, MemoryStore, ObjectStore, StoredObject};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    const PAGES: &str = "https://owner.github.io/repo/";

    fn creds() -> StoreCredentials {
        StoreCredentials::from_parts(Some("tok".into()), Some("owner".into()), Some("repo".into()))
            .unwrap()
    }

    fn background() -> (Arc<MemoryStore>, Background) {
        let store = Arc::new(MemoryStore::new());
        let bg = background_over(store.clone());
        (store, bg)
    }

    fn background_over(store: Arc<dyn ObjectStore>) -> Background {
        let factory: StoreFactory =
            Box::new(move |_: &StoreCredentials| -> Arc<dyn ObjectStore> { store.clone() });
        let bg = Background::new(AppConfig::default(), SourceRegistry::with_defaults(), factory);
        bg.set_credentials(Some(creds()));
        bg
    }

    /// Memory store whose next `get_object` parks until `release` is
    /// notified, so other messages can run while a handler is suspended.
    #[derive(Default)]
    struct GatedStore {
        inner: MemoryStore,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ObjectStore for GatedStore {
        async fn get_object(&self, key: &str) -> paperscope_core::Result<Option<StoredObject>> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.get_object(key).await
        }

        async fn create_object(&self, key: &str, data: Value) -> paperscope_core::Result<StoredObject> {
            self.inner.create_object(key, data).await
        }

        async fn update_object(&self, key: &str, data: Value) -> paperscope_core::Result<StoredObject> {
            self.inner.update_object(key, data).await
        }

        async fn archive_object(&self, key: &str) -> paperscope_core::Result<()> {
            self.inner.archive_object(key).await
        }

        async fn list_keys(&self) -> paperscope_core::Result<Vec<String>> {
            self.inner.list_keys().await
        }
    }

    fn page() -> MessageSender {
        MessageSender::new("https://arxiv.org/abs/2301.04567").with_tab(1)
    }

    fn metadata(paper_id: &str) -> Value {
        json!({
            "sourceId": "arxiv",
            "paperId": paper_id,
            "title": format!("Paper {paper_id}"),
            "authors": "A. Smith, B. Lee"
        })
    }

    async fn send(bg: &Background, message: Value, sender: &MessageSender) -> Response {
        bg.handle(message, sender).await
    }

    #[tokio::test]
    async fn test_untrusted_origin_never_reaches_store() {
        let (store, bg) = background();
        let evil = MessageSender::new("https://evil.example/");

        let resp = send(
            &bg,
            json!({"type": "frontendDeletePaper", "paperKey": "paper:arxiv.1"}),
            &evil,
        )
        .await;
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Untrusted frontend origin"));

        let resp = send(
            &bg,
            json!({"type": "frontendUpdateManualReadStatus", "paperKey": "paper:arxiv.1", "manuallyRead": "2023-05-01"}),
            &evil,
        )
        .await;
        assert_eq!(resp.error.as_deref(), Some("Untrusted frontend origin"));

        assert_eq!(store.mutation_count(), 0);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_trusted_delete_archives_paper_and_log() {
        let (store, bg) = background();
        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "1"}), &page()).await;
        let resp = send(&bg, json!({"type": "updateRating", "rating": "thumbsup"}), &page()).await;
        assert!(resp.success, "{:?}", resp.error);

        let resp = send(
            &bg,
            json!({"type": "frontendDeletePaper", "paperKey": "paper:arxiv.1"}),
            &MessageSender::new(PAGES),
        )
        .await;
        assert!(resp.success, "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["interactionsKey"], "interactions:arxiv.1");
        assert_eq!(data["interactionsArchived"], true);
        assert_eq!(store.archived_keys(), vec!["paper:arxiv.1", "interactions:arxiv.1"]);
        assert!(store.get_object("paper:arxiv.1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_without_log_still_succeeds() {
        let (store, bg) = background();
        send(&bg, json!({"type": "paperMetadata", "metadata": metadata("2")}), &page()).await;

        let resp = send(
            &bg,
            json!({"type": "frontendDeletePaper", "paperKey": "paper:arxiv.2"}),
            &MessageSender::new("http://localhost:5173/"),
        )
        .await;
        assert!(resp.success);
        assert_eq!(resp.data.unwrap()["interactionsArchived"], false);
        assert_eq!(store.archived_keys(), vec!["paper:arxiv.2"]);
    }

    #[tokio::test]
    async fn test_delete_missing_paper_fails_before_log() {
        let (store, bg) = background();
        let resp = send(
            &bg,
            json!({"type": "frontendDeletePaper", "paperKey": "paper:arxiv.404"}),
            &MessageSender::new(PAGES),
        )
        .await;
        assert!(!resp.success);
        assert!(store.archived_keys().is_empty());
    }

    #[tokio::test]
    async fn test_manual_read_validation() {
        let (store, bg) = background();
        send(&bg, json!({"type": "paperMetadata", "metadata": metadata("3")}), &page()).await;
        let before = store.mutation_count();
        let pages = MessageSender::new(PAGES);

        let resp = send(
            &bg,
            json!({"type": "frontendUpdateManualReadStatus", "paperKey": "paper:arxiv.3", "manuallyRead": "05-01-2023"}),
            &pages,
        )
        .await;
        assert_eq!(resp.error.as_deref(), Some("Invalid manuallyRead date format"));

        let resp = send(
            &bg,
            json!({"type": "frontendUpdateManualReadStatus", "paperKey": "   ", "manuallyRead": null}),
            &pages,
        )
        .await;
        assert!(!resp.success);

        let resp = send(
            &bg,
            json!({"type": "frontendUpdateManualReadStatus", "paperKey": "paper:arxiv.3"}),
            &pages,
        )
        .await;
        assert_eq!(resp.error.as_deref(), Some("Invalid manuallyRead date format"));
        assert_eq!(store.mutation_count(), before);

        let resp = send(
            &bg,
            json!({"type": "frontendUpdateManualReadStatus", "paperKey": "paper:arxiv.3", "manuallyRead": "2023-05-01"}),
            &pages,
        )
        .await;
        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(resp.data.unwrap()["manuallyRead"], "2023-05-01");

        let resp = send(
            &bg,
            json!({"type": "frontendUpdateManualReadStatus", "paperKey": "paper:arxiv.3", "manuallyRead": null}),
            &pages,
        )
        .await;
        assert!(resp.success);
        assert!(resp.data.unwrap()["manuallyRead"].is_null());
    }

    #[tokio::test]
    async fn test_rating_targets_active_session() {
        let (store, bg) = background();
        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "1"}), &page()).await;

        let resp = send(
            &bg,
            json!({"type": "updateRating", "rating": "thumbsdown", "metadata": metadata("2")}),
            &page(),
        )
        .await;
        assert!(resp.success, "{:?}", resp.error);

        let rated = store.get_object("paper:arxiv.1").await.unwrap().unwrap();
        assert_eq!(rated.data["rating"], "thumbsdown");
        assert!(store.get_object("paper:arxiv.2").await.unwrap().is_none());

        let current = send(&bg, json!({"type": "getCurrentPaper"}), &page()).await;
        assert_eq!(current.data.unwrap()["rating"], "thumbsdown");
    }

    #[tokio::test]
    async fn test_rating_survives_session_switch_mid_write() {
        let store = Arc::new(GatedStore::default());
        let bg = background_over(store.clone());
        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "A"}), &page()).await;

        store.armed.store(true, Ordering::SeqCst);
        let rating_page = page();
        let rating = send(&bg, json!({"type": "updateRating", "rating": "thumbsup"}), &rating_page);
        let switch = async {
            store.entered.notified().await;
            let resp =
                send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "B"}), &page())
                    .await;
            store.release.notify_one();
            resp
        };
        let (rated, switched) = tokio::join!(rating, switch);
        assert!(rated.success, "{:?}", rated.error);
        assert!(switched.success, "{:?}", switched.error);
        assert_eq!(rated.data.unwrap()["paperId"], "A");

        let stored = store.inner.get_object("paper:arxiv.A").await.unwrap().unwrap();
        assert_eq!(stored.data["rating"], "thumbsup");
        assert!(store.inner.get_object("paper:arxiv.B").await.unwrap().is_none());

        let current = send(&bg, json!({"type": "getCurrentPaper"}), &page()).await;
        assert!(current.data.is_none());
    }

    #[tokio::test]
    async fn test_unknown_source_rejected_before_store() {
        let (store, bg) = background();
        let mut bogus = metadata("x");
        bogus["sourceId"] = json!("not-a-source");

        for kind in ["paperMetadata", "manualPaperLog"] {
            let resp = send(&bg, json!({"type": kind, "metadata": bogus}), &page()).await;
            assert_eq!(resp.error.as_deref(), Some("unknown sourceId: not-a-source"));
        }
        let resp = send(&bg, json!({"type": "startSession", "sourceId": "bogus", "paperId": "1"}), &page()).await;
        assert_eq!(resp.error.as_deref(), Some("unknown sourceId: bogus"));
        assert!(matches!(bg.session_state(), SessionState::NoSession));

        let resp = send(
            &bg,
            json!({"type": "updateRating", "rating": "thumbsup", "metadata": bogus}),
            &page(),
        )
        .await;
        assert!(!resp.success);

        let current = send(&bg, json!({"type": "getCurrentPaper"}), &page()).await;
        assert!(current.data.is_none());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rating_without_session_or_metadata() {
        let (_, bg) = background();
        let resp = send(&bg, json!({"type": "updateRating", "rating": "novote"}), &page()).await;
        assert_eq!(resp.error.as_deref(), Some("No active session"));
    }

    #[tokio::test]
    async fn test_metadata_then_session_attaches_cache() {
        let (_, bg) = background();
        let resp = send(&bg, json!({"type": "paperMetadata", "metadata": metadata("7")}), &page()).await;
        assert!(resp.success);

        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "7"}), &page()).await;
        let current = send(&bg, json!({"type": "getCurrentPaper"}), &page()).await;
        assert_eq!(current.data.unwrap()["title"], "Paper 7");
    }

    #[tokio::test]
    async fn test_store_not_configured() {
        let (_, bg) = background();
        bg.handle_event(BrowserEvent::CredentialsChanged {
            token: Some("tok".into()),
            owner: Some("owner".into()),
            repo: None,
        })
        .await;

        let resp = send(&bg, json!({"type": "paperMetadata", "metadata": metadata("8")}), &page()).await;
        assert_eq!(resp.error.as_deref(), Some("Store not configured"));

        // Cached in memory regardless.
        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "8"}), &page()).await;
        let current = send(&bg, json!({"type": "getCurrentPaper"}), &page()).await;
        assert_eq!(current.data.unwrap()["title"], "Paper 8");

        // Pages site is no longer trusted without credentials.
        let resp = send(
            &bg,
            json!({"type": "frontendDeletePaper", "paperKey": "paper:arxiv.8"}),
            &MessageSender::new(PAGES),
        )
        .await;
        assert_eq!(resp.error.as_deref(), Some("Untrusted frontend origin"));

        let resp = send(
            &bg,
            json!({"type": "frontendDeletePaper", "paperKey": "paper:arxiv.8"}),
            &MessageSender::new("http://localhost/"),
        )
        .await;
        assert_eq!(resp.error.as_deref(), Some("Store not configured"));
    }

    #[tokio::test]
    async fn test_session_lifecycle_messages() {
        let (_, bg) = background();
        let resp = send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "1"}), &page()).await;
        assert!(resp.data.unwrap()["replaced"].is_null());

        let resp = send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "2"}), &page()).await;
        assert_eq!(resp.data.unwrap()["replaced"]["reason"], "replaced");

        let hb = send(&bg, json!({"type": "sessionHeartbeat"}), &page()).await;
        assert_eq!(hb.data.unwrap()["active"], true);

        let end = send(&bg, json!({"type": "endSession", "reason": "explicit"}), &page()).await;
        assert_eq!(end.data.unwrap()["identity"]["paperId"], "2");

        // Idempotent, and a late heartbeat does not revive the session.
        let again = send(&bg, json!({"type": "endSession"}), &page()).await;
        assert!(again.success);
        assert!(again.data.is_none());
        let hb = send(&bg, json!({"type": "sessionHeartbeat"}), &page()).await;
        assert_eq!(hb.data.unwrap()["active"], false);
        assert!(matches!(bg.session_state(), SessionState::Ended(_)));
    }

    #[tokio::test]
    async fn test_long_session_is_logged() {
        let (store, bg) = background();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        bg.start_session(PaperIdentity::new("arxiv", "1"), Some(1), t0)
            .await
            .unwrap();
        let summary = bg
            .end_session(EndReason::Explicit, t0 + Duration::seconds(90))
            .await
            .unwrap();
        assert_eq!(summary.duration_seconds, 90);

        let log = store.get_object("interactions:arxiv.1").await.unwrap().unwrap();
        let entry = &log.data["interactions"][0];
        assert_eq!(
            serde_json::from_value::<InteractionKind>(entry["type"].clone()).unwrap(),
            InteractionKind::ReadingSession
        );
        assert_eq!(entry["data"]["duration_seconds"], 90);
    }

    #[tokio::test]
    async fn test_short_session_not_logged() {
        let (store, bg) = background();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        bg.start_session(PaperIdentity::new("arxiv", "1"), None, t0)
            .await
            .unwrap();
        bg.end_session(EndReason::Explicit, t0 + Duration::seconds(2)).await;
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_idle_sweep_uses_last_heartbeat() {
        let (store, bg) = background();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        bg.start_session(PaperIdentity::new("arxiv", "1"), None, t0)
            .await
            .unwrap();
        bg.tracker().record_heartbeat(t0 + Duration::seconds(60));

        assert!(bg.sweep_idle(t0 + Duration::seconds(120)).await.is_none());
        let summary = bg.sweep_idle(t0 + Duration::seconds(600)).await.unwrap();
        assert_eq!(summary.reason, EndReason::IdleTimeout);
        assert_eq!(summary.duration_seconds, 60);
        assert!(store.get_object("interactions:arxiv.1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_navigation_and_tab_close_end_sessions() {
        let (_, bg) = background();
        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "2301.04567"}), &page()).await;

        // Same paper, different URL shape: session continues.
        bg.handle_event(BrowserEvent::Navigated {
            tab_id: 1,
            url: "https://arxiv.org/pdf/2301.04567v2".into(),
        })
        .await;
        assert!(matches!(bg.session_state(), SessionState::Active(_)));

        // Another tab navigating does not end it.
        bg.handle_event(BrowserEvent::Navigated {
            tab_id: 9,
            url: "https://example.com/".into(),
        })
        .await;
        assert!(matches!(bg.session_state(), SessionState::Active(_)));

        bg.handle_event(BrowserEvent::Navigated {
            tab_id: 1,
            url: "https://example.com/".into(),
        })
        .await;
        match bg.session_state() {
            SessionState::Ended(summary) => assert_eq!(summary.reason, EndReason::Navigation),
            other => panic!("expected ended session, got {other:?}"),
        }

        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "1"}), &page()).await;
        bg.handle_event(BrowserEvent::TabClosed { tab_id: 1 }).await;
        match bg.session_state() {
            SessionState::Ended(summary) => assert_eq!(summary.reason, EndReason::TabClosed),
            other => panic!("expected ended session, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_every_line_gets_a_reply() {
        let (_, bg) = background();
        let reply = bg.handle_line("{not json").await.unwrap();
        assert!(!reply.response.success);

        let reply = bg
            .handle_line(r#"{"id": 4, "message": {"type": "launchMissiles"}}"#)
            .await
            .unwrap();
        assert_eq!(reply.id, Some(json!(4)));
        assert!(reply.response.error.unwrap().starts_with("Invalid message"));

        let none = bg
            .handle_line(r#"{"event": {"type": "tabClosed", "tabId": 5}}"#)
            .await;
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_extract_page_persists() {
        let (store, bg) = background();
        let html = r#"<head>
            <meta name="citation_title" content="Attention Is All You Need">
            <meta name="citation_author" content="A. Smith">
            <meta name="citation_author" content="B. Lee">
        </head>"#;
        let resp = send(
            &bg,
            json!({"type": "extractPage", "url": "https://arxiv.org/abs/1706.03762", "html": html}),
            &page(),
        )
        .await;
        assert!(resp.success, "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["integrationId"], "arxiv");
        assert_eq!(data["metadata"]["authors"], "A. Smith, B. Lee");
        assert!(store.get_object("paper:arxiv.1706.03762").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_diagnostics_snapshot() {
        let (_, bg) = background();
        send(&bg, json!({"type": "startSession", "sourceId": "arxiv", "paperId": "1"}), &page()).await;
        let resp = send(&bg, json!({"type": "getDiagnostics"}), &page()).await;
        let data = resp.data.unwrap();
        assert_eq!(data["sessionState"], "active");
        assert_eq!(data["store"]["owner"], "owner");
        assert!(!data.to_string().contains("\"tok\""));
        assert_eq!(data["integrations"].as_array().unwrap().last().unwrap(), "misc");
    }
}
