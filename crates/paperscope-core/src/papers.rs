//! Reconciliation of in-memory paper state with the object store.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{PaperscopeError, Result};
use crate::models::{
    Interaction, InteractionKind, InteractionLog, PaperIdentity, PaperMetadata, Rating,
    interaction_key_for, validate_paper_key,
};
use crate::session::SessionSummary;
use crate::storage::{ObjectStore, StoredObject};

/// Outcome of [`PaperManager::delete_paper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub paper_key: String,
    pub interactions_key: Option<String>,
    pub interactions_archived: bool,
}

pub struct PaperManager {
    store: Arc<dyn ObjectStore>,
}

impl PaperManager {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub async fn get_paper(&self, paper_key: &str) -> Result<Option<PaperMetadata>> {
        self.store
            .get_object(paper_key)
            .await?
            .map(|object| decode_paper(&object))
            .transpose()
    }

    /// Look up the record for `metadata`'s identity, creating it if absent.
    /// An existing record is merged with [`PaperMetadata::merge_from`] and only
    /// written back when something changed.
    pub async fn get_or_create_paper(&self, metadata: &PaperMetadata) -> Result<PaperMetadata> {
        if metadata.source_id.is_empty() || metadata.paper_id.is_empty() {
            return Err(PaperscopeError::ValidationError(
                "sourceId and paperId are required".into(),
            ));
        }
        let key = metadata.paper_key();

        match self.get_paper(&key).await? {
            Some(mut stored) => {
                if stored.merge_from(metadata) {
                    debug!(key = %key, "updating stored paper");
                    self.store
                        .update_object(&key, serde_json::to_value(&stored)?)
                        .await?;
                }
                Ok(stored)
            }
            None => {
                info!(key = %key, "creating paper record");
                self.store
                    .create_object(&key, serde_json::to_value(metadata)?)
                    .await?;
                Ok(metadata.clone())
            }
        }
    }

    /// Persist `rating` on the record for `identity`. `metadata` seeds the
    /// record when it does not exist yet; it is ignored if it describes a
    /// different paper.
    pub async fn update_rating(
        &self,
        identity: &PaperIdentity,
        rating: Rating,
        metadata: Option<&PaperMetadata>,
    ) -> Result<PaperMetadata> {
        let seed = metadata
            .filter(|m| m.identity() == *identity)
            .cloned()
            .unwrap_or_else(|| {
                PaperMetadata::new(identity.source_id.clone(), identity.paper_id.clone())
            });

        let mut paper = self.get_or_create_paper(&seed).await?;
        let key = identity.paper_key();
        paper.rating = Some(rating);
        self.store
            .update_object(&key, serde_json::to_value(&paper)?)
            .await?;
        info!(key = %key, rating = %rating, "rating updated");

        let interaction = Interaction::new(InteractionKind::Rating, json!({ "rating": rating }));
        if let Err(e) = self.log_interaction(&key, interaction).await {
            warn!(key = %key, "failed to log rating interaction: {e}");
        }
        Ok(paper)
    }

    /// Set or clear the manual read date of an existing record.
    pub async fn set_manually_read(
        &self,
        paper_key: &str,
        manually_read: Option<NaiveDate>,
    ) -> Result<PaperMetadata> {
        let key = validate_paper_key(paper_key)?;
        let mut paper = self
            .get_paper(key)
            .await?
            .ok_or_else(|| PaperscopeError::PaperNotFound(key.to_string()))?;

        paper.manually_read = manually_read;
        self.store
            .update_object(key, serde_json::to_value(&paper)?)
            .await?;
        info!(key = %key, manually_read = ?manually_read, "manual read status updated");

        let interaction = Interaction::new(
            InteractionKind::ManualRead,
            json!({ "manually_read": manually_read }),
        );
        if let Err(e) = self.log_interaction(key, interaction).await {
            warn!(key = %key, "failed to log manual read interaction: {e}");
        }
        Ok(paper)
    }

    /// Archive the paper record, then its interaction log on a best-effort basis.
    ///
    /// The interaction log is only touched after the primary archive succeeded.
    pub async fn delete_paper(&self, paper_key: &str) -> Result<DeleteOutcome> {
        let key = validate_paper_key(paper_key)?;
        self.store.archive_object(key).await?;
        info!(key = %key, "paper archived");

        let interactions_key = interaction_key_for(key);
        let interactions_archived = match &interactions_key {
            Some(ikey) => match self.store.archive_object(ikey).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(key = %ikey, "failed to archive interaction log: {e}");
                    false
                }
            },
            None => {
                debug!(key = %key, "no interaction log key for paper key");
                false
            }
        };

        Ok(DeleteOutcome {
            paper_key: key.to_string(),
            interactions_key,
            interactions_archived,
        })
    }

    /// Append to the interaction log of `paper_key`, creating it on first use.
    pub async fn log_interaction(&self, paper_key: &str, interaction: Interaction) -> Result<()> {
        let ikey = interaction_key_for(paper_key)
            .ok_or_else(|| PaperscopeError::InvalidKey(paper_key.to_string()))?;

        match self.store.get_object(&ikey).await? {
            Some(object) => {
                let mut log: InteractionLog = serde_json::from_value(object.data)?;
                log.interactions.push(interaction);
                self.store
                    .update_object(&ikey, serde_json::to_value(&log)?)
                    .await?;
            }
            None => {
                let mut log = InteractionLog::new(paper_key);
                log.interactions.push(interaction);
                self.store
                    .create_object(&ikey, serde_json::to_value(&log)?)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn log_reading_session(&self, summary: &SessionSummary) -> Result<()> {
        let interaction = Interaction::new(
            InteractionKind::ReadingSession,
            json!({
                "session_id": summary.session_id,
                "start_time": summary.started_at,
                "end_time": summary.ended_at,
                "duration_seconds": summary.duration_seconds,
                "end_reason": summary.reason,
            }),
        );
        self.log_interaction(&summary.identity.paper_key(), interaction)
            .await
    }

    pub async fn interaction_log(&self, paper_key: &str) -> Result<Option<InteractionLog>> {
        let Some(ikey) = interaction_key_for(paper_key) else {
            return Ok(None);
        };
        match self.store.get_object(&ikey).await? {
            Some(object) => Ok(Some(serde_json::from_value(object.data)?)),
            None => Ok(None),
        }
    }
}

fn decode_paper(object: &StoredObject) -> Result<PaperMetadata> {
    Ok(serde_json::from_value(object.data.clone())?)
}
