//! Reading-session state machine: `NoSession → Active → Ended`.
//!
//! The tracker is also the authoritative in-memory cache of paper metadata,
//! keyed by identity, so a session started after a `paperMetadata` message
//! picks up what the content script already extracted.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{PaperIdentity, PaperMetadata};

const HISTORY_LIMIT: usize = 20;

/// Why a session ended. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndReason {
    Explicit,
    Replaced,
    Navigation,
    TabClosed,
    IdleTimeout,
    Other(String),
}

impl EndReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Explicit => "explicit",
            Self::Replaced => "replaced",
            Self::Navigation => "navigation",
            Self::TabClosed => "tab_closed",
            Self::IdleTimeout => "idle_timeout",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for EndReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "explicit" => Self::Explicit,
            "replaced" => Self::Replaced,
            "navigation" => Self::Navigation,
            "tab_closed" => Self::TabClosed,
            "idle_timeout" => Self::IdleTimeout,
            _ => Self::Other(s),
        }
    }
}

impl From<EndReason> for String {
    fn from(r: EndReason) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub identity: PaperIdentity,
    pub tab_id: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub metadata: Option<PaperMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub identity: PaperIdentity,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub reason: EndReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    NoSession,
    Active(Session),
    Ended(SessionSummary),
}

/// Result of `start_session`: the new session id and, if one was running,
/// the summary of the session it replaced.
#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session_id: Uuid,
    pub replaced: Option<SessionSummary>,
}

#[derive(Debug)]
pub struct SessionTracker {
    state: SessionState,
    cache: HashMap<PaperIdentity, PaperMetadata>,
    history: VecDeque<SessionSummary>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: SessionState::NoSession,
            cache: HashMap::new(),
            history: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn active_identity(&self) -> Option<&PaperIdentity> {
        self.active().map(|s| &s.identity)
    }

    pub fn is_active_for(&self, identity: &PaperIdentity) -> bool {
        self.active_identity() == Some(identity)
    }

    /// Start tracking `identity`. A running session is ended first with
    /// [`EndReason::Replaced`].
    pub fn start_session(
        &mut self,
        identity: PaperIdentity,
        tab_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> SessionStart {
        let replaced = self.end_session(EndReason::Replaced, now);

        let session = Session {
            id: Uuid::new_v4(),
            metadata: self.cache.get(&identity).cloned(),
            identity,
            tab_id,
            started_at: now,
            last_heartbeat: now,
        };
        info!(session = %session.id, paper = %session.identity, "session started");
        let session_id = session.id;
        self.state = SessionState::Active(session);

        SessionStart {
            session_id,
            replaced,
        }
    }

    /// Returns `false` when no session is active.
    pub fn record_heartbeat(&mut self, now: DateTime<Utc>) -> bool {
        match &mut self.state {
            SessionState::Active(session) => {
                if now > session.last_heartbeat {
                    session.last_heartbeat = now;
                }
                true
            }
            _ => false,
        }
    }

    /// Ends the active session. Calling it with nothing active is a no-op
    /// returning `None`.
    pub fn end_session(&mut self, reason: EndReason, now: DateTime<Utc>) -> Option<SessionSummary> {
        let SessionState::Active(session) = &self.state else {
            return None;
        };

        let ended_at = if reason == EndReason::IdleTimeout {
            session.last_heartbeat
        } else {
            now.max(session.started_at)
        };
        let summary = SessionSummary {
            session_id: session.id,
            identity: session.identity.clone(),
            started_at: session.started_at,
            ended_at,
            duration_seconds: (ended_at - session.started_at).num_seconds(),
            reason,
        };
        info!(
            session = %summary.session_id,
            paper = %summary.identity,
            seconds = summary.duration_seconds,
            reason = %summary.reason,
            "session ended"
        );

        self.history.push_back(summary.clone());
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.state = SessionState::Ended(summary.clone());
        Some(summary)
    }

    /// Ends the session if its last heartbeat is older than `timeout`.
    pub fn sweep_idle(&mut self, now: DateTime<Utc>, timeout: Duration) -> Option<SessionSummary> {
        let session = self.active()?;
        let idle = (now - session.last_heartbeat).to_std().unwrap_or_default();
        if idle <= timeout {
            return None;
        }
        debug!(paper = %session.identity, idle_secs = idle.as_secs(), "session idle");
        self.end_session(EndReason::IdleTimeout, now)
    }

    /// Ends the session if it belongs to `tab_id`.
    pub fn end_for_tab(&mut self, tab_id: u64, now: DateTime<Utc>) -> Option<SessionSummary> {
        if self.active()?.tab_id != Some(tab_id) {
            return None;
        }
        self.end_session(EndReason::TabClosed, now)
    }

    /// Cache metadata and attach it to the active session when identities match.
    pub fn cache_metadata(&mut self, metadata: PaperMetadata) {
        let identity = metadata.identity();
        if let SessionState::Active(session) = &mut self.state {
            if session.identity == identity {
                session.metadata = Some(metadata.clone());
            }
        }
        self.cache.insert(identity, metadata);
    }

    pub fn cached(&self, identity: &PaperIdentity) -> Option<&PaperMetadata> {
        self.cache.get(identity)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Metadata for the active session, if any is known.
    pub fn current_paper(&self) -> Option<&PaperMetadata> {
        let session = self.active()?;
        session
            .metadata
            .as_ref()
            .or_else(|| self.cache.get(&session.identity))
    }

    pub fn recent_sessions(&self) -> impl Iterator<Item = &SessionSummary> {
        self.history.iter().rev()
    }
}
