//! Wire types exchanged with page scripts, the popup and the companion
//! frontend. Every request is tagged by `type` and answered with a
//! [`Response`].

use paperscope_core::{PaperMetadata, Rating};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    PaperMetadata {
        metadata: PaperMetadata,
    },
    GetCurrentPaper,
    UpdateRating {
        rating: Rating,
        #[serde(default)]
        metadata: Option<PaperMetadata>,
    },
    StartSession {
        source_id: String,
        paper_id: String,
    },
    SessionHeartbeat,
    EndSession {
        #[serde(default)]
        reason: Option<String>,
    },
    ManualPaperLog {
        metadata: PaperMetadata,
    },
    FrontendUpdateManualReadStatus {
        paper_key: String,
        /// Outer `None` when the field is missing, `Some(None)` for `null`.
        #[serde(default, deserialize_with = "present")]
        manually_read: Option<Option<String>>,
    },
    FrontendDeletePaper {
        paper_key: String,
    },
    GetDiagnostics,
    ExtractPage {
        url: String,
        html: String,
    },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PaperMetadata { .. } => "paperMetadata",
            Self::GetCurrentPaper => "getCurrentPaper",
            Self::UpdateRating { .. } => "updateRating",
            Self::StartSession { .. } => "startSession",
            Self::SessionHeartbeat => "sessionHeartbeat",
            Self::EndSession { .. } => "endSession",
            Self::ManualPaperLog { .. } => "manualPaperLog",
            Self::FrontendUpdateManualReadStatus { .. } => "frontendUpdateManualReadStatus",
            Self::FrontendDeletePaper { .. } => "frontendDeletePaper",
            Self::GetDiagnostics => "getDiagnostics",
            Self::ExtractPage { .. } => "extractPage",
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Who sent a message: the page URL of the sending tab, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tab_id: Option<u64>,
}

impl MessageSender {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            tab_id: None,
        }
    }

    pub fn with_tab(mut self, tab_id: u64) -> Self {
        self.tab_id = Some(tab_id);
        self
    }
}

/// Browser-side events that are not messages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BrowserEvent {
    Navigated {
        tab_id: u64,
        url: String,
    },
    TabClosed {
        tab_id: u64,
    },
    CredentialsChanged {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        owner: Option<String>,
        #[serde(default)]
        repo: Option<String>,
    },
}

/// One line of input to the `serve` loop. The message body is kept raw so a
/// malformed message still gets a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Message {
        message: Value,
        #[serde(default)]
        sender: MessageSender,
        #[serde(default)]
        id: Option<Value>,
    },
    Event {
        event: BrowserEvent,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            error: None,
            data: (!data.is_null()).then_some(data),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }
}

/// A response tagged with the id of the message it answers.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub response: Response,
}
