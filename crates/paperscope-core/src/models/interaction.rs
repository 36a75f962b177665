use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    ReadingSession,
    Rating,
    ManualRead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

impl Interaction {
    pub fn new(kind: InteractionKind, data: Value) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Body of an `interactions:<id>` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionLog {
    pub paper_key: String,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl InteractionLog {
    pub fn new(paper_key: impl Into<String>) -> Self {
        Self {
            paper_key: paper_key.into(),
            interactions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interaction_type_tag() {
        let i = Interaction::new(InteractionKind::ReadingSession, json!({"duration_seconds": 30}));
        let v = serde_json::to_value(&i).unwrap();
        assert_eq!(v["type"], "reading_session");
        assert_eq!(v["data"]["duration_seconds"], 30);
    }
}
