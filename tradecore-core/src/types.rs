//! Core domain types for tradecore
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Message** | One chat turn entry, written by the user or by the model |
//! | **Session** | A persisted, titled conversation with an ordered message list |
//! | **Template** | A named snapshot of a message list used to seed new sessions |
//! | **Settings** | Global engine preferences (fast vs. deep reasoning) |
//!
//! All records serialize with camelCase keys and millisecond epoch timestamps,
//! which is also the layout of data written by the earlier browser client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Message
// ============================================

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human at the keyboard
    User,
    /// The analysis engine
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single chat message. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Attached images as `data:` URLs, in attachment order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a user message. An empty image list is stored as `None`.
    pub fn user(content: impl Into<String>, images: Vec<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: if images.is_empty() { None } else { Some(images) },
            timestamp: at,
        }
    }

    /// Build a model message.
    pub fn model(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            images: None,
            timestamp: at,
        }
    }

    /// Number of attached images
    pub fn image_count(&self) -> usize {
        self.images.as_ref().map_or(0, Vec::len)
    }
}

// ============================================
// Sessions and Templates
// ============================================

/// A titled conversation.
///
/// `id` is fixed at creation. `messages` only grows during chat, except when
/// a session is seeded from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl AnalysisSession {
    /// Create a session with a fresh random id.
    pub fn new(title: impl Into<String>, messages: Vec<Message>, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            messages,
            created_at: at,
        }
    }

    /// Timestamp of the most recent message, falling back to creation time.
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.messages
            .last()
            .map_or(self.created_at, |m| m.timestamp)
    }
}

/// A reusable, named copy of a message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTemplate {
    pub id: String,
    pub name: String,
    pub messages: Vec<Message>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl SessionTemplate {
    /// Snapshot `messages` under a fresh id. The copy is independent of its source.
    pub fn snapshot(name: impl Into<String>, messages: &[Message], at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            messages: messages.to_vec(),
            created_at: at,
        }
    }
}

// ============================================
// Settings
// ============================================

/// Global engine preferences.
///
/// Missing fields fall back to defaults so partially written legacy values load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Use the deep-reasoning engine instead of the fast one
    pub use_pro_model: bool,
    /// Reasoning budget; 0 disables it
    pub thinking_budget: u32,
}

/// Generate a random unique identifier (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn message_serializes_in_legacy_layout() {
        let msg = Message::user("hi", vec![], at(1_700_000_000_000));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "content": "hi", "timestamp": 1_700_000_000_000i64})
        );
    }

    #[test]
    fn session_reads_browser_written_json() {
        let raw = r#"{
            "id": "abc",
            "title": "BTC",
            "createdAt": 1700000000000,
            "messages": [
                {"role": "user", "content": "levels?", "images": ["data:image/png;base64,AA=="], "timestamp": 1700000000001},
                {"role": "model", "content": "here", "timestamp": 1700000000002}
            ]
        }"#;
        let session: AnalysisSession = serde_json::from_str(raw).unwrap();
        assert_eq!(session.id, "abc");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].image_count(), 1);
        assert_eq!(session.messages[1].role, Role::Model);
        assert_eq!(session.last_activity_at(), at(1_700_000_000_002));
    }

    #[test]
    fn settings_fill_missing_fields() {
        let settings: AppSettings = serde_json::from_str(r#"{"useProModel": true}"#).unwrap();
        assert!(settings.use_pro_model);
        assert_eq!(settings.thinking_budget, 0);

        let settings: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn template_snapshot_is_independent() {
        let mut messages = vec![Message::user("a", vec![], at(1))];
        let template = SessionTemplate::snapshot("Morning", &messages, at(2));
        messages.push(Message::model("b", at(3)));
        assert_eq!(template.messages.len(), 1);
        assert_ne!(template.id, SessionTemplate::snapshot("x", &[], at(2)).id);
    }
}
