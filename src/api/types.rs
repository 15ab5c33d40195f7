//! Wire types shared with the chat backend
//!
//! Field names match the backend JSON exactly. Unknown fields are ignored so
//! the backend can grow its records without breaking the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation thread, identified by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    /// Last activity, used only for display
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used by the transcript
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// One entry of a session's transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Attachment ids sent with this message
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

impl Message {
    /// Build a message stamped with the current time and a fresh id
    pub fn new(session_id: &str, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            files: None,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Uploaded file reference returned by `POST /upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Body of `POST /chat/stream`
///
/// `files` is serialized as `null` (not omitted) when nothing is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub files: Option<Vec<String>>,
}

/// Backend timestamps are ISO-8601. Older records were written without an
/// offset; those are read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            // Unparsable display timestamps are dropped rather than failing the list
            let raw: Option<String> = Option::deserialize(d)?;
            Ok(raw.as_deref().and_then(super::parse))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_message_from_backend_json() {
        let json = r#"{
            "id": "m1",
            "session_id": "s1",
            "role": "assistant",
            "content": "hi",
            "timestamp": "2025-03-01T10:20:30.123456+00:00",
            "files": null
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.files, None);
        assert_eq!(msg.timestamp.year(), 2025);
        assert_eq!(msg.timestamp.second(), 30);
    }

    #[test]
    fn test_naive_timestamp_read_as_utc() {
        let json = r#"{"id":"m","session_id":"s","role":"user","content":"x","timestamp":"2024-12-31T23:59:59.5"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.timestamp.hour(), 23);
        assert_eq!(msg.files, None);
    }

    #[test]
    fn test_session_ignores_extra_fields() {
        let json = r#"{"id":"s1","title":"New Chat","created_at":"2025-01-01T00:00:00Z","updated_at":"garbage"}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.title, "New Chat");
        assert_eq!(session.updated_at, None);
    }

    #[test]
    fn test_chat_request_serializes_null_files() {
        let req = ChatRequest {
            message: "hello".to_string(),
            session_id: "s1".to_string(),
            files: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("files").unwrap().is_null());
    }

    #[test]
    fn test_upload_reply_parses() {
        let json = r#"{"id":"f1","filename":"a.pdf","content_type":"application/pdf","size":42}"#;
        let att: Attachment = serde_json::from_str(json).unwrap();
        assert_eq!(att.filename, "a.pdf");
        assert_eq!(att.size, Some(42));
    }
}
