//! The relay's message record.
//!
//! A `Message` is both the wire frame exchanged over the WebSocket and the
//! row persisted by the store. Clients send `type`, `content`, and
//! `senderId`; the relay assigns `timestamp` on arrival and the store
//! assigns `id` on persist.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned primary key of a persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat message relayed between clients and recorded by the store.
///
/// Every field is optional on input: missing strings decode as empty, and
/// any client-supplied `id` or `timestamp` is overwritten by the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned id. Absent until the message has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Free-form type tag (e.g. "text").
    #[serde(rename = "type", default)]
    pub message_type: String,
    /// Message payload.
    #[serde(default)]
    pub content: String,
    /// RFC 3339 UTC arrival time, assigned by the relay.
    #[serde(default)]
    pub timestamp: String,
    /// Identifier of the sending user. `Id_user` is accepted for older clients.
    #[serde(rename = "senderId", alias = "Id_user", default)]
    pub sender_id: String,
}

impl Message {
    /// Convenience constructor for an unsent message.
    pub fn new(
        message_type: impl Into<String>,
        content: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            message_type: message_type.into(),
            content: content.into(),
            timestamp: String::new(),
            sender_id: sender_id.into(),
        }
    }

    /// Overwrite the timestamp with `now`.
    ///
    /// The format is fixed-width RFC 3339 with millisecond precision and a
    /// `Z` suffix, so string order matches chronological order.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.timestamp = format_timestamp(now);
    }
}

/// Format a UTC instant the way message timestamps are stored.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_client_frame_without_id_or_timestamp() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"text","content":"hi","senderId":"u1"}"#).unwrap();
        assert_eq!(msg.id, None);
        assert_eq!(msg.message_type, "text");
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.sender_id, "u1");
        assert!(msg.timestamp.is_empty());
    }

    #[test]
    fn test_decode_accepts_legacy_sender_field() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"text","content":"hi","Id_user":"u7"}"#).unwrap();
        assert_eq!(msg.sender_id, "u7");
    }

    #[test]
    fn test_decode_missing_fields_default_to_empty() {
        let msg: Message = serde_json::from_str("{}").unwrap();
        assert_eq!(msg, Message::default());
    }

    #[test]
    fn test_decode_rejects_wrong_field_types() {
        assert!(serde_json::from_str::<Message>(r#"{"content":42}"#).is_err());
        assert!(serde_json::from_str::<Message>("not json").is_err());
        assert!(serde_json::from_str::<Message>("[1,2]").is_err());
    }

    #[test]
    fn test_encode_uses_wire_names_and_omits_missing_id() {
        let msg = Message::new("text", "hello", "u1");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["senderId"], "u1");
        assert!(json.get("id").is_none());
        assert!(json.get("sender_id").is_none());

        let persisted = Message {
            id: Some(MessageId(9)),
            ..msg
        };
        let json = serde_json::to_value(&persisted).unwrap();
        assert_eq!(json["id"], 9);
    }

    #[test]
    fn test_stamp_is_fixed_width_utc() {
        let mut msg = Message::new("text", "hi", "u1");
        msg.stamp(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(msg.timestamp, "2026-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);
        let mut stamps = vec![format_timestamp(later), format_timestamp(earlier)];
        stamps.sort();
        assert_eq!(stamps, vec![format_timestamp(earlier), format_timestamp(later)]);
    }
}
