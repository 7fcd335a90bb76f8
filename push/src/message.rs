use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Trait for getting the wire-level payload type name
pub trait PayloadType {
    fn payload_type(&self) -> &'static str;
}

/// Everything the server pushes (or answers a pull with) over a live
/// channel. The `type` tag on the wire matches the client protocol:
/// full snapshots (`*_list`) and single-row deltas (`*_item`).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Payload {
    /// Full chat-directory snapshot for the receiving user
    #[serde(rename = "chat_list")]
    ChatList { chats: Value },

    /// One new/changed directory row, as seen by the receiving user
    #[serde(rename = "chat_item")]
    ChatItem { chat: Value },

    /// Full message view of one chat: the ordered log, the exchange
    /// status, and the *receiving* user's own confirmation flag
    #[serde(rename = "message_list")]
    MessageList {
        chat_id: String,
        messages: Value,
        exchange_status: String,
        has_user_confirmed: bool,
    },

    /// One newly appended message
    #[serde(rename = "message_item")]
    MessageItem { chat_id: String, message: Value },
}

impl PayloadType for Payload {
    fn payload_type(&self) -> &'static str {
        match self {
            Payload::ChatList { .. } => "chat_list",
            Payload::ChatItem { .. } => "chat_item",
            Payload::MessageList { .. } => "message_list",
            Payload::MessageItem { .. } => "message_item",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub payload: Payload,
    pub scope: MessageScope,
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// The user's chat-directory channels
    ChatList { user_id: Uuid },
    /// The user's channels watching one chat's messages
    ChatMessages { user_id: Uuid, chat_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payloads_serialize_with_their_wire_tags() {
        let chat_id = Uuid::new_v4();

        let payload = Payload::MessageItem {
            chat_id: chat_id.to_string(),
            message: json!({"id": 3, "content": "hello"}),
        };
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["type"], "message_item");
        assert_eq!(value["chat_id"], chat_id.to_string());
        assert_eq!(value["message"]["content"], "hello");
    }

    #[test]
    fn message_list_carries_status_and_the_callers_flag() {
        let payload = Payload::MessageList {
            chat_id: Uuid::new_v4().to_string(),
            messages: json!([]),
            exchange_status: "accepted".to_string(),
            has_user_confirmed: true,
        };
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["type"], "message_list");
        assert_eq!(value["exchange_status"], "accepted");
        assert_eq!(value["has_user_confirmed"], true);
        assert_eq!(payload.payload_type(), "message_list");
    }
}
