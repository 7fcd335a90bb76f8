use crate::connection::{ChannelKind, ConnectionId, ConnectionRegistry, UserId};
use crate::message::{Message as PushMessage, MessageScope, PayloadType};
use axum::extract::ws::Message as WsMessage;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Register a new connection and return its unique ID
    pub fn register_connection(
        &self,
        user_id: UserId,
        kind: ChannelKind,
        sender: UnboundedSender<WsMessage>,
    ) -> ConnectionId {
        let connection_id = self.registry.register(user_id, kind, sender);
        info!("Registered new push connection");
        connection_id
    }

    /// Unregister a connection by ID
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        info!("Unregistering push connection");
        self.registry.unregister(connection_id);
    }

    /// Serialize a payload once and deliver it to every channel its scope
    /// selects.
    pub fn send_message(&self, message: PushMessage) {
        let payload_type = message.payload.payload_type();

        let frame = match serde_json::to_string(&message.payload) {
            Ok(json) => WsMessage::Text(json),
            Err(e) => {
                error!("Failed to serialize {payload_type} push payload: {e}");
                return;
            }
        };

        match message.scope {
            MessageScope::ChatList { user_id } => {
                self.registry
                    .send_to_user(&user_id, &ChannelKind::ChatList, frame);
            }
            MessageScope::ChatMessages { user_id, chat_id } => {
                self.registry.send_to_user(
                    &user_id,
                    &ChannelKind::ChatMessages { chat_id },
                    frame,
                );
            }
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
