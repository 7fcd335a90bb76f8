use axum::extract::ws::Message as WsMessage;
use dashmap::DashMap;
use log::*;
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Type alias for user IDs, matching the entity layer's id type.
pub type UserId = Uuid;

/// Which view a channel is subscribed to. A user's chat-directory socket
/// and their per-chat message sockets live in the same registry and are
/// told apart by this tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    /// The chat-directory view
    ChatList,
    /// The message view of one chat
    ChatMessages { chat_id: Uuid },
}

impl ChannelKind {
    /// Whether a payload addressed to `target` belongs on this channel.
    fn matches(&self, target: &ChannelKind) -> bool {
        self == target
    }
}

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection bookkeeping: who owns the channel, what it watches, and the
/// sending half of its outbound queue. The receiving half is drained by the
/// connection's own writer task, so a slow socket never blocks a sender.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub user_id: UserId,
    pub kind: ChannelKind,
    pub sender: UnboundedSender<WsMessage>,
}

/// Connection registry with dual indices for O(1) lookups. A user may hold
/// any number of concurrent channels (multi-device); buckets are sharded by
/// DashMap, so traffic for unrelated users never contends on one lock.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: fast lookup by user_id for message routing - O(1)
    user_index: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_index: DashMap::new(),
        }
    }

    /// Register a new connection - O(1)
    pub fn register(
        &self,
        user_id: UserId,
        kind: ChannelKind,
        sender: UnboundedSender<WsMessage>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();

        // Insert into primary storage
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                user_id,
                kind,
                sender,
            },
        );

        // Update secondary index
        self.user_index
            .entry(user_id)
            .or_default()
            .insert(connection_id.clone());

        connection_id
    }

    /// Unregister a connection - O(1). Unregistering an id that is already
    /// gone is a no-op, so racing double-closes are harmless.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        // Remove from primary storage
        if let Some((_, info)) = self.connections.remove(connection_id) {
            let user_id = info.user_id;

            // Update secondary index
            if let Some(mut entry) = self.user_index.get_mut(&user_id) {
                entry.remove(connection_id);

                // Clean up empty user entries
                if entry.is_empty() {
                    drop(entry); // Release lock before removal
                    self.user_index.remove(&user_id);
                }
            }
        }
    }

    /// Deliver `message` to every one of the user's live channels matching
    /// `target` - O(1) lookup + O(k) send where k = user's connections.
    ///
    /// A user with no matching channel is a silent no-op; their client gets
    /// a consistent snapshot on its next connect. A send failure means the
    /// channel's writer task is gone, so the dead connection is unregistered
    /// here and delivery continues to the remaining channels.
    pub fn send_to_user(&self, user_id: &UserId, target: &ChannelKind, message: WsMessage) {
        let connection_ids: Vec<ConnectionId> = match self.user_index.get(user_id) {
            Some(entry) => entry.iter().cloned().collect(),
            None => return,
        };

        let mut dead: Vec<ConnectionId> = Vec::new();

        for conn_id in connection_ids {
            if let Some(info) = self.connections.get(&conn_id) {
                if !info.kind.matches(target) {
                    continue;
                }
                if let Err(e) = info.sender.send(message.clone()) {
                    warn!(
                        "Failed to send to connection {}: {}. Connection will be cleaned up.",
                        conn_id.as_str(),
                        e
                    );
                    dead.push(conn_id.clone());
                }
            }
        }

        for conn_id in dead {
            self.unregister(&conn_id);
        }
    }

    /// Number of live channels currently registered for the user.
    pub fn connection_count(&self, user_id: &UserId) -> usize {
        self.user_index
            .get(user_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
